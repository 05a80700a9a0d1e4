use anyhow::Context;
use autologue_enrichment::prelude::{Family, OUTPUT_COLUMNS};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Directory of the concatenated catalogue under the root.
pub const CATALOGUE_DIR: &str = "_catalogue";

/// Keywords assigning an exported category to a family, checked in order.
pub const FAMILY_KEYWORDS: [(&str, &[&str]); 7] = [
    ("Drums", &["batterie", "batteries", "cymbales", "caisses", "percussions"]),
    ("Guitars", &["guitare", "guitares"]),
    ("Bass", &["basse", "basses", "contrebasse"]),
    ("Keyboards", &["piano", "synthétiseur", "orgue", "clavier", "workstation"]),
    ("DJ", &["dj", "platine", "mixette"]),
    ("Mics", &["microphones"]),
    ("Sono", &["sonorisation", "mixage"]),
];

/// Family receiving categories no keyword matches.
pub const FALLBACK_FAMILY: &str = "Other";

#[allow(clippy::expect_used)]
static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\-.]").expect("sanitizer pattern is valid"));

/// What `clean` removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CleanTarget {
    /// Archived model answers.
    Answers,
    /// Accepted-output tables.
    Outputs,
    /// The error table.
    Errors,
    /// The price column of every output table.
    Prices,
}

/// Rows gathered by [`concat`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConcatReport {
    /// Output tables read.
    pub tables: usize,
    /// Accepted rows written to `autologue.csv`.
    pub output_rows: usize,
    /// Error rows written to `errors.csv`.
    pub error_rows: usize,
}

/// Family a catalogue category belongs to.
#[must_use]
pub fn family_for_category(category: &str) -> &'static str {
    let category = category.to_lowercase();
    FAMILY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| category.contains(keyword)))
        .map_or(FALLBACK_FAMILY, |(family, _)| *family)
}

/// Makes a category usable as a file-name component.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let sanitized = UNSAFE_CHARS.replace_all(name.trim(), "_");
    if sanitized.is_empty() {
        "unknown".to_string()
    } else {
        sanitized.into_owned()
    }
}

/// Copies exported `output_<category>.tsv` tables into the family inputs.
///
/// Tables are read from `export_dir` and from its immediate subdirectories.
/// Each lands in `<root>/<Family>/inputs/input_<category>.tsv`.
pub fn distribute(export_dir: &Path, root: &Path) -> anyhow::Result<usize> {
    let mut tables = exported_tables(export_dir)?;
    for entry in fs::read_dir(export_dir)? {
        let path = entry?.path();
        if path.is_dir() {
            tables.extend(exported_tables(&path)?);
        }
    }
    tables.sort();

    for (source, category) in &tables {
        let family = family_for_category(category);
        let layout = Family::by_name(family)
            .with_context(|| format!("No family named {family}"))?
            .layout(root);
        let inputs = layout.inputs();
        fs::create_dir_all(&inputs)
            .with_context(|| format!("Failed to create {}", inputs.display()))?;
        let destination = layout.input_table(&sanitize_filename(category));
        fs::copy(source, &destination).with_context(|| {
            format!("Failed to copy {} to {}", source.display(), destination.display())
        })?;
        tracing::info!(%category, family, "Copied table for processing");
    }
    Ok(tables.len())
}

fn exported_tables(dir: &Path) -> anyhow::Result<Vec<(PathBuf, String)>> {
    let entries = fs::read_dir(dir).with_context(|| format!("Directory {} does not exist", dir.display()))?;
    let mut tables = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() || path.extension().is_none_or(|ext| ext != "tsv") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let category = stem.strip_prefix("output_").unwrap_or(stem).to_string();
        tables.push((path, category));
    }
    Ok(tables)
}

/// Applies `target` to every family in `families` and returns the number
/// of files removed, or of rows rewritten for [`CleanTarget::Prices`].
pub fn clean(root: &Path, families: &[&Family], target: CleanTarget) -> anyhow::Result<usize> {
    tracing::info!(?target, families = families.len(), "Cleaning");
    let mut count = 0;
    for family in families {
        let layout = family.layout(root);
        count += match target {
            CleanTarget::Answers => empty_dir(&layout.answers())?,
            CleanTarget::Outputs => empty_dir(&layout.outputs())?,
            CleanTarget::Errors => {
                let errors = layout.errors();
                if errors.is_file() {
                    fs::remove_file(&errors)
                        .with_context(|| format!("Failed to remove {}", errors.display()))?;
                    1
                } else {
                    0
                }
            }
            CleanTarget::Prices => {
                let mut rows = 0;
                for table in csv_files(&layout.outputs())? {
                    rows += blank_column(&table, "price")?;
                }
                tracing::info!(family = family.name, rows, "Erased output prices");
                rows
            }
        };
    }
    Ok(count)
}

fn empty_dir(dir: &Path) -> anyhow::Result<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            fs::remove_file(&path).with_context(|| format!("Failed to remove {}", path.display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}

fn csv_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "csv") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Blanks `column` in every row of the CSV table at `path`, in place.
fn blank_column(path: &Path, column: &str) -> anyhow::Result<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Error reading {}", path.display()))?;
    let headers = reader.headers()?.clone();
    let Some(index) = headers.iter().position(|header| header == column) else {
        return Ok(0);
    };

    let mut rows = Vec::new();
    for row in reader.records() {
        let row = row.with_context(|| format!("Error reading {}", path.display()))?;
        let cells: Vec<&str> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| if i == index { "" } else { cell })
            .collect();
        rows.push(csv::StringRecord::from(cells));
    }

    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::WriterBuilder::new().flexible(true).from_path(&tmp)?;
        writer.write_record(&headers)?;
        for row in &rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(rows.len())
}

/// Concatenates every family's output tables into
/// `<root>/_catalogue/autologue.csv` and error tables into
/// `<root>/_catalogue/errors.csv`.
pub fn concat(root: &Path, families: &[&Family]) -> anyhow::Result<ConcatReport> {
    tracing::info!(families = families.len(), "Gathering CSV files");
    let mut report = ConcatReport::default();
    let mut outputs = Vec::new();
    let mut errors = Vec::new();

    for family in families {
        let layout = family.layout(root);
        for table in csv_files(&layout.outputs())? {
            let rows = read_rows(&table)?;
            tracing::info!(family = family.name, rows = rows.len(), "Loaded output rows");
            outputs.extend(rows);
            report.tables += 1;
        }
        let error_table = layout.errors();
        if error_table.is_file() {
            let rows = read_rows(&error_table)?;
            tracing::info!(family = family.name, rows = rows.len(), "Loaded error rows");
            errors.extend(rows);
        }
    }

    if outputs.is_empty() && errors.is_empty() {
        tracing::warn!("No data files were loaded");
    }

    let catalogue = root.join(CATALOGUE_DIR);
    fs::create_dir_all(&catalogue)
        .with_context(|| format!("Failed to create {}", catalogue.display()))?;
    let autologue = catalogue.join("autologue.csv");
    write_rows(&autologue, &outputs)?;
    write_rows(&catalogue.join("errors.csv"), &errors)?;

    report.output_rows = outputs.len();
    report.error_rows = errors.len();
    tracing::info!(
        tables = report.tables,
        rows = report.output_rows,
        path = %autologue.display(),
        "Concatenated outputs"
    );
    Ok(report)
}

fn read_rows(path: &Path) -> anyhow::Result<Vec<csv::StringRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Error reading {}", path.display()))?;
    reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Error reading {}", path.display()))
}

fn write_rows(path: &Path, rows: &[csv::StringRecord]) -> anyhow::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    writer.write_record(OUTPUT_COLUMNS)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_for_category() {
        assert_eq!(family_for_category("Basses Electriques"), "Bass");
        assert_eq!(family_for_category("Pianos numériques"), "Keyboards");
        assert_eq!(family_for_category("Platine vinyl / Vinyl"), "DJ");
        assert_eq!(family_for_category("Cymbales"), "Drums");
        assert_eq!(family_for_category("Tables de mixage"), "Sono");
        assert_eq!(family_for_category("Câbles"), "Other");
    }

    #[test]
    fn test_guitar_keyword_wins_over_bass_for_guitar_amps() {
        // "Guitares basses" mentions both; the first family in order wins.
        assert_eq!(family_for_category("Guitares basses"), "Guitars");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Platine vinyl / Vinyl"), "Platine_vinyl___Vinyl");
        assert_eq!(sanitize_filename(" Tête Basse "), "Tête_Basse");
        assert_eq!(sanitize_filename("   "), "unknown");
    }

    #[test]
    fn test_blank_column_keeps_other_cells() {
        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("output_Combo.csv");
        fs::write(&table, "id,name,price\n1,Ampeg BA-108,199.0\n2,\"Fender Rumble, 40\",259\n").unwrap();

        assert_eq!(blank_column(&table, "price").unwrap(), 2);

        let text = fs::read_to_string(&table).unwrap();
        assert_eq!(text, "id,name,price\n1,Ampeg BA-108,\n2,\"Fender Rumble, 40\",\n");
        assert_eq!(blank_column(&table, "weight").unwrap(), 0);
    }
}
