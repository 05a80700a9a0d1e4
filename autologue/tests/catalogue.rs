use async_trait::async_trait;
use autologue::catalogue::{self, CleanTarget};
use autologue::runner::{enrich_families, select_families};
use autologue::CliError;
use autologue_enrichment::prelude::*;
use std::fs;
use std::path::Path;

const HEADER: &str = "id\tname\ttype\tmodel\tdescription\tprice\tlength_cm\theight_cm\twidth_cm\tweight_kg\ttechnical_specs\ttechnical_doc\tcategory\n";

/// Answers by prompt text; prompt files hold the field name.
struct FieldClient;

#[async_trait]
impl EnrichmentClient for FieldClient {
    async fn query(&self, prompt: &str, _subject: &str) -> QueryOutcome {
        let answer = match prompt.trim() {
            "description" => {
                "Un instrument polyvalent apprécié sur scène comme en studio depuis des années."
            }
            "price" => "Prix constaté : **549** €",
            "length" => "**50** cm",
            "height" => "**9** cm",
            "width" => "**30** cm",
            "weight" => "**2,8** kg",
            "technical" => "```json\n{\"voix\": 4}\n```",
            "documentation" => "Manuel : https://example.com/manual.pdf",
            _ => return QueryOutcome::Absent,
        };
        QueryOutcome::Answer(answer.to_string())
    }
}

fn write_prompts(root: &Path) {
    for (file, field) in [
        ("prompt-description.md", "description"),
        ("prompt-price.md", "price"),
        ("prompt-longueur.md", "length"),
        ("prompt-hauteur.md", "height"),
        ("prompt-largeur.md", "width"),
        ("prompt-poids.md", "weight"),
        ("prompt-technical.md", "technical"),
        ("prompt-documentation.md", "documentation"),
    ] {
        fs::write(root.join(file), field).unwrap();
    }
}

fn write_export(dir: &Path, category: &str, names: &[&str]) {
    let mut content = String::from(HEADER);
    for (id, name) in names.iter().enumerate() {
        content.push_str(&format!(
            "{id}\t{name}\tX\tX\tnan\tnan\tnan\tnan\tnan\tnan\t[]\tnan\t{category}\n"
        ));
    }
    fs::write(dir.join(format!("output_{category}.tsv")), content).unwrap();
}

#[tokio::test]
async fn test_distribute_enrich_concat_and_clean_prices() {
    let root = tempfile::tempdir().unwrap();
    let export = tempfile::tempdir().unwrap();
    write_prompts(root.path());
    write_export(export.path(), "Synthétiseur", &["Korg Minilogue", "Moog Subsequent 37"]);
    write_export(export.path(), "Microphones", &["Shure SM58"]);

    assert_eq!(catalogue::distribute(export.path(), root.path()).unwrap(), 2);
    assert!(root.path().join("Keyboards/inputs/input_Synthétiseur.tsv").is_file());
    assert!(root.path().join("Mics/inputs/input_Microphones.tsv").is_file());

    let families: Vec<&Family> = ["Keyboards", "Mics"]
        .iter()
        .map(|name| Family::by_name(name).unwrap())
        .collect();
    let summary = enrich_families(&families, root.path(), PipelineConfig::default(), |_| {
        Ok::<_, CliError>(FieldClient)
    })
    .await;

    assert_eq!(summary.families, 2);
    assert_eq!(summary.tables, 2);
    assert_eq!(summary.accepted, 3);
    assert_eq!(summary.abandoned, 0);
    assert_eq!(summary.metrics.queries, 24);

    let ledger = Ledger::load(root.path().join("Keyboards/src/context.json")).unwrap();
    assert!(ledger.is_processed("Moog Subsequent 37"));

    let report = catalogue::concat(root.path(), &families).unwrap();
    assert_eq!(report.tables, 2);
    assert_eq!(report.output_rows, 3);
    assert_eq!(report.error_rows, 0);

    let mut reader = csv::Reader::from_path(root.path().join("_catalogue/autologue.csv")).unwrap();
    assert_eq!(reader.headers().unwrap().len(), OUTPUT_COLUMNS.len());
    let rows: Vec<csv::StringRecord> = reader.records().map(|row| row.unwrap()).collect();
    assert_eq!(&rows[0][1], "Korg Minilogue");
    assert_eq!(&rows[0][5], "549");

    assert_eq!(catalogue::clean(root.path(), &families, CleanTarget::Prices).unwrap(), 3);
    let output = root.path().join("Keyboards/outputs/output_Synthétiseur.csv");
    let mut reader = csv::Reader::from_path(&output).unwrap();
    for row in reader.records() {
        let row = row.unwrap();
        assert_eq!(&row[5], "");
        assert_eq!(&row[6], "50");
    }
}

#[tokio::test]
async fn test_second_run_skips_processed_records() {
    let root = tempfile::tempdir().unwrap();
    write_prompts(root.path());
    let inputs = root.path().join("Keyboards/inputs");
    fs::create_dir_all(&inputs).unwrap();
    write_export(&inputs, "Synthétiseur", &["Korg Minilogue"]);
    fs::rename(
        inputs.join("output_Synthétiseur.tsv"),
        inputs.join("input_Synthétiseur.tsv"),
    )
    .unwrap();
    let families = select_families(Some("Keyboards")).unwrap();

    let first = enrich_families(&families, root.path(), PipelineConfig::default(), |_| {
        Ok::<_, CliError>(FieldClient)
    })
    .await;
    let second = enrich_families(&families, root.path(), PipelineConfig::default(), |_| {
        Ok::<_, CliError>(FieldClient)
    })
    .await;

    assert_eq!(first.accepted, 1);
    assert_eq!(second.accepted, 0);
    assert_eq!(second.skipped, 1);
    assert_eq!(second.metrics.queries, 0);
}

#[tokio::test]
async fn test_family_without_client_is_skipped() {
    let root = tempfile::tempdir().unwrap();
    let families = select_families(None).unwrap();

    let summary = enrich_families(&families, root.path(), PipelineConfig::default(), |family| {
        Err::<FieldClient, _>(CliError::UnknownFamily(family.name.to_string()))
    })
    .await;

    assert_eq!(summary.families, 0);
    assert_eq!(summary.tables, 0);
}

#[test]
fn test_clean_errors_and_answers() {
    let root = tempfile::tempdir().unwrap();
    let bass = Family::by_name("Bass").unwrap();
    let layout = bass.layout(root.path());
    fs::create_dir_all(layout.answers()).unwrap();
    fs::write(layout.answers().join("a.md"), "x").unwrap();
    fs::write(layout.answers().join("b.md"), "y").unwrap();
    fs::write(layout.errors(), "id,name\n").unwrap();

    assert_eq!(catalogue::clean(root.path(), &[bass], CleanTarget::Answers).unwrap(), 2);
    assert_eq!(catalogue::clean(root.path(), &[bass], CleanTarget::Errors).unwrap(), 1);
    assert!(!layout.errors().exists());
    assert_eq!(catalogue::clean(root.path(), &[bass], CleanTarget::Outputs).unwrap(), 0);
}
