//! Tabular input and output: TSV source tables and append-only CSV sinks.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::{EnrichmentError, Result};
use crate::record::{OUTPUT_COLUMNS, Record};

/// Column of the record name in output and error tables.
const NAME_COLUMN: usize = 1;

/// Append-only CSV table of finalized records.
///
/// Used both for accepted outputs and for the error log. The header is
/// written once, when the file is created.
#[derive(Debug, Clone)]
pub struct RecordSink {
    path: PathBuf,
}

impl RecordSink {
    /// Creates a sink writing to `path`; nothing is touched until the first append.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the table.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record row, writing the header first if the file is new.
    ///
    /// # Errors
    ///
    /// Returns `EnrichmentError::Sink` if the file cannot be opened or written.
    pub fn append(&self, record: &Record) -> Result<()> {
        let needs_header = !fs::metadata(&self.path).is_ok_and(|meta| meta.len() > 0);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.error(&e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.error(&e))?;

        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if needs_header {
            writer.write_record(OUTPUT_COLUMNS).map_err(|e| self.error(&e))?;
        }
        writer.write_record(record.to_row()).map_err(|e| self.error(&e))?;
        writer.flush().map_err(|e| self.error(&e))
    }

    /// Counts rows whose name contains `name`, ignoring case.
    ///
    /// A missing table counts zero rows.
    ///
    /// # Errors
    ///
    /// Returns `EnrichmentError::Sink` if the table exists but cannot be read.
    pub fn count_matching(&self, name: &str) -> Result<usize> {
        if !self.path.is_file() {
            return Ok(0);
        }

        let needle = name.to_lowercase();
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| self.error(&e))?;

        let mut count = 0;
        for row in reader.records() {
            let row = row.map_err(|e| self.error(&e))?;
            if row
                .get(NAME_COLUMN)
                .is_some_and(|cell| cell.to_lowercase().contains(&needle))
            {
                count += 1;
            }
        }
        Ok(count)
    }

    fn error(&self, err: &dyn std::error::Error) -> EnrichmentError {
        tracing::error!(path = %self.path.display(), error = %err, "Failed to access record table");
        EnrichmentError::Sink {
            path: self.path.clone(),
            message: err.to_string(),
        }
    }
}

/// Reads a tab-separated input table into records.
///
/// The first row is a header. Columns are positional (see
/// [`Record::from_row`]); extra columns are ignored and cells are trimmed.
///
/// # Errors
///
/// Returns `EnrichmentError::Input` if the table cannot be opened or a row
/// cannot be decoded.
pub fn read_table(path: &Path) -> Result<Vec<Record>> {
    let input_error = |message: String| EnrichmentError::Input {
        path: path.to_path_buf(),
        message,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| input_error(e.to_string()))?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| input_error(e.to_string()))?;
        let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
        if cells.iter().all(String::is_empty) {
            continue;
        }
        records.push(Record::from_row(&cells));
    }
    Ok(records)
}
