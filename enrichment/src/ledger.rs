//! Persisted bookkeeping of processed and failing records.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EnrichmentError, Result};
use crate::record::{Record, parse_decimal};

/// `strftime` format of ledger and catalogue timestamps (`19-10-26-14h05:33`).
pub const TIMESTAMP_FORMAT: &str = "%d-%m-%y-%Hh%M:%S";

const CACHE_SEPARATOR: &str = " : ";

/// Current local time in [`TIMESTAMP_FORMAT`].
#[must_use]
pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// On-disk shape of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerDocument {
    /// Names accepted so far.
    #[serde(default)]
    pub instruments_processed: Vec<String>,
    /// `"name : price"` entries.
    #[serde(default)]
    pub price_cache: Vec<String>,
    /// `"name : [length, height, width, weight]"` entries.
    #[serde(default)]
    pub dimensions_cache: Vec<String>,
    /// Names whose last attempt failed validation.
    #[serde(default)]
    pub failed_searches: Vec<String>,
    /// Time of the last mutation.
    #[serde(default)]
    pub last_updated: String,
}

impl Default for LedgerDocument {
    fn default() -> Self {
        Self {
            instruments_processed: Vec::new(),
            price_cache: Vec::new(),
            dimensions_cache: Vec::new(),
            failed_searches: Vec::new(),
            last_updated: timestamp_now(),
        }
    }
}

/// Context ledger of one product family.
///
/// Owned by the pipeline run and written back wholesale after every
/// mutation, so an interrupted run loses at most the record in flight.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    document: LedgerDocument,
}

impl Ledger {
    /// Creates an empty ledger bound to `path` without touching the disk.
    #[must_use]
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            document: LedgerDocument::default(),
        }
    }

    /// Loads the ledger stored at `path`, or an empty one if none exists.
    ///
    /// # Errors
    ///
    /// Returns `EnrichmentError::Persistence` if the file exists but cannot
    /// be read or parsed; overwriting it would lose the run history.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            tracing::info!(path = %path.display(), "No ledger found, starting empty");
            return Ok(Self::empty(path));
        }

        let persistence = |message: String| EnrichmentError::Persistence {
            path: path.clone(),
            message,
        };
        let content = fs::read_to_string(&path).map_err(|e| persistence(e.to_string()))?;
        let document = serde_json::from_str(&content).map_err(|e| persistence(e.to_string()))?;

        Ok(Self { path, document })
    }

    /// Location of the ledger document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current ledger contents.
    #[must_use]
    pub const fn document(&self) -> &LedgerDocument {
        &self.document
    }

    /// Returns `true` if `name` was already accepted.
    #[must_use]
    pub fn is_processed(&self, name: &str) -> bool {
        self.document.instruments_processed.iter().any(|n| n == name)
    }

    /// Returns `true` if the last attempt at `name` failed.
    #[must_use]
    pub fn is_failing(&self, name: &str) -> bool {
        self.document.failed_searches.iter().any(|n| n == name)
    }

    /// Marks an accepted record: caches its price and dimensions, moves its
    /// name from failing to processed, then persists.
    pub fn record_success(&mut self, record: &Record) -> Result<()> {
        let name = record.name().to_string();
        let price = record.price.clone().unwrap_or_default();
        let dimensions: Vec<String> = record
            .dimensions
            .0
            .iter()
            .map(|axis| axis.clone().unwrap_or_default())
            .collect();
        let dimensions = serde_json::to_string(&dimensions).unwrap_or_else(|_| "[]".to_string());

        self.document.price_cache.push(format!("{name}{CACHE_SEPARATOR}{price}"));
        self.document.dimensions_cache.push(format!("{name}{CACHE_SEPARATOR}{dimensions}"));
        self.document.failed_searches.retain(|n| *n != name);
        if !self.is_processed(&name) {
            self.document.instruments_processed.push(name);
        }
        self.touch_and_save()
    }

    /// Marks a failed attempt at `name`, then persists.
    pub fn record_failure(&mut self, name: &str) -> Result<()> {
        if !self.is_failing(name) {
            self.document.failed_searches.push(name.to_string());
        }
        self.touch_and_save()
    }

    /// Empties the ledger and persists the empty document.
    pub fn reset(&mut self) -> Result<()> {
        self.document = LedgerDocument::default();
        self.save()
    }

    /// Cached historical prices, skipping entries that do not parse.
    #[must_use]
    pub fn cached_prices(&self) -> Vec<f64> {
        self.document
            .price_cache
            .iter()
            .filter_map(|entry| entry.rsplit_once(CACHE_SEPARATOR))
            .filter_map(|(_, price)| parse_decimal(price))
            .collect()
    }

    /// Cached historical dimension tuples, skipping entries that do not parse.
    ///
    /// Values are JSON arrays; single-quoted list literals are accepted too.
    #[must_use]
    pub fn cached_dimensions(&self) -> Vec<[f64; 4]> {
        self.document
            .dimensions_cache
            .iter()
            .filter_map(|entry| entry.rsplit_once(CACHE_SEPARATOR))
            .filter_map(|(_, dims)| parse_dimension_entry(dims))
            .collect()
    }

    /// Writes the document to disk, replacing the previous version.
    ///
    /// # Errors
    ///
    /// Returns `EnrichmentError::Persistence` if the document cannot be
    /// written; the in-memory state is kept.
    pub fn save(&self) -> Result<()> {
        let persistence = |message: String| {
            tracing::error!(path = %self.path.display(), %message, "Failed to write ledger");
            EnrichmentError::Persistence {
                path: self.path.clone(),
                message,
            }
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| persistence(e.to_string()))?;
        }
        let content =
            serde_json::to_string_pretty(&self.document).map_err(|e| persistence(e.to_string()))?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, content).map_err(|e| persistence(e.to_string()))?;
        fs::rename(&staging, &self.path).map_err(|e| persistence(e.to_string()))
    }

    fn touch_and_save(&mut self) -> Result<()> {
        self.document.last_updated = timestamp_now();
        self.save()
    }
}

fn parse_dimension_entry(raw: &str) -> Option<[f64; 4]> {
    let values: Vec<serde_json::Value> = serde_json::from_str(raw)
        .or_else(|_| serde_json::from_str(&raw.replace('\'', "\"")))
        .ok()?;
    let numbers: Vec<f64> = values
        .iter()
        .filter_map(|value| match value {
            serde_json::Value::String(text) => parse_decimal(text),
            serde_json::Value::Number(number) => number.as_f64(),
            _ => None,
        })
        .collect();
    numbers.try_into().ok()
}
