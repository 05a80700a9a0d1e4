use anyhow::Context;
use autologue_enrichment::prelude::{Family, TIMESTAMP_FORMAT};
use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalogue::{CATALOGUE_DIR, CleanTarget, clean};

/// Age after which answers and prices are researched again.
pub const REFRESH_INTERVAL: TimeDelta = TimeDelta::days(60);

/// Contents of `_catalogue/info.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueInfo {
    /// Date of the last refresh, in the ledger timestamp format.
    pub last_updated: String,
}

/// Path of the catalogue info file under `root`.
#[must_use]
pub fn info_path(root: &Path) -> PathBuf {
    root.join(CATALOGUE_DIR).join("info.json")
}

/// Writes `now` as the last refresh date.
pub fn stamp(root: &Path, now: NaiveDateTime) -> anyhow::Result<()> {
    let path = info_path(root);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let info = CatalogueInfo {
        last_updated: now.format(TIMESTAMP_FORMAT).to_string(),
    };
    fs::write(&path, serde_json::to_string_pretty(&info)?)
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Returns `true` if the last refresh is older than [`REFRESH_INTERVAL`].
///
/// A missing info file is created with `now` and is not stale.
pub fn is_stale(root: &Path, now: NaiveDateTime) -> anyhow::Result<bool> {
    let path = info_path(root);
    if !path.is_file() {
        stamp(root, now)?;
        return Ok(false);
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read info file {}", path.display()))?;
    let info: CatalogueInfo = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse info file {}", path.display()))?;
    let last = NaiveDateTime::parse_from_str(&info.last_updated, TIMESTAMP_FORMAT)
        .with_context(|| format!("Invalid last_updated date '{}'", info.last_updated))?;
    Ok(now - last > REFRESH_INTERVAL)
}

/// Clears answers and prices of `families` when the catalogue is stale,
/// then records `now` as the refresh date. Returns whether it refreshed.
pub fn refresh_if_stale(root: &Path, families: &[&Family], now: NaiveDateTime) -> anyhow::Result<bool> {
    if !is_stale(root, now)? {
        return Ok(false);
    }
    tracing::info!("Updating catalogue");
    clean(root, families, CleanTarget::Answers)?;
    clean(root, families, CleanTarget::Prices)?;
    stamp(root, now)?;
    Ok(true)
}
