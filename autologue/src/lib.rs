#![deny(missing_docs)]
//! Autologue researches missing catalogue data for musical instruments.
//!
//! The binary drives one enrichment pipeline per product family with a
//! Perplexity research agent, and keeps the catalogue tables tidy: it
//! distributes exported tables to the families, cleans generated files,
//! concatenates the results and refreshes stale data.

/// Catalogue housekeeping: distribution, cleaning and concatenation.
pub mod catalogue;
/// Error types for the runner.
pub mod errors;
/// Periodic refresh of answers and prices.
pub mod refresh;
/// Family-by-family enrichment runs.
pub mod runner;

pub use catalogue::{CleanTarget, ConcatReport, clean, concat, distribute};
pub use errors::CliError;
pub use refresh::refresh_if_stale;
pub use runner::{RunSummary, enrich_families, select_families};
