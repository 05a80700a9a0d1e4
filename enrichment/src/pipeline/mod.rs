//! Per-record enrichment loop and table/family runners.
//!
//! - [`Pipeline`] - Bounded resolve/validate/score loop over records, tables and families
//! - [`RecordOutcome`] - Terminal state of one record
//! - [`TableReport`] - Per-table counts and metrics
//! - [`EnrichmentMetrics`] - Query and timing counters
//! - [`PipelineConfig`] - Retry ceiling configuration

pub mod config;
pub mod metrics;
pub mod orchestrator;

pub use config::PipelineConfig;
pub use metrics::EnrichmentMetrics;
pub use orchestrator::{Pipeline, RecordOutcome, TableReport};
