//! Catalog record enrichment core.
//!
//! This crate turns partially filled catalog records into complete ones by
//! querying an [`EnrichmentClient`](client::EnrichmentClient) for every
//! missing field, extracting typed values from the free-text answers,
//! validating them against per-category price bands and scoring them
//! against the family's own history.

pub mod client;
pub mod error;
pub mod extract;
pub mod families;
pub mod ledger;
pub mod pipeline;
pub mod record;
pub mod resolver;
pub mod scorer;
pub mod sink;
pub mod validator;

/// Common traits and types for ergonomic usage of the enrichment core.
pub mod prelude {
    pub use crate::client::{EnrichmentClient, FAILURE_SENTINEL, PromptSet, QueryOutcome};
    pub use crate::error::{EnrichmentError, Result};
    pub use crate::families::{FAMILIES, Family, FamilyLayout, InputMode};
    pub use crate::ledger::{Ledger, LedgerDocument, TIMESTAMP_FORMAT, timestamp_now};
    pub use crate::pipeline::{
        EnrichmentMetrics, Pipeline, PipelineConfig, RecordOutcome, TableReport,
    };
    pub use crate::record::{Dimensions, Field, OUTPUT_COLUMNS, Record};
    pub use crate::sink::{RecordSink, read_table};
    pub use crate::validator::{PriceBand, PriceFilter, Rejection};
}
