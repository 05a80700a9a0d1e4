//! Perplexity adapter for the enrichment pipeline.
//!
//! [`PerplexityClient`] implements
//! [`EnrichmentClient`](autologue_enrichment::prelude::EnrichmentClient) over
//! the Perplexity chat-completions API. It maps HTTP failures onto query
//! outcomes, backs off while rate limited, lets the model use the
//! knowledge-graph memory tools and archives every answer.

/// Chat-completions client and answer archive.
pub mod client;
/// Error types returned by adapter operations.
pub mod error;
/// Request and response payloads.
pub mod types;

pub use client::{
    API_KEY_ENV_VAR, DEFAULT_BASE_URL, DEFAULT_MODEL, PerplexityClient, PerplexityConfig,
    archive_answer, backoff_delay, sanitize_subject,
};
pub use error::{PerplexityError, Result};
pub use types::{ChatRequest, ChatResponse, Message, ToolCall};
