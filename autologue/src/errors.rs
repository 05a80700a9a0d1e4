use thiserror::Error;

/// Errors surfaced by the autologue runner.
#[derive(Debug, Error)]
pub enum CliError {
    /// Error from the enrichment core.
    #[error("Enrichment error: {0}")]
    Enrichment(#[from] autologue_enrichment::prelude::EnrichmentError),

    /// Error from the Perplexity adapter.
    #[error("Perplexity error: {0}")]
    Perplexity(#[from] autologue_perplexity::PerplexityError),

    /// Error from the memory bridge.
    #[error("Memory bridge error: {0}")]
    Memory(#[from] autologue_memory::MemoryError),

    /// `--family` names no built-in family.
    #[error("Unknown family '{0}'")]
    UnknownFamily(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Housekeeping error.
    #[error("Catalogue error: {0}")]
    Catalogue(#[from] anyhow::Error),
}
