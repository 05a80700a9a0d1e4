//! Error types for enrichment operations.

use std::path::PathBuf;
use thiserror::Error;

use crate::record::Field;

/// Result alias used throughout the enrichment crate.
pub type Result<T> = std::result::Result<T, EnrichmentError>;

/// Errors that can occur while enriching records.
///
/// Validation failures are not errors: they are retried by the pipeline and
/// end in acceptance or abandonment. Only upstream failures stop a table run.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    /// The query collaborator returned the failure sentinel for a field.
    #[error("Upstream query failed for {field} of '{name}'")]
    Upstream {
        /// Record name used as the query subject.
        name: String,
        /// Field whose query failed.
        field: Field,
    },

    /// Ledger document could not be read or written.
    #[error("Ledger persistence failed at {path}: {message}")]
    Persistence {
        /// Location of the ledger document.
        path: PathBuf,
        /// Underlying failure.
        message: String,
    },

    /// An output or error table could not be appended to or read.
    #[error("Sink I/O failed at {path}: {message}")]
    Sink {
        /// Location of the table.
        path: PathBuf,
        /// Underlying failure.
        message: String,
    },

    /// An input table could not be read.
    #[error("Input table {path} unreadable: {message}")]
    Input {
        /// Location of the input table.
        path: PathBuf,
        /// Underlying failure.
        message: String,
    },
}

impl EnrichmentError {
    /// Returns `true` if the error must stop the current table run.
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream { .. })
    }
}
