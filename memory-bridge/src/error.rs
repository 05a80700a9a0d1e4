//! Error types returned by bridge operations.

use thiserror::Error;

/// Result alias for bridge operations.
pub type Result<T> = std::result::Result<T, MemoryError>;

/// Knowledge-graph bridge errors.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Client could not be built (invalid URL, TLS backend).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection failed or timed out.
    #[error("Network error: {0}")]
    Network(String),

    /// Bridge answered with a non-2xx status.
    #[error("Bridge returned {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// Response body is not valid JSON.
    #[error("Parse error: {0}")]
    Parse(String),

    /// No bridge URL could be resolved.
    #[error("Bridge URL not found: {0}")]
    Discovery(String),
}
