//! Error types returned by Perplexity adapter operations.

use std::path::PathBuf;
use thiserror::Error;

/// Perplexity adapter errors.
#[derive(Debug, Error)]
pub enum PerplexityError {
    /// Missing API key or unusable settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection failed or timed out.
    #[error("Network error: {0}")]
    Network(String),

    /// The API rejected the request parameters (HTTP 400).
    #[error("Invalid search parameters: {0}")]
    InvalidRequest(String),

    /// Still rate limited (HTTP 429) after every attempt.
    #[error("Rate limited after {attempts} attempts")]
    RateLimited {
        /// Attempts made.
        attempts: u32,
    },

    /// Any other non-2xx response.
    #[error("API returned {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// Response body does not match the chat-completions shape.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// An answer could not be archived.
    #[error("Failed to archive answer to {path}: {message}")]
    Archive {
        /// Target file.
        path: PathBuf,
        /// Underlying failure.
        message: String,
    },
}

impl PerplexityError {
    /// Returns `true` if the query produced no usable answer but the
    /// upstream service itself is healthy.
    #[must_use]
    pub const fn is_absent_answer(&self) -> bool {
        matches!(self, Self::InvalidRequest(_) | Self::RateLimited { .. })
    }
}

/// Result type alias for Perplexity adapter operations.
pub type Result<T> = std::result::Result<T, PerplexityError>;
