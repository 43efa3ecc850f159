//! Unified error types for the quote service.

use thiserror::Error;

/// Process-level error type.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Upstream quote error.
    #[error("quote error: {0}")]
    Quote(#[from] QuoteError),

    /// HTTP client construction or request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while talking to the exchange or the aggregator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuoteError {
    /// The per-upstream admission window is full and no cached value exists.
    #[error("{upstream} rate limited")]
    Throttled {
        /// Which upstream refused admission.
        upstream: &'static str,
    },

    /// Timeout, connection failure or non-2xx status.
    #[error("upstream request failed: {0}")]
    Transport(String),

    /// Payload arrived but could not be read in the expected shape.
    #[error("malformed upstream payload: {0}")]
    Malformed(String),

    /// Nothing matched the lookup.
    #[error("{0} not found")]
    NotFound(String),
}

impl QuoteError {
    /// Whether this is the throttled signal callers may want to surface.
    pub fn is_throttled(&self) -> bool {
        matches!(self, QuoteError::Throttled { .. })
    }
}

impl From<reqwest::Error> for QuoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            QuoteError::Malformed(err.to_string())
        } else {
            QuoteError::Transport(err.to_string())
        }
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ServiceError>;
