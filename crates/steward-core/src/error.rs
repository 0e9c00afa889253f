//! Error types shared across the steward crates.

use thiserror::Error;

/// Errors that can occur while reconciling Splunk ES state.
#[derive(Error, Debug, Clone)]
pub enum SplunkError {
    /// Local validation failure, detected before any network call.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The requested object does not exist on the server.
    ///
    /// The transport layer classifies a 404, a body containing
    /// "object not found"/"could not find object", or Splunk's
    /// 500-with-`MC_0050` quirk into this variant, so callers never
    /// inspect error strings themselves.
    #[error("not found: {0}")]
    NotFound(String),

    /// The server answered with a non-success status.
    #[error("splunk api returned {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection, TLS, or timeout failure before a response arrived.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Client construction or configuration problem.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for steward operations.
pub type Result<T> = std::result::Result<T, SplunkError>;

impl SplunkError {
    /// True when the error means "the object is absent", which info-style
    /// queries convert into an empty result instead of a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SplunkError::NotFound(_))
    }
}
