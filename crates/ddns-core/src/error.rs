//! Error types for the DDNS system
//!
//! Every failure is a tagged [`Error`] variant so callers branch on the kind
//! (retryable transport trouble, validation, cancellation, ...) instead of
//! matching on message text.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed cause carried by transport failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core error type for the DDNS system
#[derive(Error, Debug)]
pub enum Error {
    /// A remote endpoint answered with a non-success status
    #[error("upstream returned status {status}: {message}")]
    UpstreamStatus {
        /// HTTP status code
        status: u16,
        /// Message extracted from the response, if any
        message: String,
    },

    /// The request never produced a usable response
    #[error("{context}: {source}")]
    Transport {
        /// What was being attempted
        context: String,
        /// Underlying client error
        #[source]
        source: BoxError,
    },

    /// A single call exceeded its deadline
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The IP provider returned something that is not an IP literal
    #[error("invalid IP response: {0:?}")]
    InvalidAddress(String),

    /// A value was structurally wrong for its use (e.g. address family)
    #[error("validation failed: {0}")]
    Validation(String),

    /// A required remote object does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The shared cancellation signal fired
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an upstream status error
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self::UpstreamStatus {
            status,
            message: message.into(),
        }
    }

    /// Create a transport error wrapping its cause
    pub fn transport(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Create an invalid address error
    pub fn invalid_address(body: impl Into<String>) -> Self {
        Self::InvalidAddress(body.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether another attempt could plausibly succeed.
    ///
    /// Only transport-level trouble qualifies. A provider that returned a
    /// malformed or wrong-family address will return it again, an
    /// undecodable success body does not change, and a missing zone does not
    /// appear between attempts.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::UpstreamStatus { .. } | Self::Transport { .. } | Self::Timeout(_)
        )
    }

    /// Whether this error is the cancellation signal
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
