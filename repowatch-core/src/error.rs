//! Error types for repowatch.
//!
//! Errors produced by a forge client are routed, not interpreted: the
//! coordinator wraps them into `Outcome::Failure` and publishes them. They
//! are therefore `Clone` so one error can reach every subscriber.

use thiserror::Error;

/// Result type alias using `ForgeError`.
pub type Result<T> = std::result::Result<T, ForgeError>;

/// Error returned by the forge fetch interface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForgeError {
    // ═══════════════════════════════════════════════════════════════════════════
    // NETWORK ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Transport failure, timeout, or unexpected HTTP status.
    #[error("Network error: {0}")]
    Network(String),

    /// The requested user or resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The fetch was superseded or cancelled. Never published to subscribers.
    #[error("Fetch cancelled")]
    Cancelled,

    /// Client configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ForgeError {
    /// Returns true if retrying the same request may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ForgeError::Network(_))
    }

    /// Returns true if this error marks a cancelled fetch.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ForgeError::Cancelled)
    }
}

impl From<serde_json::Error> for ForgeError {
    fn from(err: serde_json::Error) -> Self {
        ForgeError::Decode(err.to_string())
    }
}
