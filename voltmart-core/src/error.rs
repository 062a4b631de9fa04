//! Error types for the Voltmart sync layer.
//!
//! Every failure a view-model can observe maps onto one of three user-facing
//! outcomes: a retryable network failure, a malformed response, or a
//! throttled action. [`SyncError::kind`] performs that mapping.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using `SyncError`.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Coarse classification of a [`SyncError`], used to pick the UI state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connectivity or timeout; render a generic retryable error.
    NetworkFailure,
    /// The backend answered with a shape we could not decode.
    DecodingFailure,
    /// A cooldown denied the action; render the remaining time.
    Throttled,
    /// Anything else (configuration, lookups, internal invariants).
    Other,
}

/// Main error type for all sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    // ═══════════════════════════════════════════════════════════════════════════
    // NETWORK ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Remote call failed (connectivity, server error).
    #[error("Network request failed: {0}")]
    Network(String),

    /// Remote call did not complete in time.
    #[error("Request timed out: {0}")]
    Timeout(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // DECODING ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// JSON payload did not match the expected shape.
    #[error("Decoding failed: {0}")]
    Decoding(#[from] serde_json::Error),

    /// Payload decoded but failed validation.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // LOOKUP ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Entity does not exist on the backend.
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    /// Unknown remote collection.
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // RATE LIMITING
    // ═══════════════════════════════════════════════════════════════════════════

    /// Action denied by a cooldown gate.
    #[error("Action throttled, try again in {}s", .remaining.as_secs())]
    Throttled { remaining: Duration },

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION & INTERNAL
    // ═══════════════════════════════════════════════════════════════════════════

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal invariant violation (should never happen).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Maps this error onto the user-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Network(_) | SyncError::Timeout(_) => ErrorKind::NetworkFailure,
            SyncError::Decoding(_) | SyncError::InvalidPayload(_) => ErrorKind::DecodingFailure,
            SyncError::Throttled { .. } => ErrorKind::Throttled,
            _ => ErrorKind::Other,
        }
    }

    /// Returns true if the user may simply retry the same call.
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::NetworkFailure
    }

    /// Returns true if this is a decoding failure.
    pub fn is_decoding(&self) -> bool {
        self.kind() == ErrorKind::DecodingFailure
    }

    /// Returns true if this is a cooldown denial rather than a real failure.
    pub fn is_throttled(&self) -> bool {
        matches!(self, SyncError::Throttled { .. })
    }
}
