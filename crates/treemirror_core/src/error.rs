//! Error types for the synchronisation engine.

use thiserror::Error;

/// Result type for synchronisation operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in the synchronisation engine.
///
/// Overflow is deliberately absent: a full ring is signalled through
/// the overflow flag and healed by the next drain, never surfaced to
/// the capture caller.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The channel was constructed with zero capacity.
    ///
    /// A zero-capacity ring would make every capture overflow, so
    /// construction fails fast instead of degrading silently.
    #[error("channel capacity must be at least 1")]
    InvalidCapacity,

    /// The change applier rejected a record.
    ///
    /// The engine performs no validation of record contents; whatever
    /// the applier reports is passed through here.
    #[error("failed to apply change record: {0}")]
    Apply(String),

    /// The snapshot source failed to produce a full snapshot.
    #[error("failed to take full snapshot: {0}")]
    Snapshot(String),
}

impl CoreError {
    /// Creates an apply error from any display-able cause.
    pub fn apply(cause: impl std::fmt::Display) -> Self {
        Self::Apply(cause.to_string())
    }

    /// Creates a snapshot error from any display-able cause.
    pub fn snapshot(cause: impl std::fmt::Display) -> Self {
        Self::Snapshot(cause.to_string())
    }
}

impl From<treemirror_ring::RingError> for CoreError {
    fn from(err: treemirror_ring::RingError) -> Self {
        match err {
            treemirror_ring::RingError::InvalidCapacity => CoreError::InvalidCapacity,
            treemirror_ring::RingError::Full => CoreError::Apply(err.to_string()),
        }
    }
}
