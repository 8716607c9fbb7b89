//! Error types for ring operations.

use thiserror::Error;

/// Result type for ring operations.
pub type RingResult<T> = Result<T, RingError>;

/// Errors that can occur when constructing or writing to a ring.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RingError {
    /// The ring was constructed with zero capacity.
    ///
    /// A zero-capacity ring would reject every push, so construction
    /// fails fast instead.
    #[error("ring capacity must be at least 1")]
    InvalidCapacity,

    /// The ring has no free slot for a new record.
    ///
    /// Unread slots are never overwritten; the caller decides how to
    /// handle the rejected record.
    #[error("ring buffer is full")]
    Full,
}
