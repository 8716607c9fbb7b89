//! Error types for model operations.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur when decoding or applying tree deltas.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A delta could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// A delta addressed a child index that does not exist.
    #[error("no child at index {index} (node has {len} children)")]
    ChildOutOfRange {
        /// The requested child index.
        index: usize,
        /// The number of children the node actually has.
        len: usize,
    },

    /// A delta addressed a path that does not resolve to a node.
    #[error("path {path:?} does not resolve: no child at depth {depth}")]
    BadPath {
        /// The full path from the delta.
        path: Vec<usize>,
        /// The depth at which resolution failed.
        depth: usize,
    },

    /// A delta removed a property that is not present.
    #[error("property {0:?} not present")]
    MissingProperty(String),
}

impl ModelError {
    /// Creates a codec error from any display-able cause.
    pub fn codec(cause: impl std::fmt::Display) -> Self {
        Self::Codec(cause.to_string())
    }
}
