//! # Treemirror Testkit
//!
//! Test utilities for treemirror.
//!
//! This crate provides:
//! - Test fixtures: sample trees and scripted mutation sequences that
//!   stay valid against any tree shape
//! - Property-based test generators using proptest
//! - Stress harnesses for the concurrent producer/consumer properties
//!
//! ## Usage
//!
//! ```rust,ignore
//! use treemirror_testkit::prelude::*;
//!
//! let result = stress_concurrent_counter(&StressConfig::default());
//! assert!(result.converged);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
