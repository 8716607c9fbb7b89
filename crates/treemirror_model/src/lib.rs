//! # Treemirror Model
//!
//! Reference value-tree model for treemirror.
//!
//! This crate provides:
//! - A dynamic [`Value`] type for node properties
//! - The [`Tree`] node type: a kind, ordered properties, ordered children
//! - [`TreeDelta`], the encoded change record: one mutation per record,
//!   addressed by a child-index path, serialized as CBOR
//! - [`Tree::diff`] for deriving a delta sequence between two trees
//! - [`TrackedTree`], a mutation source that applies each edit locally
//!   and emits exactly one encoded delta to a subscriber hook
//!
//! The synchronisation engine in `treemirror_core` treats change records
//! as opaque bytes; this crate owns their format. Trees have value
//! semantics throughout: cloning a [`Tree`] yields an independent copy,
//! and two trees compare equal when their kinds, properties and children
//! all match.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod delta;
mod error;
mod tracked;
mod tree;
mod value;

pub use delta::{TreeDelta, TreePath};
pub use error::{ModelError, ModelResult};
pub use tracked::{ChangeHook, TrackedTree, ROOT};
pub use tree::Tree;
pub use value::Value;
