//! # Treemirror Core
//!
//! Lock-free change capture and shadow-tree reconciliation.
//!
//! One thread mutates a source tree; another thread keeps a private
//! shadow replica eventually consistent with it, without locks on the
//! hot path. The two sides communicate through a bounded wait-free
//! ring of opaque encoded change records:
//!
//! ```text
//! source mutation -> ChangeCapture::capture -> ring push (wait-free)
//!                                                  |
//!           [consumer thread]  ShadowReconciler::drain -> replay on shadow
//! ```
//!
//! ## Overflow policy
//!
//! The producer never blocks and never overwrites unread records. When
//! the ring is full, the record is dropped and an overflow flag is set;
//! the next [`drain`](ShadowReconciler::drain) discards whatever is
//! still buffered and rebuilds the shadow from a complete snapshot of
//! the authoritative source. A full snapshot is strictly more complete
//! than any set of dropped increments, so recovery is self-healing and
//! never retries individual records.
//!
//! ## Threading contract
//!
//! Exactly one producer and one consumer, fixed roles. [`ChangeCapture`]
//! lives on the mutating thread, [`ShadowReconciler`] on the replica
//! thread; both are `Send`, neither is `Sync`. Reads of the shadow from
//! further threads go through the value-semantic
//! [`snapshot`](ShadowReconciler::snapshot).
//!
//! ## Usage
//!
//! The engine is generic over the shadow type and the record format via
//! the [`ChangeApplier`] and [`SnapshotSource`] seams. For the bundled
//! value-tree model, [`sync_tree`] wires everything up:
//!
//! ```
//! use treemirror_core::sync_tree;
//! use treemirror_model::{Tree, ROOT};
//!
//! let (source, mut reconciler) = sync_tree(Tree::new("project"), 64).unwrap();
//!
//! source.edit(|t| t.set_property(ROOT, "name", "demo")).unwrap();
//!
//! assert!(reconciler.drain().unwrap());
//! assert_eq!(reconciler.shadow(), &source.current());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod capture;
mod error;
mod reconcile;
mod stats;
mod tree_applier;

pub use capture::ChangeCapture;
pub use error::{CoreError, CoreResult};
pub use reconcile::{shadow_channel, ChangeApplier, ShadowReconciler, SnapshotSource};
pub use stats::{CaptureStats, ReconcilerStats};
pub use tree_applier::{
    sync_tree, SourceTreeHandle, TreeApplier, TreeReconciler, TreeSnapshotSource,
};
