//! Engine wiring for the bundled value-tree model.
//!
//! The engine itself is format-agnostic; this module plugs in
//! `treemirror_model` as the concrete collaborator: records are encoded
//! [`TreeDelta`]s, the applier replays them, and the snapshot source
//! reads the authoritative tree under the same lock the producer
//! mutates it under, so overflow recovery sees a consistent state.

use crate::capture::ChangeCapture;
use crate::error::{CoreError, CoreResult};
use crate::reconcile::{ChangeApplier, ShadowReconciler, SnapshotSource};
use parking_lot::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use treemirror_model::{ModelResult, TrackedTree, Tree, TreeDelta};
use treemirror_ring::blob_ring;

/// Applies encoded [`TreeDelta`] records to a shadow [`Tree`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeApplier;

impl ChangeApplier<Tree> for TreeApplier {
    fn apply(&self, shadow: &mut Tree, record: &[u8]) -> CoreResult<()> {
        let delta = TreeDelta::decode(record).map_err(CoreError::apply)?;
        delta.apply(shadow).map_err(CoreError::apply)
    }
}

/// Snapshot source backed by the shared authoritative tree.
pub struct TreeSnapshotSource {
    inner: Arc<Mutex<TrackedTree>>,
}

impl SnapshotSource<Tree> for TreeSnapshotSource {
    fn snapshot(&self) -> CoreResult<Tree> {
        Ok(self.inner.lock().tree().clone())
    }

    fn snapshot_with(&self, sync: &mut dyn FnMut()) -> CoreResult<Tree> {
        // Edits go through this same lock, so holding it across the
        // ring discard and the clone keeps every captured record on one
        // side of the snapshot: discarded with the stale ones, or
        // pushed after the clone and replayed on top of it.
        let guard = self.inner.lock();
        sync();
        Ok(guard.tree().clone())
    }
}

impl std::fmt::Debug for TreeSnapshotSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeSnapshotSource").finish_non_exhaustive()
    }
}

/// Producer-side handle to the authoritative source tree.
///
/// Mutations go through [`edit`](Self::edit), which holds the tree lock
/// while the mutation runs and its record is captured. Because the
/// snapshot source locks the same tree, a full snapshot can never
/// observe a half-finished edit.
///
/// The handle is cheap to clone, but all clones feed the single capture
/// side of one channel; keep edits on one thread.
#[derive(Clone)]
pub struct SourceTreeHandle {
    inner: Arc<Mutex<TrackedTree>>,
}

impl SourceTreeHandle {
    /// Runs a mutation against the source tree.
    ///
    /// The closure receives the tracked tree; every mutating call on it
    /// emits one record into the channel. Several calls inside one
    /// closure emit several records, in call order.
    ///
    /// # Errors
    ///
    /// Propagates model errors from the mutation itself; a failed
    /// mutation emits no record.
    pub fn edit<R>(&self, f: impl FnOnce(&mut TrackedTree) -> ModelResult<R>) -> ModelResult<R> {
        f(&mut self.inner.lock())
    }

    /// Returns a copy of the current authoritative state.
    pub fn current(&self) -> Tree {
        self.inner.lock().tree().clone()
    }
}

impl std::fmt::Debug for SourceTreeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceTreeHandle").finish_non_exhaustive()
    }
}

/// Reconciler type produced by [`sync_tree`].
pub type TreeReconciler = ShadowReconciler<Tree, TreeApplier, TreeSnapshotSource>;

/// Wires a source tree to a shadow replica through a channel of the
/// given capacity.
///
/// Returns the producer-side [`SourceTreeHandle`] and the consumer-side
/// reconciler. The shadow starts as a copy of `initial`, so the two
/// sides agree before the first mutation.
///
/// # Errors
///
/// Returns [`CoreError::InvalidCapacity`] if `capacity` is zero.
pub fn sync_tree(initial: Tree, capacity: usize) -> CoreResult<(SourceTreeHandle, TreeReconciler)> {
    let (producer, consumer) = blob_ring(capacity)?;
    let overflow = Arc::new(AtomicBool::new(false));
    let capture = ChangeCapture::new(producer, Arc::clone(&overflow));

    let tracked = TrackedTree::new(initial.clone(), capture.into_hook());
    let inner = Arc::new(Mutex::new(tracked));

    let source = TreeSnapshotSource {
        inner: Arc::clone(&inner),
    };
    let reconciler =
        ShadowReconciler::from_parts(consumer, overflow, initial, TreeApplier, source);

    Ok((SourceTreeHandle { inner }, reconciler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use treemirror_model::ROOT;

    #[test]
    fn zero_capacity_fails() {
        assert!(matches!(
            sync_tree(Tree::new("root"), 0),
            Err(CoreError::InvalidCapacity)
        ));
    }

    #[test]
    fn edits_propagate_to_shadow() {
        let (source, mut reconciler) = sync_tree(Tree::new("project"), 16).unwrap();

        source
            .edit(|t| {
                t.set_property(ROOT, "name", "demo")?;
                t.insert_child(ROOT, 0, Tree::new("track"))?;
                t.set_property(&[0], "gain", 0.5f64)
            })
            .unwrap();

        assert!(reconciler.drain().unwrap());
        assert_eq!(reconciler.shadow(), &source.current());
    }

    #[test]
    fn shadow_starts_equal_to_initial() {
        let mut initial = Tree::new("project");
        initial.set_property("seed", 1i64);

        let (source, reconciler) = sync_tree(initial, 4).unwrap();
        assert_eq!(reconciler.shadow(), &source.current());
    }

    #[test]
    fn overflow_recovers_via_locked_snapshot() {
        let (source, mut reconciler) = sync_tree(Tree::new("root"), 2).unwrap();

        // Burst past the capacity.
        for i in 0..10i64 {
            source.edit(|t| t.set_property(ROOT, "n", i)).unwrap();
        }

        assert!(reconciler.drain().unwrap());
        assert_eq!(reconciler.shadow(), &source.current());
        assert_eq!(reconciler.stats().resyncs, 1);
    }

    #[test]
    fn malformed_record_surfaces_as_apply_error() {
        let mut shadow = Tree::new("root");
        let err = TreeApplier
            .apply(&mut shadow, &[0xDE, 0xAD, 0xBE, 0xEF])
            .unwrap_err();
        assert!(matches!(err, CoreError::Apply(_)));
    }

    #[test]
    fn failed_edit_emits_nothing() {
        let (source, mut reconciler) = sync_tree(Tree::new("root"), 4).unwrap();

        assert!(source.edit(|t| t.remove_child(ROOT, 3)).is_err());
        assert!(!reconciler.drain().unwrap());
    }
}
