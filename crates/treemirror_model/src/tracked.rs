//! A tree that reports every mutation to a subscriber hook.

use crate::delta::TreeDelta;
use crate::error::ModelResult;
use crate::tree::Tree;
use crate::value::Value;

/// Callback invoked with the encoded form of each mutation.
pub type ChangeHook = Box<dyn FnMut(&[u8]) + Send>;

/// A source tree that emits one encoded [`TreeDelta`] per mutation.
///
/// Every mutating method applies the change to the wrapped tree and
/// then hands the encoded record to the hook, so a subscriber observes
/// mutations in exactly the order they happened. A mutation that fails
/// (bad path, missing property) emits nothing.
///
/// This is the producer-side event source the synchronisation engine
/// subscribes to: pass a capture hook at construction and the shadow
/// side will see every edit.
///
/// # Example
///
/// ```
/// use treemirror_model::{TrackedTree, Tree, TreeDelta, ROOT};
///
/// let (tx, rx) = std::sync::mpsc::channel();
/// let mut source = TrackedTree::new(
///     Tree::new("root"),
///     Box::new(move |bytes| { let _ = tx.send(bytes.to_vec()); }),
/// );
///
/// source.set_property(ROOT, "name", "demo").unwrap();
///
/// let record = rx.try_recv().unwrap();
/// let delta = TreeDelta::decode(&record).unwrap();
/// assert!(matches!(delta, TreeDelta::SetProperty { .. }));
/// ```
pub struct TrackedTree {
    tree: Tree,
    hook: ChangeHook,
}

impl TrackedTree {
    /// Wraps a tree, registering the hook that will observe mutations.
    ///
    /// Nothing is emitted for the initial state; call
    /// [`TrackedTree::emit_full_sync`] if the subscriber starts from an
    /// empty shadow.
    pub fn new(tree: Tree, hook: ChangeHook) -> Self {
        Self { tree, hook }
    }

    /// Returns the current state of the source tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Emits a complete snapshot of the current state.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the snapshot cannot be encoded.
    pub fn emit_full_sync(&mut self) -> ModelResult<()> {
        let delta = TreeDelta::FullSync {
            tree: self.tree.clone(),
        };
        self.emit(&delta)
    }

    /// Sets a property on the node at `path`.
    ///
    /// # Errors
    ///
    /// Returns a path error if `path` does not resolve.
    pub fn set_property(
        &mut self,
        path: &[usize],
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> ModelResult<()> {
        let delta = TreeDelta::SetProperty {
            path: path.to_vec(),
            name: name.into(),
            value: value.into(),
        };
        self.apply_and_emit(delta)
    }

    /// Removes a property from the node at `path`.
    ///
    /// # Errors
    ///
    /// Returns a path error or [`MissingProperty`] if absent.
    ///
    /// [`MissingProperty`]: crate::ModelError::MissingProperty
    pub fn remove_property(&mut self, path: &[usize], name: impl Into<String>) -> ModelResult<()> {
        let delta = TreeDelta::RemoveProperty {
            path: path.to_vec(),
            name: name.into(),
        };
        self.apply_and_emit(delta)
    }

    /// Inserts a child under the node at `path`.
    ///
    /// # Errors
    ///
    /// Returns a path or index error if the position is invalid.
    pub fn insert_child(&mut self, path: &[usize], index: usize, child: Tree) -> ModelResult<()> {
        let delta = TreeDelta::InsertChild {
            path: path.to_vec(),
            index,
            child,
        };
        self.apply_and_emit(delta)
    }

    /// Removes the child at `index` under the node at `path`.
    ///
    /// # Errors
    ///
    /// Returns a path or index error if no such child exists.
    pub fn remove_child(&mut self, path: &[usize], index: usize) -> ModelResult<()> {
        let delta = TreeDelta::RemoveChild {
            path: path.to_vec(),
            index,
        };
        self.apply_and_emit(delta)
    }

    /// Reorders a child under the node at `path`.
    ///
    /// # Errors
    ///
    /// Returns a path or index error if either position is invalid.
    pub fn move_child(&mut self, path: &[usize], from: usize, to: usize) -> ModelResult<()> {
        let delta = TreeDelta::MoveChild {
            path: path.to_vec(),
            from,
            to,
        };
        self.apply_and_emit(delta)
    }

    fn apply_and_emit(&mut self, delta: TreeDelta) -> ModelResult<()> {
        // Apply first: a delta the source itself rejects must not reach
        // the subscriber.
        delta.apply(&mut self.tree)?;
        self.emit(&delta)
    }

    fn emit(&mut self, delta: &TreeDelta) -> ModelResult<()> {
        let bytes = delta.encode()?;
        (self.hook)(&bytes);
        Ok(())
    }
}

impl std::fmt::Debug for TrackedTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedTree")
            .field("tree", &self.tree)
            .finish_non_exhaustive()
    }
}

/// Path to the root node, for readability at call sites.
pub const ROOT: &[usize] = &[];
