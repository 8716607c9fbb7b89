//! Encoded change records.
//!
//! A [`TreeDelta`] describes exactly one mutation to a tree, addressed
//! by a child-index path. Deltas are what a mutation source emits and
//! what the reconciler replays; on the wire they are opaque CBOR blobs.
//!
//! Deltas are deliberately single-mutation: the synchronisation channel
//! moves strictly one record per operation, and replay order carries the
//! causality between structural changes (a property set on a child only
//! makes sense after the record that inserted the child).

use crate::error::{ModelError, ModelResult};
use crate::tree::Tree;
use crate::value::Value;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A path of child indices from the root; the empty path is the root.
pub type TreePath = Vec<usize>;

/// One encoded mutation to a tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeDelta {
    /// Replace the whole tree with a complete snapshot.
    FullSync {
        /// The authoritative state to adopt.
        tree: Tree,
    },
    /// Set (or overwrite) a property on the node at `path`.
    SetProperty {
        /// Node the property lives on.
        path: TreePath,
        /// Property name.
        name: String,
        /// New value.
        value: Value,
    },
    /// Remove a property from the node at `path`.
    RemoveProperty {
        /// Node the property lives on.
        path: TreePath,
        /// Property name.
        name: String,
    },
    /// Insert a child under the node at `path`.
    InsertChild {
        /// Parent node.
        path: TreePath,
        /// Insertion index among the parent's children.
        index: usize,
        /// The subtree to insert.
        child: Tree,
    },
    /// Remove the child at `index` under the node at `path`.
    RemoveChild {
        /// Parent node.
        path: TreePath,
        /// Index of the child to remove.
        index: usize,
    },
    /// Reorder a child under the node at `path`.
    MoveChild {
        /// Parent node.
        path: TreePath,
        /// Current index of the child.
        from: usize,
        /// Index after the move (interpreted post-removal).
        to: usize,
    },
}

impl TreeDelta {
    /// Encodes the delta to its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Codec`] if serialization fails.
    pub fn encode(&self) -> ModelResult<Bytes> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(ModelError::codec)?;
        Ok(Bytes::from(buf))
    }

    /// Decodes a delta from its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Codec`] if the bytes are not a valid delta.
    pub fn decode(bytes: &[u8]) -> ModelResult<Self> {
        ciborium::from_reader(bytes).map_err(ModelError::codec)
    }

    /// Applies the delta to a tree.
    ///
    /// # Errors
    ///
    /// Returns a path or index error if the delta does not fit the
    /// tree's current shape. A failed apply may leave no partial effect:
    /// each delta is a single mutation.
    pub fn apply(&self, tree: &mut Tree) -> ModelResult<()> {
        match self {
            TreeDelta::FullSync { tree: snapshot } => {
                *tree = snapshot.clone();
                Ok(())
            }
            TreeDelta::SetProperty { path, name, value } => {
                tree.node_at_mut(path)?
                    .set_property(name.clone(), value.clone());
                Ok(())
            }
            TreeDelta::RemoveProperty { path, name } => {
                tree.node_at_mut(path)?.remove_property(name)?;
                Ok(())
            }
            TreeDelta::InsertChild { path, index, child } => {
                tree.node_at_mut(path)?.insert_child(*index, child.clone())
            }
            TreeDelta::RemoveChild { path, index } => {
                tree.node_at_mut(path)?.remove_child(*index)?;
                Ok(())
            }
            TreeDelta::MoveChild { path, from, to } => {
                tree.node_at_mut(path)?.move_child(*from, *to)
            }
        }
    }
}

impl Tree {
    /// Computes a delta sequence that transforms `self` into `target`.
    ///
    /// Applying the returned deltas to a copy of `self`, in order,
    /// yields a tree equal to `target`. The sequence is not guaranteed
    /// minimal: reorders come out as remove/insert pairs, and a root
    /// kind change degenerates to a single [`TreeDelta::FullSync`].
    pub fn diff(&self, target: &Tree) -> Vec<TreeDelta> {
        let mut deltas = Vec::new();
        diff_node(self, target, &mut Vec::new(), &mut deltas);
        deltas
    }
}

fn diff_node(base: &Tree, target: &Tree, path: &mut TreePath, out: &mut Vec<TreeDelta>) {
    if base.kind() != target.kind() {
        if path.is_empty() {
            out.push(TreeDelta::FullSync {
                tree: target.clone(),
            });
        } else {
            // A kind change below the root is a replace of that child.
            let index = *path.last().unwrap_or(&0);
            let parent: TreePath = path[..path.len() - 1].to_vec();
            out.push(TreeDelta::RemoveChild {
                path: parent.clone(),
                index,
            });
            out.push(TreeDelta::InsertChild {
                path: parent,
                index,
                child: target.clone(),
            });
        }
        return;
    }

    // Properties no longer present.
    for (name, _) in base.properties() {
        if target.property(name).is_none() {
            out.push(TreeDelta::RemoveProperty {
                path: path.clone(),
                name: name.to_string(),
            });
        }
    }
    // New or changed properties.
    for (name, value) in target.properties() {
        if base.property(name) != Some(value) {
            out.push(TreeDelta::SetProperty {
                path: path.clone(),
                name: name.to_string(),
                value: value.clone(),
            });
        }
    }

    // Children: recurse over the common prefix, then trim or extend.
    let common = base.child_count().min(target.child_count());
    for (i, (base_child, target_child)) in base.children().zip(target.children()).enumerate() {
        path.push(i);
        diff_node(base_child, target_child, path, out);
        path.pop();
    }
    // Remove surplus children back-to-front so indices stay valid.
    for i in (common..base.child_count()).rev() {
        out.push(TreeDelta::RemoveChild {
            path: path.clone(),
            index: i,
        });
    }
    for i in common..target.child_count() {
        if let Some(child) = target.child(i) {
            out.push(TreeDelta::InsertChild {
                path: path.clone(),
                index: i,
                child: child.clone(),
            });
        }
    }
}
