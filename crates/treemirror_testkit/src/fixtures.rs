//! Test fixtures: sample trees and shape-safe mutation scripts.

use treemirror_model::{ModelResult, TrackedTree, Tree, TreeDelta, TreePath, Value};

/// Returns a small project-shaped tree used across tests.
pub fn sample_project() -> Tree {
    let mut root = Tree::new("project");
    root.set_property("name", "fixture");
    root.set_property("rate", 48_000i64);

    for i in 0..3i64 {
        let mut track = Tree::new("track");
        track.set_property("index", i);
        track.set_property("gain", 1.0f64);
        let mut clip = Tree::new("clip");
        clip.set_property("start", i * 100);
        track.insert_child(0, clip).expect("fixture tree");
        root.insert_child(root.child_count(), track)
            .expect("fixture tree");
    }
    root
}

/// One step of a mutation script.
///
/// Scripts must stay applicable whatever shape the tree has reached, so
/// every step carries *seeds* rather than concrete positions: a seed is
/// reduced modulo the relevant count at apply time. A step that has no
/// valid target on the current shape (removing a property from a bare
/// node, say) resolves to nothing and mutates neither side.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOp {
    /// Set a property on the seed-selected node.
    SetProperty {
        /// Selects the target node (pre-order, modulo node count).
        node_seed: usize,
        /// Property name.
        name: String,
        /// Property value.
        value: Value,
    },
    /// Remove a seed-selected property from a seed-selected node.
    RemoveProperty {
        /// Selects the target node.
        node_seed: usize,
        /// Selects among the node's properties.
        name_seed: usize,
    },
    /// Insert a fresh child under a seed-selected node.
    InsertChild {
        /// Selects the parent node.
        node_seed: usize,
        /// Selects the insertion index (modulo child count + 1).
        slot_seed: usize,
        /// Kind of the new child.
        kind: String,
    },
    /// Remove a seed-selected child.
    RemoveChild {
        /// Selects the parent node.
        node_seed: usize,
        /// Selects the child (modulo child count).
        slot_seed: usize,
    },
    /// Reorder a seed-selected child.
    MoveChild {
        /// Selects the parent node.
        node_seed: usize,
        /// Selects the child to move.
        from_seed: usize,
        /// Selects the destination.
        to_seed: usize,
    },
}

impl MutationOp {
    /// Resolves the step against the tree's current shape.
    ///
    /// Returns the concrete delta this step performs, or `None` if the
    /// step has no valid target right now.
    pub fn to_delta(&self, tree: &Tree) -> Option<TreeDelta> {
        match self {
            MutationOp::SetProperty {
                node_seed,
                name,
                value,
            } => Some(TreeDelta::SetProperty {
                path: nth_path(tree, *node_seed),
                name: name.clone(),
                value: value.clone(),
            }),
            MutationOp::RemoveProperty {
                node_seed,
                name_seed,
            } => {
                let path = nth_path(tree, *node_seed);
                let node = tree.node_at(&path).ok()?;
                let names: Vec<_> = node.properties().map(|(n, _)| n.to_string()).collect();
                if names.is_empty() {
                    return None;
                }
                Some(TreeDelta::RemoveProperty {
                    path,
                    name: names[name_seed % names.len()].clone(),
                })
            }
            MutationOp::InsertChild {
                node_seed,
                slot_seed,
                kind,
            } => {
                let path = nth_path(tree, *node_seed);
                let node = tree.node_at(&path).ok()?;
                Some(TreeDelta::InsertChild {
                    path,
                    index: slot_seed % (node.child_count() + 1),
                    child: Tree::new(kind.clone()),
                })
            }
            MutationOp::RemoveChild {
                node_seed,
                slot_seed,
            } => {
                let path = nth_path(tree, *node_seed);
                let node = tree.node_at(&path).ok()?;
                if node.child_count() == 0 {
                    return None;
                }
                Some(TreeDelta::RemoveChild {
                    path,
                    index: slot_seed % node.child_count(),
                })
            }
            MutationOp::MoveChild {
                node_seed,
                from_seed,
                to_seed,
            } => {
                let path = nth_path(tree, *node_seed);
                let node = tree.node_at(&path).ok()?;
                if node.child_count() < 2 {
                    return None;
                }
                Some(TreeDelta::MoveChild {
                    path,
                    from: from_seed % node.child_count(),
                    // Interpreted post-removal, so modulo the full count
                    // still lands in range.
                    to: to_seed % node.child_count(),
                })
            }
        }
    }

    /// Applies the step to a tracked tree, emitting its record.
    ///
    /// Returns whether the step mutated anything.
    ///
    /// # Errors
    ///
    /// Propagates model errors; a resolved step never fails on the
    /// shape it resolved against.
    pub fn apply_tracked(&self, tracked: &mut TrackedTree) -> ModelResult<bool> {
        let Some(delta) = self.to_delta(tracked.tree()) else {
            return Ok(false);
        };
        match delta {
            TreeDelta::SetProperty { path, name, value } => {
                tracked.set_property(&path, name, value)?;
            }
            TreeDelta::RemoveProperty { path, name } => {
                tracked.remove_property(&path, name)?;
            }
            TreeDelta::InsertChild { path, index, child } => {
                tracked.insert_child(&path, index, child)?;
            }
            TreeDelta::RemoveChild { path, index } => {
                tracked.remove_child(&path, index)?;
            }
            TreeDelta::MoveChild { path, from, to } => {
                tracked.move_child(&path, from, to)?;
            }
            // Scripts never resolve to snapshots.
            TreeDelta::FullSync { .. } => {}
        }
        Ok(true)
    }

    /// Applies the step directly to a plain tree.
    ///
    /// Returns whether the step mutated anything.
    ///
    /// # Errors
    ///
    /// Propagates model errors; a resolved step never fails on the
    /// shape it resolved against.
    pub fn apply_plain(&self, tree: &mut Tree) -> ModelResult<bool> {
        match self.to_delta(tree) {
            Some(delta) => {
                delta.apply(tree)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Applies a whole script to a tracked tree.
///
/// Returns the number of steps that actually mutated.
///
/// # Errors
///
/// Stops at the first failing step.
pub fn apply_script_tracked(tracked: &mut TrackedTree, script: &[MutationOp]) -> ModelResult<usize> {
    let mut mutated = 0;
    for op in script {
        if op.apply_tracked(tracked)? {
            mutated += 1;
        }
    }
    Ok(mutated)
}

/// Applies a whole script to a plain tree (the reference side).
///
/// Returns the number of steps that actually mutated.
///
/// # Errors
///
/// Stops at the first failing step.
pub fn apply_script_plain(tree: &mut Tree, script: &[MutationOp]) -> ModelResult<usize> {
    let mut mutated = 0;
    for op in script {
        if op.apply_plain(tree)? {
            mutated += 1;
        }
    }
    Ok(mutated)
}

/// Selects the `seed % node_count`-th node in pre-order, as a path.
pub fn nth_path(tree: &Tree, seed: usize) -> TreePath {
    fn walk(node: &Tree, remaining: &mut usize, path: &mut TreePath) -> bool {
        if *remaining == 0 {
            return true;
        }
        *remaining -= 1;
        for (i, child) in node.children().enumerate() {
            path.push(i);
            if walk(child, remaining, path) {
                return true;
            }
            path.pop();
        }
        false
    }

    let mut remaining = seed % tree.node_count();
    let mut path = Vec::new();
    walk(tree, &mut remaining, &mut path);
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nth_path_walks_preorder() {
        let tree = sample_project();
        // 0: root, 1: first track, 2: its clip, 3: second track, ...
        assert_eq!(nth_path(&tree, 0), Vec::<usize>::new());
        assert_eq!(nth_path(&tree, 1), vec![0]);
        assert_eq!(nth_path(&tree, 2), vec![0, 0]);
        assert_eq!(nth_path(&tree, 3), vec![1]);
        // Wraps around modulo node count.
        assert_eq!(nth_path(&tree, tree.node_count()), Vec::<usize>::new());
    }

    #[test]
    fn unresolvable_steps_are_no_ops() {
        let mut tree = Tree::new("bare");
        let op = MutationOp::RemoveProperty {
            node_seed: 0,
            name_seed: 0,
        };
        assert_eq!(op.to_delta(&tree), None);
        assert!(!op.apply_plain(&mut tree).unwrap());
        assert_eq!(tree, Tree::new("bare"));

        let op = MutationOp::MoveChild {
            node_seed: 0,
            from_seed: 0,
            to_seed: 1,
        };
        assert_eq!(op.to_delta(&tree), None);
    }

    #[test]
    fn tracked_and_plain_stay_in_lockstep() {
        let script = vec![
            MutationOp::SetProperty {
                node_seed: 0,
                name: "a".into(),
                value: Value::Int(1),
            },
            MutationOp::InsertChild {
                node_seed: 0,
                slot_seed: 7,
                kind: "leaf".into(),
            },
            MutationOp::SetProperty {
                node_seed: 5,
                name: "b".into(),
                value: Value::Text("x".into()),
            },
            MutationOp::MoveChild {
                node_seed: 0,
                from_seed: 3,
                to_seed: 1,
            },
            MutationOp::RemoveChild {
                node_seed: 0,
                slot_seed: 2,
            },
        ];

        let mut reference = sample_project();
        let mut tracked = TrackedTree::new(sample_project(), Box::new(|_| {}));

        let a = apply_script_plain(&mut reference, &script).unwrap();
        let b = apply_script_tracked(&mut tracked, &script).unwrap();

        assert_eq!(a, b);
        assert_eq!(tracked.tree(), &reference);
    }
}
