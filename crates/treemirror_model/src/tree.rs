//! The value-tree node type.

use crate::error::{ModelError, ModelResult};
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// A node in a value tree.
///
/// Every node has a *kind* (a type name), an ordered list of named
/// properties, and an ordered list of children. The whole structure has
/// value semantics: `Clone` produces a deep, independent copy, and
/// `PartialEq` compares structure and contents.
///
/// Nodes inside a tree are addressed by a path of child indices, with
/// the empty path naming the root.
///
/// # Example
///
/// ```
/// use treemirror_model::{Tree, Value};
///
/// let mut project = Tree::new("project");
/// project.set_property("name", "demo");
/// project.insert_child(0, Tree::new("track")).unwrap();
///
/// assert_eq!(project.property("name"), Some(&Value::from("demo")));
/// assert_eq!(project.child_count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    kind: String,
    properties: Vec<(String, Value)>,
    children: Vec<Tree>,
}

impl Tree {
    /// Creates a node of the given kind with no properties or children.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            properties: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Returns the node's kind.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the value of a property, if present.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Sets a property, replacing any existing value in place.
    ///
    /// New properties are appended, so property order records first
    /// insertion order.
    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.properties.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.properties.push((name, value)),
        }
    }

    /// Removes a property, returning its value.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingProperty`] if no such property exists.
    pub fn remove_property(&mut self, name: &str) -> ModelResult<Value> {
        match self.properties.iter().position(|(n, _)| n == name) {
            Some(i) => Ok(self.properties.remove(i).1),
            None => Err(ModelError::MissingProperty(name.to_string())),
        }
    }

    /// Iterates over the properties in order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Returns the number of properties.
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Returns the child at `index`, if present.
    pub fn child(&self, index: usize) -> Option<&Tree> {
        self.children.get(index)
    }

    /// Iterates over the children in order.
    pub fn children(&self) -> impl Iterator<Item = &Tree> {
        self.children.iter()
    }

    /// Returns the number of children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Inserts a child at `index`, shifting later children right.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ChildOutOfRange`] if `index > child_count()`.
    pub fn insert_child(&mut self, index: usize, child: Tree) -> ModelResult<()> {
        if index > self.children.len() {
            return Err(ModelError::ChildOutOfRange {
                index,
                len: self.children.len(),
            });
        }
        self.children.insert(index, child);
        Ok(())
    }

    /// Removes and returns the child at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ChildOutOfRange`] if no child exists there.
    pub fn remove_child(&mut self, index: usize) -> ModelResult<Tree> {
        if index >= self.children.len() {
            return Err(ModelError::ChildOutOfRange {
                index,
                len: self.children.len(),
            });
        }
        Ok(self.children.remove(index))
    }

    /// Moves the child at `from` so that it ends up at index `to`.
    ///
    /// `to` is interpreted after the removal, so moving a child towards
    /// the end does not need an off-by-one adjustment by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ChildOutOfRange`] if either index is out of
    /// range.
    pub fn move_child(&mut self, from: usize, to: usize) -> ModelResult<()> {
        if from >= self.children.len() {
            return Err(ModelError::ChildOutOfRange {
                index: from,
                len: self.children.len(),
            });
        }
        let child = self.children.remove(from);
        if to > self.children.len() {
            let len = self.children.len();
            // Undo the removal before failing.
            self.children.insert(from, child);
            return Err(ModelError::ChildOutOfRange { index: to, len });
        }
        self.children.insert(to, child);
        Ok(())
    }

    /// Resolves a child-index path to a node.
    ///
    /// The empty path resolves to `self`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::BadPath`] if some step has no such child.
    pub fn node_at(&self, path: &[usize]) -> ModelResult<&Tree> {
        let mut node = self;
        for (depth, &index) in path.iter().enumerate() {
            node = node.child(index).ok_or_else(|| ModelError::BadPath {
                path: path.to_vec(),
                depth,
            })?;
        }
        Ok(node)
    }

    /// Resolves a child-index path to a mutable node.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::BadPath`] if some step has no such child.
    pub fn node_at_mut(&mut self, path: &[usize]) -> ModelResult<&mut Tree> {
        let mut node = self;
        for (depth, &index) in path.iter().enumerate() {
            node = node.children.get_mut(index).ok_or(ModelError::BadPath {
                path: path.to_vec(),
                depth,
            })?;
        }
        Ok(node)
    }

    /// Returns the total number of nodes in the tree, root included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Tree::node_count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_set_get_remove() {
        let mut t = Tree::new("node");
        assert_eq!(t.property("a"), None);

        t.set_property("a", 1i64);
        t.set_property("b", "two");
        assert_eq!(t.property("a"), Some(&Value::Int(1)));
        assert_eq!(t.property_count(), 2);

        // Replacing keeps position.
        t.set_property("a", 10i64);
        let names: Vec<_> = t.properties().map(|(n, _)| n.to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);

        assert_eq!(t.remove_property("a").unwrap(), Value::Int(10));
        assert!(matches!(
            t.remove_property("a"),
            Err(ModelError::MissingProperty(_))
        ));
    }

    #[test]
    fn child_insert_remove() {
        let mut t = Tree::new("root");
        t.insert_child(0, Tree::new("a")).unwrap();
        t.insert_child(1, Tree::new("c")).unwrap();
        t.insert_child(1, Tree::new("b")).unwrap();

        let kinds: Vec<_> = t.children().map(|c| c.kind().to_string()).collect();
        assert_eq!(kinds, vec!["a", "b", "c"]);

        assert!(t.insert_child(5, Tree::new("x")).is_err());

        let removed = t.remove_child(1).unwrap();
        assert_eq!(removed.kind(), "b");
        assert!(t.remove_child(2).is_err());
    }

    #[test]
    fn move_child_reorders() {
        let mut t = Tree::new("root");
        for kind in ["a", "b", "c"] {
            t.insert_child(t.child_count(), Tree::new(kind)).unwrap();
        }

        t.move_child(0, 2).unwrap();
        let kinds: Vec<_> = t.children().map(|c| c.kind().to_string()).collect();
        assert_eq!(kinds, vec!["b", "c", "a"]);

        // Out-of-range target leaves the tree unchanged.
        assert!(t.move_child(0, 9).is_err());
        let kinds: Vec<_> = t.children().map(|c| c.kind().to_string()).collect();
        assert_eq!(kinds, vec!["b", "c", "a"]);
    }

    #[test]
    fn path_resolution() {
        let mut root = Tree::new("root");
        let mut mid = Tree::new("mid");
        mid.insert_child(0, Tree::new("leaf")).unwrap();
        root.insert_child(0, mid).unwrap();

        assert_eq!(root.node_at(&[]).unwrap().kind(), "root");
        assert_eq!(root.node_at(&[0]).unwrap().kind(), "mid");
        assert_eq!(root.node_at(&[0, 0]).unwrap().kind(), "leaf");

        let err = root.node_at(&[0, 3]).unwrap_err();
        assert!(matches!(err, ModelError::BadPath { depth: 1, .. }));

        root.node_at_mut(&[0, 0]).unwrap().set_property("x", 1i64);
        assert_eq!(
            root.node_at(&[0, 0]).unwrap().property("x"),
            Some(&Value::Int(1))
        );
    }

    #[test]
    fn value_semantics() {
        let mut a = Tree::new("n");
        a.set_property("p", 1i64);
        let b = a.clone();

        a.set_property("p", 2i64);
        assert_ne!(a, b);
        assert_eq!(b.property("p"), Some(&Value::Int(1)));
    }

    #[test]
    fn node_count_counts_all() {
        let mut root = Tree::new("root");
        let mut mid = Tree::new("mid");
        mid.insert_child(0, Tree::new("leaf")).unwrap();
        root.insert_child(0, mid).unwrap();
        root.insert_child(1, Tree::new("other")).unwrap();
        assert_eq!(root.node_count(), 4);
    }
}
