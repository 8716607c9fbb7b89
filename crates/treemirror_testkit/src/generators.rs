//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random trees and mutation
//! scripts that maintain required invariants.

use proptest::prelude::*;
use treemirror_model::{Tree, Value};

use crate::fixtures::MutationOp;

/// Strategy for generating node kinds.
pub fn kind_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,11}").expect("Invalid regex")
}

/// Strategy for generating property names.
pub fn property_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-zA-Z0-9]{0,7}").expect("Invalid regex")
}

/// Strategy for generating property values.
///
/// Floats stay finite so tree equality behaves like equality.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        1 => Just(Value::Null),
        2 => any::<bool>().prop_map(Value::Bool),
        4 => any::<i64>().prop_map(Value::Int),
        2 => (-1.0e9f64..1.0e9).prop_map(Value::Float),
        4 => ".{0,24}".prop_map(Value::Text),
        1 => prop::collection::vec(any::<u8>(), 0..32).prop_map(Value::Bytes),
    ]
}

/// Strategy for generating whole trees, up to a few levels deep.
pub fn tree_strategy() -> impl Strategy<Value = Tree> {
    let leaf = (
        kind_strategy(),
        prop::collection::vec((property_name_strategy(), value_strategy()), 0..4),
    )
        .prop_map(|(kind, props)| {
            let mut node = Tree::new(kind);
            for (name, value) in props {
                node.set_property(name, value);
            }
            node
        });

    leaf.prop_recursive(3, 40, 4, |inner| {
        (
            kind_strategy(),
            prop::collection::vec((property_name_strategy(), value_strategy()), 0..4),
            prop::collection::vec(inner, 0..4),
        )
            .prop_map(|(kind, props, children)| {
                let mut node = Tree::new(kind);
                for (name, value) in props {
                    node.set_property(name, value);
                }
                for child in children {
                    let at = node.child_count();
                    node.insert_child(at, child).expect("append in range");
                }
                node
            })
    })
}

/// Strategy for generating a single mutation step.
pub fn mutation_op_strategy() -> impl Strategy<Value = MutationOp> {
    prop_oneof![
        4 => (any::<usize>(), property_name_strategy(), value_strategy())
            .prop_map(|(node_seed, name, value)| MutationOp::SetProperty { node_seed, name, value }),
        1 => (any::<usize>(), any::<usize>())
            .prop_map(|(node_seed, name_seed)| MutationOp::RemoveProperty { node_seed, name_seed }),
        3 => (any::<usize>(), any::<usize>(), kind_strategy())
            .prop_map(|(node_seed, slot_seed, kind)| MutationOp::InsertChild { node_seed, slot_seed, kind }),
        1 => (any::<usize>(), any::<usize>())
            .prop_map(|(node_seed, slot_seed)| MutationOp::RemoveChild { node_seed, slot_seed }),
        2 => (any::<usize>(), any::<usize>(), any::<usize>())
            .prop_map(|(node_seed, from_seed, to_seed)| MutationOp::MoveChild { node_seed, from_seed, to_seed }),
    ]
}

/// Strategy for generating a mutation script.
pub fn script_strategy(min_ops: usize, max_ops: usize) -> impl Strategy<Value = Vec<MutationOp>> {
    prop::collection::vec(mutation_op_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
