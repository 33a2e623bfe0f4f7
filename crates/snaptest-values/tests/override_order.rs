//! Property tests for override ordering

use proptest::prelude::*;
use snaptest_values::{OverrideChain, Overridable};

#[derive(Debug, Clone)]
struct Node {
    name: String,
    parent: Option<String>,
}

impl Overridable for Node {
    fn name(&self) -> &str {
        &self.name
    }

    fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }
}

/// Random forest: entry `i` may only name an earlier entry as parent,
/// registered in a shuffled order.
fn forest() -> impl Strategy<Value = Vec<Node>> {
    prop::collection::vec(prop::option::of(any::<prop::sample::Index>()), 1..24)
        .prop_map(|parents| {
            parents
                .iter()
                .enumerate()
                .map(|(i, parent)| Node {
                    name: format!("n{i}"),
                    parent: match parent {
                        Some(index) if i > 0 => Some(format!("n{}", index.index(i))),
                        _ => None,
                    },
                })
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}

proptest! {
    #[test]
    fn children_always_precede_ancestors(nodes in forest()) {
        let chain = OverrideChain::build(nodes.clone()).unwrap();
        let names = chain.names();
        prop_assert_eq!(names.len(), nodes.len());

        let position = |name: &str| names.iter().position(|n| *n == name).unwrap();
        for node in &nodes {
            if let Some(parent) = &node.parent {
                prop_assert!(position(&node.name) < position(parent));
            }
        }
    }

    #[test]
    fn roots_keep_registration_order(count in 1usize..16) {
        let nodes: Vec<_> = (0..count)
            .map(|i| Node { name: format!("r{i}"), parent: None })
            .collect();
        let chain = OverrideChain::build(nodes.clone()).unwrap();
        let expected: Vec<_> = nodes.iter().map(|n| n.name.as_str()).collect();
        prop_assert_eq!(chain.names(), expected);
    }
}
