//! Graph Snapshots
//!
//! A snapshot is an owned, item-free copy of the graph's bookkeeping. It is
//! what a [`GraphError::CircularDependency`](crate::GraphError::CircularDependency)
//! carries for diagnostics, and it gives two graphs a structural equality.

use serde::{Deserialize, Serialize};

use super::node::{Node, NodeState};
use super::reference::ItemKey;

/// Bookkeeping of a single node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub key: ItemKey,
    pub state: NodeState,
    /// Unresolved prerequisite count.
    pub remaining: i64,
    /// Recorded dependents, in declaration order.
    pub dependents: Vec<ItemKey>,
}

impl<T> From<&Node<T>> for NodeSnapshot {
    fn from(node: &Node<T>) -> Self {
        Self {
            key: node.id(),
            state: node.state(),
            remaining: node.dependency_counter(),
            dependents: node.dependents().to_vec(),
        }
    }
}

/// Bookkeeping of every live node, in node-set order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<NodeSnapshot>,
}

impl GraphSnapshot {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node by key.
    pub fn get(&self, key: ItemKey) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|node| node.key == key)
    }

    /// Count recorded edges.
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|node| node.dependents.len()).sum()
    }

    /// Render as JSON for logs and bug reports.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl<'a, T: 'a> FromIterator<&'a Node<T>> for GraphSnapshot {
    fn from_iter<I: IntoIterator<Item = &'a Node<T>>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().map(NodeSnapshot::from).collect(),
        }
    }
}
