//! Graph Nodes
//!
//! This module defines the per-item bookkeeping that lives in the dependency graph.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::reference::{ItemKey, Reference};

/// Where a node stands in the resolution lifecycle.
///
/// Resolved items are removed from the graph, so there is no variant for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    /// At least one prerequisite has not been resolved yet.
    Pending,

    /// All prerequisites are resolved and nobody has picked the item up.
    Ready,

    /// The item was handed out. Its dependents stay blocked until it resolves.
    Resolving,
}

/// A node in the dependency graph.
#[derive(Debug, Clone)]
pub struct Node<T> {
    /// The tracked item and its key.
    reference: Reference<T>,

    /// Prerequisites that have not been resolved yet.
    ///
    /// Signed so that an unbalanced decrement reads as "nothing left"
    /// instead of wrapping around.
    dependency_counter: i64,

    /// Keys of the items that depend on this one, in declaration order.
    /// The same key appears twice if the edge was declared twice.
    dependents: SmallVec<[ItemKey; 4]>,

    /// Set once the item has been handed out for resolution.
    started: bool,
}

impl<T> Node<T> {
    /// Create a new node with no dependencies and no dependents.
    pub fn new(reference: Reference<T>) -> Self {
        Self {
            reference,
            dependency_counter: 0,
            dependents: SmallVec::new(),
            started: false,
        }
    }

    /// Get the node's key.
    pub fn id(&self) -> ItemKey {
        self.reference.id()
    }

    /// Get the wrapped reference.
    pub fn reference(&self) -> &Reference<T> {
        &self.reference
    }

    /// Get the tracked item.
    pub fn item(&self) -> &T {
        self.reference.value()
    }

    /// Record one more unresolved prerequisite.
    pub fn add_dependency(&mut self) {
        self.dependency_counter += 1;
    }

    /// Record an item that depends on this one.
    pub fn add_dependent(&mut self, key: ItemKey) {
        self.dependents.push(key);
    }

    /// Record that one prerequisite was resolved.
    pub fn decrease_dependency_counter(&mut self) {
        self.dependency_counter -= 1;
    }

    /// Remaining prerequisite count.
    pub fn dependency_counter(&self) -> i64 {
        self.dependency_counter
    }

    pub fn has_dependencies_left(&self) -> bool {
        self.dependency_counter > 0
    }

    pub fn has_dependents(&self) -> bool {
        !self.dependents.is_empty()
    }

    /// Get all dependents.
    pub fn dependents(&self) -> &[ItemKey] {
        &self.dependents
    }

    pub fn set_started(&mut self, started: bool) {
        self.started = started;
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Check if the node can be handed out right now.
    pub fn is_ready(&self) -> bool {
        !self.has_dependencies_left() && !self.started
    }

    /// Current lifecycle state.
    pub fn state(&self) -> NodeState {
        if self.started {
            NodeState::Resolving
        } else if self.has_dependencies_left() {
            NodeState::Pending
        } else {
            NodeState::Ready
        }
    }
}
