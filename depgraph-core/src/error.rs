//! Error types for graph operations
//!
//! Every fallible operation on a [`DependencyGraph`](crate::graph::DependencyGraph)
//! reports one of these variants. Errors are raised at the point of violation
//! and never leave the graph half-mutated.

use thiserror::Error;

use crate::graph::{GraphSnapshot, ItemKey};

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors that can occur during graph operations
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum GraphError {
    /// The value has no stable identity and cannot be tracked
    #[error("expected an item with a stable identity, value of type `{type_name}` given")]
    InvalidItem {
        /// Type name of the rejected value
        type_name: &'static str,
    },

    /// The item is not (or no longer) part of the live node set
    #[error("item {key} is not within the graph")]
    UnknownItem {
        /// Identity key of the missing item
        key: ItemKey,
    },

    /// A structural mutation was attempted after the graph was sealed
    #[error("graph is already initialized and locked (read-only mode)")]
    Locked,

    /// The graph has no valid resolution order
    #[error("cannot find an entry point to the graph, you have built a cycle: {}", render_path(.cycle))]
    CircularDependency {
        /// One concrete cycle, first key repeated at the end
        cycle: Vec<ItemKey>,
        /// State of the live graph when the cycle was found
        snapshot: Box<GraphSnapshot>,
    },
}

impl GraphError {
    /// Creates an invalid item error for a value of type `I`
    pub fn invalid_item<I: ?Sized>() -> Self {
        Self::InvalidItem {
            type_name: std::any::type_name::<I>(),
        }
    }

    /// Creates an unknown item error
    pub fn unknown_item(key: ItemKey) -> Self {
        Self::UnknownItem { key }
    }

    /// Creates a circular dependency error
    pub fn circular_dependency(cycle: Vec<ItemKey>, snapshot: GraphSnapshot) -> Self {
        Self::CircularDependency {
            cycle,
            snapshot: Box::new(snapshot),
        }
    }

    /// Returns the offending cycle, if this is a circular dependency error
    pub fn cycle(&self) -> Option<&[ItemKey]> {
        match self {
            Self::CircularDependency { cycle, .. } => Some(cycle),
            _ => None,
        }
    }
}

fn render_path(path: &[ItemKey]) -> String {
    path.iter()
        .map(ItemKey::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
