//! Dependency Graph
//!
//! This module implements the dependency resolution engine: a graph of opaque
//! items where an edge means "this item has to be resolved before that one".
//!
//! # Overview
//!
//! - [`Reference`] pairs an item with its [`ItemKey`], derived through the
//!   [`Identity`] trait
//! - [`Node`] holds the per-item bookkeeping: remaining prerequisites,
//!   dependents, and whether the item was handed out
//! - [`DependencyGraph`] owns the nodes and drives the resolution protocol
//!
//! # Design Decisions
//!
//! 1. Nodes refer to each other by key only. The graph exclusively owns the
//!    node set, so there is no shared mutable state between nodes.
//!
//! 2. Readiness is a counter per node rather than a recomputed in-degree.
//!    Resolving an item decrements its dependents' counters, so each query
//!    is a single pass over the live nodes.
//!
//! 3. Validation happens lazily and once, on the first read. From then on the
//!    structure is frozen, which is what makes the counters trustworthy.

mod cycle;
mod dependency_graph;
mod node;
mod reference;
mod snapshot;

pub use dependency_graph::{DependencyGraph, GraphState};
pub use node::{Node, NodeState};
pub use reference::{Identity, ItemKey, Reference};
pub use snapshot::{GraphSnapshot, NodeSnapshot};
