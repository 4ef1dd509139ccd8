//! Depgraph Core
//!
//! This crate provides the dependency resolution kernel that sits beneath a
//! scheduler, build tool or initialization sequencer. It implements:
//!
//! - Identity tracking for opaque work items
//! - Dependency-count bookkeeping and lazy readiness computation
//! - Cycle detection with a concrete offending path
//! - Bulk edge wiring (`configure`) and edge visitation (`resolve`)
//!
//! The crate does not run anything. It tells the caller what may run next,
//! and the caller reports back what finished.
//!
//! # Architecture
//!
//! - `graph`: items, nodes and the dependency graph itself
//! - `error`: the error type shared by every graph operation
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use depgraph_core::DependencyGraph;
//!
//! let steps: Vec<Arc<&str>> = ["mount", "network", "daemon"].map(Arc::new).to_vec();
//!
//! let mut graph = DependencyGraph::new();
//! for step in &steps {
//!     graph.add(step.clone())?;
//! }
//! // The daemon needs both the mount and the network.
//! graph.configure(|a, b| **b == "daemon" && **a != "daemon")?;
//!
//! let mut order = Vec::new();
//! while !graph.is_resolved()? {
//!     for step in graph.unresolved_dependencies()? {
//!         graph.mark_as_resolving(&step)?;
//!         order.push(*step);
//!         graph.mark_as_resolved(&step)?;
//!     }
//! }
//! assert_eq!(order, ["mount", "network", "daemon"]);
//! # Ok::<(), depgraph_core::GraphError>(())
//! ```

pub mod graph;
mod error;

pub use error::{GraphError, GraphResult};
pub use graph::{
    DependencyGraph, GraphSnapshot, GraphState, Identity, ItemKey, Node, NodeSnapshot, NodeState,
    Reference,
};
