//! Dependency Graph
//!
//! The graph tracks which items are waiting on which, and hands out the ones
//! whose prerequisites are done.
//!
//! # Lifecycle
//!
//! A graph starts out `Building`: items and edges can be added freely. The
//! first operation that needs dependency order seals it. Sealing validates
//! the whole graph for cycles once; afterwards the structure is read-only and
//! only the per-node state moves:
//!
//! ```text
//! Pending --(last prerequisite resolved)--> Ready
//! Ready   --(mark_as_resolving)-----------> Resolving
//! any     --(mark_as_resolved)------------> removed
//! ```
//!
//! A caller typically loops: take [`DependencyGraph::unresolved_dependencies`],
//! mark each item resolving, run it, mark it resolved, repeat until
//! [`DependencyGraph::is_resolved`].

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use super::cycle;
use super::node::{Node, NodeState};
use super::reference::{identity_of, Identity, ItemKey, Reference};
use super::snapshot::GraphSnapshot;
use crate::error::{GraphError, GraphResult};

/// Whether the graph still accepts structural changes.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphState {
    /// Items and edges may still be added.
    Building,

    /// Validated and read-only.
    Sealed,

    /// Sealing found a cycle. Every read keeps reporting this error.
    Cyclic(GraphError),
}

/// Dependency graph over opaque items.
///
/// Items are anything implementing [`Identity`]; the graph stores one clone
/// of each and hands clones back out of the readiness queries.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use depgraph_core::DependencyGraph;
///
/// let fetch = Arc::new("fetch");
/// let build = Arc::new("build");
///
/// let mut graph = DependencyGraph::new();
/// graph.add(fetch.clone())?.add(build.clone())?;
/// graph.add_dependency(&fetch, &build)?;
///
/// assert_eq!(graph.unresolved_dependencies()?, vec![fetch.clone()]);
/// graph.mark_as_resolved(&fetch)?;
/// assert_eq!(graph.unresolved_dependencies()?, vec![build.clone()]);
/// graph.mark_as_resolved(&build)?;
/// assert!(graph.is_resolved()?);
/// # Ok::<(), depgraph_core::GraphError>(())
/// ```
#[derive(Debug, Clone)]
pub struct DependencyGraph<T> {
    /// Live nodes in insertion order. Resolved nodes are removed.
    nodes: IndexMap<ItemKey, Node<T>>,
    state: GraphState,
}

impl<T> DependencyGraph<T> {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a new empty graph with room for `capacity` items.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: IndexMap::with_capacity(capacity),
            state: GraphState::Building,
        }
    }

    /// Get the number of live (unresolved) items.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn state(&self) -> &GraphState {
        &self.state
    }

    /// Check if structural changes are rejected.
    pub fn is_locked(&self) -> bool {
        !matches!(self.state, GraphState::Building)
    }

    /// Copy the bookkeeping of every live node.
    pub fn snapshot(&self) -> GraphSnapshot {
        self.nodes.values().collect()
    }

    /// Iterate over the live items in node-set order.
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.nodes.values().map(Node::item)
    }

    fn ensure_writable(&self) -> GraphResult<()> {
        if self.is_locked() {
            return Err(GraphError::Locked);
        }
        Ok(())
    }

    /// Seal the graph and validate it, once.
    fn initialize(&mut self) -> GraphResult<()> {
        match &self.state {
            GraphState::Sealed => return Ok(()),
            GraphState::Cyclic(err) => return Err(err.clone()),
            GraphState::Building => {}
        }

        if let Some(cycle) = cycle::find_cycle(&self.nodes) {
            let err = GraphError::circular_dependency(cycle, self.snapshot());
            warn!(error = %err, "dependency graph cannot be resolved");
            self.state = GraphState::Cyclic(err.clone());
            return Err(err);
        }

        self.state = GraphState::Sealed;
        debug!(
            nodes = self.nodes.len(),
            edges = self.nodes.values().map(|node| node.dependents().len()).sum::<usize>(),
            "dependency graph sealed"
        );
        Ok(())
    }

    /// Record that `dependant` waits on `item`. The keys must differ.
    fn link(&mut self, item: ItemKey, dependant: ItemKey) -> GraphResult<()> {
        let parent = self.index_of(item)?;
        let child = self.index_of(dependant)?;

        self.nodes[child].add_dependency();
        self.nodes[parent].add_dependent(dependant);
        trace!(%item, %dependant, "dependency added");
        Ok(())
    }

    fn index_of(&self, key: ItemKey) -> GraphResult<usize> {
        self.nodes
            .get_index_of(&key)
            .ok_or_else(|| GraphError::unknown_item(key))
    }

    fn ready_nodes(&self) -> impl Iterator<Item = &Node<T>> {
        self.nodes.values().filter(|node| node.is_ready())
    }

    /// Check if any item is ready to be handed out.
    ///
    /// Returns `false` both when everything is resolved and when the remaining
    /// items are all resolving or waiting on resolving items.
    pub fn has_unresolved_dependencies(&mut self) -> GraphResult<bool> {
        self.initialize()?;
        Ok(self.ready_nodes().next().is_some())
    }

    /// Check if every item has been resolved.
    pub fn is_resolved(&mut self) -> GraphResult<bool> {
        self.initialize()?;
        Ok(self.nodes.is_empty())
    }

    /// Remove the node for `key`, releasing its dependents.
    ///
    /// Returns the keys of the dependents that became ready.
    fn release(&mut self, key: ItemKey) -> GraphResult<Vec<ItemKey>> {
        let node = self
            .nodes
            .shift_remove(&key)
            .ok_or_else(|| GraphError::unknown_item(key))?;

        let mut released = Vec::new();
        for dependent in node.dependents() {
            if let Some(waiting) = self.nodes.get_mut(dependent) {
                let was_pending = waiting.has_dependencies_left();
                waiting.decrease_dependency_counter();
                if was_pending && waiting.is_ready() {
                    released.push(*dependent);
                }
            }
        }

        debug!(
            %key,
            dependents = node.dependents().len(),
            released = released.len(),
            remaining = self.nodes.len(),
            "item resolved"
        );
        Ok(released)
    }
}

impl<T: Identity> DependencyGraph<T> {
    /// Add an item to the graph.
    ///
    /// Adding an item that is already tracked leaves its node untouched.
    pub fn add(&mut self, item: T) -> GraphResult<&mut Self> {
        self.ensure_writable()?;
        let reference = Reference::new(item)?;
        let key = reference.id();

        if self.nodes.contains_key(&key) {
            trace!(%key, "item already tracked");
            return Ok(self);
        }

        self.nodes.insert(key, Node::new(reference));
        trace!(%key, "item added");
        Ok(self)
    }

    /// Declare that `dependant` depends on `item`.
    ///
    /// `item` has to be resolved before `dependant` becomes ready. Declaring
    /// an item dependent on itself does nothing.
    pub fn add_dependency(&mut self, item: &T, dependant: &T) -> GraphResult<&mut Self> {
        self.ensure_writable()?;
        let item_key = identity_of(item)?;
        let dependant_key = identity_of(dependant)?;

        if item_key == dependant_key {
            return Ok(self);
        }

        self.link(item_key, dependant_key)?;
        Ok(self)
    }

    /// Wire dependencies automatically.
    ///
    /// Calls `predicate(a, b)` for every ordered pair of distinct items, in
    /// node-set order, and declares `b` dependent on `a` whenever it returns
    /// `true`. Meant to run once, before anything is resolved.
    pub fn configure<F>(&mut self, mut predicate: F) -> GraphResult<&mut Self>
    where
        F: FnMut(&T, &T) -> bool,
    {
        self.ensure_writable()?;

        let keys: Vec<ItemKey> = self.nodes.keys().copied().collect();
        let mut wired = 0usize;

        for (i, &item) in keys.iter().enumerate() {
            for (j, &dependant) in keys.iter().enumerate() {
                if i == j {
                    continue;
                }
                if predicate(self.nodes[i].item(), self.nodes[j].item()) {
                    self.link(item, dependant)?;
                    wired += 1;
                }
            }
        }

        debug!(items = keys.len(), wired, "dependency graph configured");
        Ok(self)
    }

    /// Check if `item` is still tracked (added and not yet resolved).
    pub fn contains(&self, item: &T) -> bool {
        item.identity().is_some_and(|key| self.nodes.contains_key(&key))
    }

    /// Get the lifecycle state of `item`, or `None` if it is not tracked.
    pub fn node_state(&self, item: &T) -> GraphResult<Option<NodeState>> {
        let key = identity_of(item)?;
        Ok(self.nodes.get(&key).map(Node::state))
    }

    /// Take `item` off the ready set without releasing its dependents.
    pub fn mark_as_resolving(&mut self, item: &T) -> GraphResult<()> {
        let key = identity_of(item)?;
        let index = self.index_of(key)?;
        self.initialize()?;

        self.nodes[index].set_started(true);
        trace!(%key, "item resolving");
        Ok(())
    }

    /// Record that `item` is done and release its dependents.
    pub fn mark_as_resolved(&mut self, item: &T) -> GraphResult<()> {
        let key = identity_of(item)?;
        self.index_of(key)?;
        self.initialize()?;
        self.release(key)?;
        Ok(())
    }
}

impl<T: Identity + Clone> DependencyGraph<T> {
    fn items_for(&self, keys: impl IntoIterator<Item = ItemKey>) -> Vec<T> {
        keys.into_iter()
            .filter_map(|key| self.nodes.get(&key))
            .map(|node| node.item().clone())
            .collect()
    }

    /// Get the items that can run now, in node-set order.
    ///
    /// Items marked resolving are excluded even though their dependents
    /// are still waiting on them.
    pub fn unresolved_dependencies(&mut self) -> GraphResult<Vec<T>> {
        self.initialize()?;
        Ok(self.ready_nodes().map(|node| node.item().clone()).collect())
    }

    /// Same as [`mark_as_resolved`](Self::mark_as_resolved), returning the
    /// dependents that became ready.
    pub fn mark_as_resolved_and_collect(&mut self, item: &T) -> GraphResult<Vec<T>> {
        let key = identity_of(item)?;
        self.index_of(key)?;
        self.initialize()?;
        let released = self.release(key)?;
        Ok(self.items_for(released))
    }

    /// Visit every surviving dependency edge.
    ///
    /// Calls `callback(parent, dependent)` for each node in node-set order and
    /// each of its dependents still in the graph, then returns the ready set.
    /// This does not move any item through its lifecycle.
    pub fn resolve<F>(&mut self, mut callback: F) -> GraphResult<Vec<T>>
    where
        F: FnMut(&T, &T),
    {
        self.initialize()?;

        let mut visited = 0usize;
        for node in self.nodes.values() {
            for dependent in node.dependents() {
                if let Some(waiting) = self.nodes.get(dependent) {
                    callback(node.item(), waiting.item());
                    visited += 1;
                }
            }
        }

        debug!(edges = visited, "dependency edges visited");
        self.unresolved_dependencies()
    }
}

impl<T> Default for DependencyGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    type Task = Arc<u32>;

    fn tasks(count: u32) -> Vec<Task> {
        (1..=count).map(Arc::new).collect()
    }

    fn graph_with(tasks: &[Task], edges: &[(usize, usize)]) -> DependencyGraph<Task> {
        let mut graph = DependencyGraph::new();
        for task in tasks {
            graph.add(task.clone()).unwrap();
        }
        for &(item, dependant) in edges {
            graph
                .add_dependency(&tasks[item - 1], &tasks[dependant - 1])
                .unwrap();
        }
        graph
    }

    fn values(items: &[Task]) -> Vec<u32> {
        items.iter().map(|task| **task).collect()
    }

    #[test]
    fn add_is_fluent() {
        let tasks = tasks(3);
        let mut graph = DependencyGraph::new();

        graph
            .add(tasks[0].clone())
            .unwrap()
            .add(tasks[1].clone())
            .unwrap()
            .add(tasks[2].clone())
            .unwrap();

        assert_eq!(graph.len(), 3);
        assert!(!graph.is_locked());
        assert_eq!(graph.state(), &GraphState::Building);
    }

    #[test]
    fn re_adding_keeps_existing_node() {
        let tasks = tasks(2);
        let mut graph = graph_with(&tasks, &[(1, 2)]);

        graph.add(tasks[1].clone()).unwrap();

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.node_state(&tasks[1]).unwrap(), Some(NodeState::Pending));
    }

    #[test]
    fn equal_values_are_distinct_items() {
        let first = Arc::new(1u32);
        let second = Arc::new(1u32);

        let mut graph = DependencyGraph::new();
        graph.add(first.clone()).unwrap().add(second.clone()).unwrap();
        graph.add_dependency(&first, &second).unwrap();

        assert_eq!(graph.len(), 2);
        let ready = graph.unresolved_dependencies().unwrap();
        assert_eq!(ready.len(), 1);
        assert!(Arc::ptr_eq(&ready[0], &first));
    }

    #[test]
    fn first_read_seals_the_graph() {
        let tasks = tasks(2);
        let mut graph = graph_with(&tasks, &[]);

        assert!(graph.has_unresolved_dependencies().unwrap());
        assert_eq!(graph.state(), &GraphState::Sealed);

        let extra = Arc::new(3);
        assert_eq!(graph.add(extra).unwrap_err(), GraphError::Locked);
        assert_eq!(
            graph.add_dependency(&tasks[0], &tasks[1]).unwrap_err(),
            GraphError::Locked
        );
    }

    #[test]
    fn lock_is_checked_before_identity() {
        let mut graph: DependencyGraph<Option<Task>> = DependencyGraph::new();
        graph.is_resolved().unwrap();

        assert_eq!(graph.add(None).unwrap_err(), GraphError::Locked);
    }

    #[test]
    fn unknown_items_are_rejected_without_mutation() {
        let tasks = tasks(2);
        let mut graph = graph_with(&tasks[..1], &[]);
        let before = graph.snapshot();

        let err = graph.add_dependency(&tasks[0], &tasks[1]).unwrap_err();
        assert_eq!(err, GraphError::unknown_item(tasks[1].identity().unwrap()));

        let err = graph.add_dependency(&tasks[1], &tasks[0]).unwrap_err();
        assert_eq!(err, GraphError::unknown_item(tasks[1].identity().unwrap()));

        assert_eq!(graph.snapshot(), before);
    }

    #[test]
    fn marking_unknown_items_fails() {
        let stranger = Arc::new(9);
        let mut graph: DependencyGraph<Task> = DependencyGraph::new();

        assert!(matches!(
            graph.mark_as_resolving(&stranger),
            Err(GraphError::UnknownItem { .. })
        ));
        assert!(matches!(
            graph.mark_as_resolved(&stranger),
            Err(GraphError::UnknownItem { .. })
        ));
        assert!(matches!(
            graph.mark_as_resolved_and_collect(&stranger),
            Err(GraphError::UnknownItem { .. })
        ));
    }

    #[test]
    fn failed_mark_leaves_graph_writable() {
        let tasks = tasks(2);
        let mut graph = graph_with(&tasks[..1], &[]);

        assert!(graph.mark_as_resolving(&tasks[1]).is_err());
        assert!(graph.mark_as_resolved(&tasks[1]).is_err());
        assert!(graph.mark_as_resolved_and_collect(&tasks[1]).is_err());
        assert!(!graph.is_locked());

        graph.add(tasks[1].clone()).unwrap();
        graph.add_dependency(&tasks[0], &tasks[1]).unwrap();
        assert_eq!(values(&graph.unresolved_dependencies().unwrap()), vec![1]);
    }

    #[test]
    fn resolved_items_are_no_longer_known() {
        let tasks = tasks(1);
        let mut graph = graph_with(&tasks, &[]);

        graph.mark_as_resolved(&tasks[0]).unwrap();

        assert!(!graph.contains(&tasks[0]));
        assert_eq!(graph.node_state(&tasks[0]).unwrap(), None);
        assert!(matches!(
            graph.mark_as_resolved(&tasks[0]),
            Err(GraphError::UnknownItem { .. })
        ));
    }

    #[test]
    fn duplicate_edges_need_a_single_resolution() {
        let tasks = tasks(2);
        let mut graph = graph_with(&tasks, &[(1, 2), (1, 2)]);

        assert_eq!(values(&graph.unresolved_dependencies().unwrap()), vec![1]);
        graph.mark_as_resolved(&tasks[0]).unwrap();
        assert_eq!(values(&graph.unresolved_dependencies().unwrap()), vec![2]);
    }

    #[test]
    fn mark_as_resolved_and_collect_returns_released_items() {
        let tasks = tasks(4);
        let mut graph = graph_with(&tasks, &[(1, 2), (1, 3), (2, 4), (3, 4)]);

        let released = graph.mark_as_resolved_and_collect(&tasks[0]).unwrap();
        assert_eq!(values(&released), vec![2, 3]);

        assert!(graph.mark_as_resolved_and_collect(&tasks[1]).unwrap().is_empty());
        assert_eq!(
            values(&graph.mark_as_resolved_and_collect(&tasks[2]).unwrap()),
            vec![4]
        );
    }

    #[test]
    fn resolving_item_stays_out_of_ready_set() {
        let tasks = tasks(2);
        let mut graph = graph_with(&tasks, &[(1, 2)]);

        graph.mark_as_resolving(&tasks[0]).unwrap();
        graph.mark_as_resolving(&tasks[0]).unwrap();

        assert!(!graph.has_unresolved_dependencies().unwrap());
        assert!(!graph.is_resolved().unwrap());
        assert_eq!(
            graph.node_state(&tasks[0]).unwrap(),
            Some(NodeState::Resolving)
        );
        assert_eq!(graph.node_state(&tasks[1]).unwrap(), Some(NodeState::Pending));
    }

    #[test]
    fn cycle_error_is_permanent() {
        let tasks = tasks(2);
        let mut graph = graph_with(&tasks, &[(1, 2), (2, 1)]);

        let first = graph.unresolved_dependencies().unwrap_err();
        assert!(matches!(first, GraphError::CircularDependency { .. }));
        assert_eq!(graph.state(), &GraphState::Cyclic(first.clone()));

        assert_eq!(graph.is_resolved().unwrap_err(), first);
        assert_eq!(graph.mark_as_resolved(&tasks[0]).unwrap_err(), first);
        assert_eq!(graph.add(Arc::new(3)).unwrap_err(), GraphError::Locked);
    }

    #[test]
    fn cycle_error_carries_snapshot() {
        let tasks = tasks(3);
        let mut graph = graph_with(&tasks, &[(1, 2), (2, 3), (3, 2)]);

        let Err(GraphError::CircularDependency { cycle, snapshot }) = graph.is_resolved() else {
            panic!("expected a circular dependency");
        };

        assert_eq!(cycle.first(), cycle.last());
        assert!(!cycle.contains(&tasks[0].identity().unwrap()));
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.edge_count(), 3);
    }

    #[test]
    fn configure_calls_predicate_row_major() {
        let tasks = tasks(3);
        let mut graph = graph_with(&tasks, &[]);
        let mut calls = Vec::new();

        graph
            .configure(|a, b| {
                calls.push((**a, **b));
                false
            })
            .unwrap();

        assert_eq!(
            calls,
            vec![(1, 2), (1, 3), (2, 1), (2, 3), (3, 1), (3, 2)]
        );
    }

    #[test]
    fn configure_after_seal_is_rejected() {
        let mut graph: DependencyGraph<Task> = DependencyGraph::new();
        graph.is_resolved().unwrap();

        let mut called = false;
        let err = graph
            .configure(|_, _| {
                called = true;
                true
            })
            .unwrap_err();

        assert_eq!(err, GraphError::Locked);
        assert!(!called);
    }

    #[test]
    fn resolve_visits_only_surviving_edges() {
        let tasks = tasks(3);
        let mut graph = graph_with(&tasks, &[(1, 3), (2, 3)]);
        graph.mark_as_resolved(&tasks[0]).unwrap();

        let mut edges = Vec::new();
        let ready = graph
            .resolve(|parent, child| edges.push((**parent, **child)))
            .unwrap();

        assert_eq!(edges, vec![(2, 3)]);
        assert_eq!(values(&ready), vec![2]);
    }

    #[test]
    fn items_follow_insertion_order_after_removal() {
        let tasks = tasks(4);
        let mut graph = graph_with(&tasks, &[]);

        graph.mark_as_resolved(&tasks[1]).unwrap();

        assert_eq!(graph.items().map(|task| **task).collect::<Vec<_>>(), vec![1, 3, 4]);
    }
}
