//! Cycle Detection
//!
//! Validation runs once, when the graph is sealed.
//!
//! # Algorithm
//!
//! 1. Copy every node's dependency counter.
//! 2. Run Kahn's algorithm over the copies, starting from the nodes that have
//!    no dependencies left. Each processed node releases its dependents.
//! 3. If every node gets processed there is no cycle.
//! 4. Otherwise, each leftover node still has a leftover prerequisite. Walking
//!    prerequisites backwards from any leftover node must eventually revisit
//!    a node, and the revisited stretch is a cycle.
//!
//! Both passes are iterative and linear in nodes plus edges, so deep chains
//! and diamond-heavy graphs are handled without recursion or path blow-up.
//! A graph with no entry point at all is just the case where step 2 starts
//! with an empty queue.

use std::collections::VecDeque;

use indexmap::IndexMap;

use super::node::Node;
use super::reference::ItemKey;

/// Find a cycle among `nodes`.
///
/// Returns the cycle as a key path whose last element repeats the first,
/// or `None` if the graph can be fully resolved.
pub(crate) fn find_cycle<T>(nodes: &IndexMap<ItemKey, Node<T>>) -> Option<Vec<ItemKey>> {
    let mut remaining: Vec<i64> = nodes.values().map(Node::dependency_counter).collect();
    let mut queue: VecDeque<usize> = remaining
        .iter()
        .enumerate()
        .filter(|&(_, &count)| count <= 0)
        .map(|(index, _)| index)
        .collect();
    let mut processed = 0;

    // Kahn's algorithm
    while let Some(index) = queue.pop_front() {
        processed += 1;

        for dependent in nodes[index].dependents() {
            if let Some(next) = nodes.get_index_of(dependent) {
                remaining[next] -= 1;
                if remaining[next] == 0 {
                    queue.push_back(next);
                }
            }
        }
    }

    if processed == nodes.len() {
        return None;
    }

    Some(extract_cycle(nodes, &remaining))
}

/// Pull one concrete cycle out of the nodes Kahn's algorithm could not reach.
fn extract_cycle<T>(nodes: &IndexMap<ItemKey, Node<T>>, remaining: &[i64]) -> Vec<ItemKey> {
    let blocked = |index: usize| remaining[index] > 0;

    // One blocked prerequisite per blocked node is enough to walk backwards.
    let mut prerequisite: Vec<Option<usize>> = vec![None; nodes.len()];
    for (index, node) in nodes.values().enumerate() {
        if !blocked(index) {
            continue;
        }
        for dependent in node.dependents() {
            if let Some(next) = nodes.get_index_of(dependent) {
                if blocked(next) && prerequisite[next].is_none() {
                    prerequisite[next] = Some(index);
                }
            }
        }
    }

    let Some(start) = (0..nodes.len()).find(|&index| blocked(index)) else {
        return Vec::new();
    };

    let mut position: Vec<Option<usize>> = vec![None; nodes.len()];
    let mut walk: Vec<usize> = Vec::new();
    let mut current = start;

    loop {
        if let Some(at) = position[current] {
            // The walk follows prerequisite links, so read it backwards to get
            // dependency order.
            let mut cycle = vec![nodes[current].id()];
            cycle.extend(walk[at + 1..].iter().rev().map(|&index| nodes[index].id()));
            cycle.push(nodes[current].id());
            return cycle;
        }

        position[current] = Some(walk.len());
        walk.push(current);

        match prerequisite[current] {
            Some(previous) => current = previous,
            None => break,
        }
    }

    walk.iter().map(|&index| nodes[index].id()).collect()
}
