//! Deterministic topological sort for transaction plans.
//!
//! Kahn's algorithm over the package dependency graph: at every step the
//! lexicographically smallest ready node is emitted, so the same
//! transaction always produces the same install order regardless of
//! hash-map iteration order upstream. A graph that cannot be fully
//! drained contains a dependency cycle, which is a fatal resolver error
//! rather than something this module tries to break.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("dependency cycle detected, involving: {0:?}")]
    Cycle(Vec<String>),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Sort `nodes` into dependency order: a node's dependencies always
/// precede it in the returned order. `edges(key)` returns the keys
/// `key` depends on; dependencies outside `nodes` are ignored (the
/// closure computation already ensured every dependency is present).
pub fn toposort<F>(nodes: &[String], edges: F) -> Result<Vec<String>>
where
    F: Fn(&str) -> Vec<String>,
{
    let mut graph: DiGraph<String, ()> = DiGraph::new();
    let mut indices: BTreeMap<String, NodeIndex> = BTreeMap::new();
    for n in nodes {
        let idx = graph.add_node(n.clone());
        indices.insert(n.clone(), idx);
    }
    for n in nodes {
        for dep in edges(n) {
            if let (Some(&from), Some(&to)) = (indices.get(&dep), indices.get(n)) {
                graph.add_edge(from, to, ());
            }
        }
    }

    let mut in_degree: BTreeMap<NodeIndex, usize> = BTreeMap::new();
    for &idx in indices.values() {
        in_degree.insert(idx, graph.neighbors_directed(idx, Direction::Incoming).count());
    }

    let mut ready: BinaryHeap<Reverse<String>> = indices
        .iter()
        .filter(|(_, &idx)| in_degree[&idx] == 0)
        .map(|(name, _)| Reverse(name.clone()))
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(Reverse(name)) = ready.pop() {
        let idx = indices[&name];
        order.push(name);
        for neighbor in graph.neighbors_directed(idx, Direction::Outgoing) {
            let deg = in_degree.get_mut(&neighbor).expect("every node has an in-degree entry");
            *deg -= 1;
            if *deg == 0 {
                ready.push(Reverse(graph[neighbor].clone()));
            }
        }
    }

    if order.len() != nodes.len() {
        let emitted: std::collections::BTreeSet<&String> = order.iter().collect();
        let remaining = indices.keys().filter(|n| !emitted.contains(n)).cloned().collect();
        return Err(Error::Cycle(remaining));
    }

    Ok(order)
}

/// Reverse an install-order sort into removal order: a node is removed
/// only after everything depending on it.
#[must_use]
pub fn reverse_order(install_order: &[String]) -> Vec<String> {
    install_order.iter().rev().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;

    fn graph(pairs: &[(&str, &[&str])]) -> (Vec<String>, Map<String, Vec<String>>) {
        let nodes = pairs.iter().map(|(n, _)| n.to_string()).collect();
        let edges = pairs
            .iter()
            .map(|(n, deps)| (n.to_string(), deps.iter().map(|d| d.to_string()).collect()))
            .collect();
        (nodes, edges)
    }

    #[test]
    fn dependencies_precede_dependents() {
        let (nodes, edges) = graph(&[("a", &["b"]), ("b", &["c"]), ("c", &[])]);
        let order = toposort(&nodes, |n| edges[n].clone()).unwrap();
        assert_eq!(order, vec!["c", "b", "a"]);
    }

    #[test]
    fn ties_break_lexicographically() {
        let (nodes, edges) = graph(&[("z", &[]), ("a", &[]), ("m", &[])]);
        let order = toposort(&nodes, |n| edges[n].clone()).unwrap();
        assert_eq!(order, vec!["a", "m", "z"]);
    }

    #[test]
    fn diamond_dependency_resolves_once() {
        let (nodes, edges) = graph(&[
            ("app", &["left", "right"]),
            ("left", &["base"]),
            ("right", &["base"]),
            ("base", &[]),
        ]);
        let order = toposort(&nodes, |n| edges[n].clone()).unwrap();
        assert_eq!(order.last().unwrap(), "app");
        assert_eq!(order.first().unwrap(), "base");
        assert_eq!(order.len(), 4);
    }

    #[test]
    fn cycle_is_a_fatal_error() {
        let (nodes, edges) = graph(&[("a", &["b"]), ("b", &["a"])]);
        let err = toposort(&nodes, |n| edges[n].clone()).unwrap_err();
        match err {
            Error::Cycle(mut remaining) => {
                remaining.sort();
                assert_eq!(remaining, vec!["a".to_string(), "b".to_string()]);
            }
        }
    }

    #[test]
    fn reverse_order_flips_install_order() {
        let order = vec!["c".to_string(), "b".to_string(), "a".to_string()];
        assert_eq!(reverse_order(&order), vec!["a", "b", "c"]);
    }
}
