#![cfg(test)]

use std::collections::BTreeSet;

use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::graph::DependencyGraph;
use crate::plugin_system::tests::fixtures::container;

fn graph(nodes: &[&str], edges: &[(&str, &str, bool)]) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for node in nodes {
        graph.add_node(node);
    }
    for (from, to, required) in edges {
        graph.add_edge(from, to, *required).expect("edge between known nodes");
    }
    graph
}

fn position(order: &[String], id: &str) -> usize {
    order.iter().position(|o| o == id).unwrap_or_else(|| panic!("{} missing from {:?}", id, order))
}

#[test]
fn test_chain_orders_dependencies_first() {
    // A requires B, B requires C
    let g = graph(&["A", "B", "C"], &[("A", "B", true), ("B", "C", true)]);
    assert_eq!(g.topological_order().unwrap(), vec!["C", "B", "A"]);
}

#[test]
fn test_independent_nodes_use_lexicographic_order() {
    let g = graph(&["zeta", "alpha", "mid"], &[]);
    assert_eq!(g.topological_order().unwrap(), vec!["alpha", "mid", "zeta"]);
}

#[test]
fn test_diamond_respects_every_edge() {
    let edges = [("app", "left", true), ("app", "right", true), ("left", "base", true), ("right", "base", true)];
    let g = graph(&["app", "base", "left", "right"], &edges);
    let order = g.topological_order().unwrap();
    assert_eq!(order, vec!["base", "left", "right", "app"]);
    for (from, to, _) in edges {
        assert!(position(&order, to) < position(&order, from), "{} must load before {}", to, from);
    }
}

#[test]
fn test_required_cycle_is_reported_closed() {
    let g = graph(&["A", "B"], &[("A", "B", true), ("B", "A", true)]);
    match g.topological_order() {
        Err(PluginSystemError::CycleDetected(path)) => assert_eq!(path, vec!["A", "B", "A"]),
        other => panic!("expected CycleDetected, got {:?}", other),
    }
    assert_eq!(g.find_cycle(), Some(vec!["A".to_string(), "B".to_string(), "A".to_string()]));
}

#[test]
fn test_self_dependency_is_a_cycle() {
    let g = graph(&["loop"], &[("loop", "loop", true)]);
    assert_eq!(g.find_cycle(), Some(vec!["loop".to_string(), "loop".to_string()]));
}

#[test]
fn test_optional_edge_constrains_order_when_acyclic() {
    // Without the optional edge "b" would come after "a" lexicographically.
    let g = graph(&["a", "b"], &[("a", "b", false)]);
    assert_eq!(g.topological_order().unwrap(), vec!["b", "a"]);
}

#[test]
fn test_optional_edge_closing_a_cycle_is_ignored() {
    let g = graph(&["a", "b"], &[("a", "b", true), ("b", "a", false)]);
    assert!(g.find_cycle().is_none());
    assert_eq!(g.topological_order().unwrap(), vec!["b", "a"]);
}

#[test]
fn test_add_edge_requires_known_nodes() {
    let mut g = DependencyGraph::new();
    assert!(g.add_plugin(&container("A", &[])));
    assert!(!g.add_plugin(&container("A", &[])), "second insert of the same id is a no-op");
    match g.add_edge("A", "ghost", true) {
        Err(PluginSystemError::NotFound(id)) => assert_eq!(id, "ghost"),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[test]
fn test_required_edge_subsumes_optional() {
    let mut g = graph(&["a", "b"], &[("a", "b", false)]);
    g.add_edge("a", "b", true).unwrap();
    g.add_edge("a", "b", false).unwrap();
    assert_eq!(g.edges().count(), 1);
    assert!(g.edges().all(|e| e.required));
}

#[test]
fn test_dependents_and_removal() {
    let mut g = graph(
        &["base", "mid", "top", "side"],
        &[("mid", "base", true), ("top", "mid", true), ("side", "base", false)],
    );
    assert_eq!(g.dependents_of("base"), vec!["mid"]);
    assert_eq!(g.dependencies_of("side", false), vec!["base"]);
    assert!(g.dependencies_of("side", true).is_empty());
    assert_eq!(
        g.transitive_dependents("base"),
        BTreeSet::from(["mid".to_string(), "top".to_string()])
    );

    assert!(g.remove_node("mid"));
    assert!(!g.contains("mid"));
    assert_eq!(g.len(), 3);
    assert!(g.dependents_of("base").is_empty());
    assert_eq!(g.topological_order().unwrap(), vec!["base", "side", "top"]);
}
