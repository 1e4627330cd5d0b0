//! Plugin-to-plugin dependency graph.
//!
//! Nodes are plugin ids, an edge `from -> to` means `from` depends on `to`.
//! All iteration is in lexicographic id order, so every result computed
//! from the graph is deterministic.
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::plugin_system::container::PluginContainer;
use crate::plugin_system::dependency::DependencyEdge;
use crate::plugin_system::error::{PluginSystemError, Result};

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeSet<String>,
    edges: BTreeSet<DependencyEdge>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a container as a node. Returns false if the id was already present.
    pub fn add_plugin(&mut self, container: &PluginContainer) -> bool {
        self.add_node(container.id())
    }

    pub fn add_node(&mut self, id: &str) -> bool {
        self.nodes.insert(id.to_string())
    }

    /// Record that `from` depends on `to`. Both ends must already be nodes.
    pub fn add_edge(&mut self, from: &str, to: &str, required: bool) -> Result<()> {
        for id in [from, to] {
            if !self.nodes.contains(id) {
                return Err(PluginSystemError::NotFound(id.to_string()));
            }
        }
        // A required edge subsumes an optional one between the same pair.
        if required {
            self.edges.remove(&DependencyEdge::new(from, to, false));
        } else if self.edges.contains(&DependencyEdge::new(from, to, true)) {
            return Ok(());
        }
        self.edges.insert(DependencyEdge::new(from, to, required));
        Ok(())
    }

    /// Drop a node together with every edge touching it.
    pub fn remove_node(&mut self, id: &str) -> bool {
        self.edges.retain(|e| e.from != id && e.to != id);
        self.nodes.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    pub fn edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.edges.iter()
    }

    /// Direct dependencies of `id`, optionally restricted to required edges.
    pub fn dependencies_of(&self, id: &str, required_only: bool) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.from == id && (e.required || !required_only))
            .map(|e| e.to.as_str())
            .collect()
    }

    /// Plugins that directly require `id`.
    pub fn dependents_of(&self, id: &str) -> Vec<&str> {
        let dependents: BTreeSet<&str> = self
            .edges
            .iter()
            .filter(|e| e.required && e.to == id)
            .map(|e| e.from.as_str())
            .collect();
        dependents.into_iter().collect()
    }

    /// Every plugin that requires `id`, directly or through other plugins.
    pub fn transitive_dependents(&self, id: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        let mut queue = VecDeque::from([id.to_string()]);
        while let Some(current) = queue.pop_front() {
            for dependent in self.dependents_of(&current) {
                if dependent != id && found.insert(dependent.to_string()) {
                    queue.push_back(dependent.to_string());
                }
            }
        }
        found
    }

    /// First required-edge cycle found by a depth-first walk in id order.
    ///
    /// The returned path starts and ends with the same id, e.g. `[a, b, a]`.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let adjacency = self.adjacency(true);
        let mut visiting = BTreeSet::<&str>::new();
        let mut visited = BTreeSet::<&str>::new();

        fn detect_cycle_dfs<'a>(
            id: &'a str,
            adjacency: &BTreeMap<&'a str, BTreeSet<&'a str>>,
            visiting: &mut BTreeSet<&'a str>,
            visited: &mut BTreeSet<&'a str>,
            path: &mut Vec<&'a str>,
        ) -> Option<Vec<String>> {
            visiting.insert(id);
            path.push(id);
            if let Some(deps) = adjacency.get(id) {
                for &dep in deps {
                    if visiting.contains(dep) {
                        let start = path.iter().position(|&p| p == dep).unwrap_or(0);
                        let mut cycle: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
                        cycle.push(dep.to_string());
                        return Some(cycle);
                    }
                    if !visited.contains(dep) {
                        if let Some(cycle) = detect_cycle_dfs(dep, adjacency, visiting, visited, path) {
                            return Some(cycle);
                        }
                    }
                }
            }
            path.pop();
            visiting.remove(id);
            visited.insert(id);
            None
        }

        for id in &self.nodes {
            if !visited.contains(id.as_str()) {
                let mut path = Vec::new();
                if let Some(cycle) = detect_cycle_dfs(id, &adjacency, &mut visiting, &mut visited, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    /// Dependencies-first load order with a lexicographic tie-break.
    ///
    /// Required edges always constrain the order. Optional edges are honoured
    /// in id order unless one would close a cycle, in which case it is skipped.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        self.order_or_cycle().map_err(PluginSystemError::CycleDetected)
    }

    /// Like [`topological_order`](Self::topological_order), with the cycle path as the error.
    pub(crate) fn order_or_cycle(&self) -> std::result::Result<Vec<String>, Vec<String>> {
        if let Some(cycle) = self.find_cycle() {
            return Err(cycle);
        }

        let mut deps = self.adjacency(true);
        for edge in self.edges.iter().filter(|e| !e.required) {
            if Self::reaches(&deps, &edge.to, &edge.from) {
                log::debug!(
                    "Ignoring optional ordering edge {} -> {}: it would close a cycle",
                    edge.from,
                    edge.to
                );
                continue;
            }
            deps.entry(edge.from.as_str()).or_default().insert(edge.to.as_str());
        }

        // Kahn's algorithm over the effective edges, ready set kept sorted.
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        let mut remaining: BTreeMap<&str, usize> = BTreeMap::new();
        for (&from, tos) in &deps {
            remaining.insert(from, tos.len());
            for &to in tos {
                dependents.entry(to).or_default().push(from);
            }
        }
        let mut ready: BTreeSet<&str> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(&id, _)| id)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(id) = ready.pop_first() {
            order.push(id.to_string());
            for &dependent in dependents.get(id).map(Vec::as_slice).unwrap_or_default() {
                if let Some(count) = remaining.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        if order.len() != self.nodes.len() {
            // Unreachable once find_cycle returned None; report the stuck nodes.
            return Err(self.nodes.iter().filter(|n| !order.contains(n)).cloned().collect());
        }
        Ok(order)
    }

    fn adjacency(&self, required_only: bool) -> BTreeMap<&str, BTreeSet<&str>> {
        let mut adjacency: BTreeMap<&str, BTreeSet<&str>> =
            self.nodes.iter().map(|n| (n.as_str(), BTreeSet::new())).collect();
        for edge in self.edges.iter().filter(|e| e.required || !required_only) {
            adjacency.entry(edge.from.as_str()).or_default().insert(edge.to.as_str());
        }
        adjacency
    }

    fn reaches(adjacency: &BTreeMap<&str, BTreeSet<&str>>, start: &str, target: &str) -> bool {
        let mut seen = BTreeSet::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if seen.insert(id) {
                if let Some(next) = adjacency.get(id) {
                    stack.extend(next.iter().copied());
                }
            }
        }
        false
    }
}
