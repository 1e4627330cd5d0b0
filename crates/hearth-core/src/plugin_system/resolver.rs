use std::collections::{BTreeMap, VecDeque};

use crate::plugin_system::container::PluginContainer;
use crate::plugin_system::graph::DependencyGraph;
use crate::plugin_system::error::{PluginSystemError, Result};

/// Outcome of a resolution pass.
///
/// `order` lists every resolvable plugin, dependencies first. Plugins that
/// cannot be resolved are in `excluded` together with the reason; a plugin
/// excluded only because something it requires was excluded carries
/// [`PluginSystemError::DependencyFailed`].
#[derive(Debug, Default)]
pub struct ResolutionResult {
    pub order: Vec<String>,
    pub excluded: BTreeMap<String, PluginSystemError>,
    /// `(plugin, dependency)` pairs for optional dependencies that were not discovered
    pub absent_optional: Vec<(String, String)>,
    /// Dependency graph over the plugins in `order`
    pub graph: DependencyGraph,
}

impl ResolutionResult {
    pub fn is_complete(&self) -> bool {
        self.excluded.is_empty()
    }

    /// Errors that caused an exclusion by themselves, in plugin id order.
    pub fn root_causes(&self) -> impl Iterator<Item = &PluginSystemError> {
        self.excluded
            .values()
            .filter(|e| !matches!(e, PluginSystemError::DependencyFailed { .. }))
    }

    /// Position of `id` in the load order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.order.iter().position(|o| o == id)
    }
}

/// Validates declared dependencies and computes a load order.
#[derive(Debug, Clone, Default)]
pub struct DependencyResolver;

impl DependencyResolver {
    pub fn new() -> Self {
        Self
    }

    /// Strict resolution: any root-cause error fails the whole set.
    ///
    /// Missing dependencies are reported before incompatible versions, and
    /// both before cycles; within a kind the lowest plugin id wins.
    pub fn resolve<'a, I>(&self, containers: I) -> Result<ResolutionResult>
    where
        I: IntoIterator<Item = &'a PluginContainer>,
    {
        let mut result = self.resolve_partial(containers);
        let first_root = result
            .excluded
            .iter()
            .filter_map(|(id, e)| root_cause_rank(e).map(|rank| (rank, id)))
            .min()
            .map(|(_, id)| id.clone());
        if let Some(err) = first_root.and_then(|id| result.excluded.remove(&id)) {
            return Err(err);
        }
        Ok(result)
    }

    /// Resolution that isolates failures: offending plugins and everything
    /// that transitively requires them are excluded, the rest is ordered.
    pub fn resolve_partial<'a, I>(&self, containers: I) -> ResolutionResult
    where
        I: IntoIterator<Item = &'a PluginContainer>,
    {
        let mut index: BTreeMap<&str, &PluginContainer> = BTreeMap::new();
        for container in containers {
            if index.insert(container.id(), container).is_some() {
                log::warn!("Plugin id '{}' passed to the resolver twice; keeping the last", container.id());
            }
        }

        let mut result = ResolutionResult::default();
        let mut graph = DependencyGraph::new();
        for id in index.keys() {
            graph.add_node(id);
        }

        // Missing and incompatible dependencies; edges for everything acceptable.
        let mut root_causes: BTreeMap<String, PluginSystemError> = BTreeMap::new();
        for (&id, container) in &index {
            for dep in container.dependencies() {
                let Some(target) = index.get(dep.id.as_str()) else {
                    if dep.required {
                        root_causes.entry(id.to_string()).or_insert_with(|| {
                            PluginSystemError::MissingDependency {
                                plugin_id: id.to_string(),
                                dependency_id: dep.id.clone(),
                            }
                        });
                    } else {
                        log::info!("Optional dependency '{}' of plugin '{}' is not present", dep.id, id);
                        result.absent_optional.push((id.to_string(), dep.id.clone()));
                    }
                    continue;
                };

                if !dep.is_compatible_with(target.version()) {
                    if dep.required {
                        root_causes.entry(id.to_string()).or_insert_with(|| {
                            PluginSystemError::IncompatibleDependency {
                                plugin_id: id.to_string(),
                                dependency_id: dep.id.clone(),
                                requirement: describe_requirement(dep),
                                found: target.version().to_string(),
                            }
                        });
                    } else {
                        log::warn!(
                            "Ignoring optional dependency '{}' of plugin '{}': version {} is not accepted ({})",
                            dep.id,
                            id,
                            target.version(),
                            describe_requirement(dep)
                        );
                    }
                    continue;
                }

                // Both ends were added as nodes above.
                if let Err(e) = graph.add_edge(id, &dep.id, dep.required) {
                    log::error!("Failed to record dependency edge {} -> {}: {}", id, dep.id, e);
                }
            }
        }

        let failed: Vec<String> = root_causes.keys().cloned().collect();
        result.excluded.extend(root_causes);
        exclude_dependents(&mut graph, &mut result.excluded, failed);

        // Peel off cycles until the remaining graph orders cleanly.
        result.order = loop {
            match graph.order_or_cycle() {
                Ok(order) => break order,
                Err(path) => {
                    let members = cycle_members(&path);
                    log::error!("Circular dependency detected: {}", path.join(" -> "));
                    for (i, member) in members.iter().enumerate() {
                        let rotated: Vec<String> = members[i..]
                            .iter()
                            .chain(members[..i].iter())
                            .chain(std::iter::once(member))
                            .cloned()
                            .collect();
                        result
                            .excluded
                            .insert(member.clone(), PluginSystemError::CycleDetected(rotated));
                    }
                    exclude_dependents(&mut graph, &mut result.excluded, members);
                }
            }
        };

        result.graph = graph;
        result
    }
}

/// Excludes every transitive dependent of `failed`, then drops all excluded
/// nodes from `graph`.
fn exclude_dependents(
    graph: &mut DependencyGraph,
    excluded: &mut BTreeMap<String, PluginSystemError>,
    failed: Vec<String>,
) {
    let mut queue: VecDeque<String> = failed.iter().cloned().collect();
    while let Some(current) = queue.pop_front() {
        let dependents: Vec<String> = graph.dependents_of(&current).into_iter().map(String::from).collect();
        for dependent in dependents {
            if excluded.contains_key(&dependent) {
                continue;
            }
            log::warn!("Plugin '{}' excluded: required dependency '{}' cannot be resolved", dependent, current);
            excluded.insert(
                dependent.clone(),
                PluginSystemError::DependencyFailed {
                    plugin_id: dependent.clone(),
                    dependency_id: current.clone(),
                },
            );
            queue.push_back(dependent);
        }
    }
    for id in excluded.keys() {
        graph.remove_node(id);
    }
}

/// Precedence of a root cause in strict resolution; `None` for propagated failures.
fn root_cause_rank(error: &PluginSystemError) -> Option<u8> {
    match error {
        PluginSystemError::MissingDependency { .. } => Some(0),
        PluginSystemError::IncompatibleDependency { .. } => Some(1),
        PluginSystemError::DependencyFailed { .. } => None,
        _ => Some(2),
    }
}

/// Distinct ids on a cycle path such as `[a, b, a]`.
fn cycle_members(path: &[String]) -> Vec<String> {
    match path {
        [first, .., last] if first == last => path[..path.len() - 1].to_vec(),
        _ => path.to_vec(),
    }
}

fn describe_requirement(dep: &crate::plugin_system::dependency::PluginDependency) -> String {
    match (&dep.version_range, &dep.incompatible_range) {
        (Some(range), Some(bad)) => format!("version {} excluding {}", range, bad),
        (Some(range), None) => format!("version {}", range),
        (None, Some(bad)) => format!("any version except {}", bad),
        (None, None) => "any version".to_string(),
    }
}
