use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::config::{ConfigError, HostConfig};
use crate::plugin_system::container::PluginContainer;
use crate::plugin_system::dependency::{DependencyState, PluginDependency};
use crate::plugin_system::error::{PluginSystemError, Result};
use crate::plugin_system::graph::DependencyGraph;
use crate::plugin_system::loader::{panic_message, PluginLoader};
use crate::plugin_system::registry::PluginRegistry;
use crate::plugin_system::resolver::DependencyResolver;
use crate::plugin_system::traits::Plugin;

/// Summary of one run of the load pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Loaded plugin ids, in activation order
    pub loaded: Vec<String>,
    /// `(plugin id, cause)` for every failed plugin, in id order
    pub failed: Vec<(String, String)>,
    /// Rendered discovery errors, in artifact order
    pub discovery_errors: Vec<String>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.discovery_errors.is_empty()
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Loaded {} plugin(s)", self.loaded.len())?;
        for id in &self.loaded {
            writeln!(f, "  + {}", id)?;
        }
        if !self.failed.is_empty() {
            writeln!(f, "Failed {} plugin(s)", self.failed.len())?;
            for (id, cause) in &self.failed {
                writeln!(f, "  - {}: {}", id, cause)?;
            }
        }
        if !self.discovery_errors.is_empty() {
            writeln!(f, "{} discovery error(s)", self.discovery_errors.len())?;
            for error in &self.discovery_errors {
                writeln!(f, "  ! {}", error)?;
            }
        }
        Ok(())
    }
}

/// Owns every plugin container and drives discover, resolve and activate.
///
/// The manager is the only writer of container state. Callers get shared
/// references through the lookup methods, and the pipeline runs at most once.
pub struct PluginManager {
    loader: PluginLoader,
    resolver: DependencyResolver,
    disabled: BTreeSet<String>,
    containers: BTreeMap<String, PluginContainer>,
    load_order: Vec<String>,
    graph: DependencyGraph,
    discovery_errors: Vec<PluginSystemError>,
    pipeline_ran: bool,
    shut_down: bool,
}

impl PluginManager {
    pub fn new(loader: PluginLoader) -> Self {
        Self {
            loader,
            resolver: DependencyResolver::new(),
            disabled: BTreeSet::new(),
            containers: BTreeMap::new(),
            load_order: Vec::new(),
            graph: DependencyGraph::new(),
            discovery_errors: Vec::new(),
            pipeline_ran: false,
            shut_down: false,
        }
    }

    /// Build a manager from host settings: API version, activation timeout and disabled ids.
    pub fn from_config(config: &HostConfig, registry: PluginRegistry) -> std::result::Result<Self, ConfigError> {
        let loader = PluginLoader::new(registry, config.api_version()?)
            .with_activation_timeout(config.activation_timeout());
        Ok(Self::new(loader).with_disabled(config.disabled.iter().cloned()))
    }

    /// Plugin ids to drop at discovery.
    pub fn with_disabled<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.disabled.extend(ids);
        self
    }

    pub fn loader(&self) -> &PluginLoader {
        &self.loader
    }

    /// Add a discovered container. Disabled ids are dropped silently; a
    /// second container with a known id is rejected with `DuplicatePlugin`.
    pub fn add_container(&mut self, container: PluginContainer) -> Result<()> {
        if self.pipeline_ran {
            return Err(PluginSystemError::PipelineAlreadyRun);
        }
        if self.disabled.contains(container.id()) {
            log::info!("Plugin '{}' is disabled; skipping", container.id());
            return Ok(());
        }
        if self.containers.contains_key(container.id()) {
            return Err(PluginSystemError::DuplicatePlugin {
                plugin_id: container.id().to_string(),
                path: container.source().map(Path::to_path_buf).unwrap_or_default(),
            });
        }
        self.containers.insert(container.id().to_string(), container);
        Ok(())
    }

    /// Scan `dir` and register what it declares. Returns the number of containers added.
    pub async fn discover(&mut self, dir: &Path) -> Result<usize> {
        if self.pipeline_ran {
            return Err(PluginSystemError::PipelineAlreadyRun);
        }
        let outcome = PluginLoader::scan_directory(dir).await?;
        self.discovery_errors.extend(outcome.errors);

        let before = self.containers.len();
        for container in outcome.containers {
            if let Err(e) = self.add_container(container) {
                log::warn!("{}", e);
                self.discovery_errors.push(e);
            }
        }
        Ok(self.containers.len() - before)
    }

    /// Resolve every registered container and activate the resolvable ones
    /// in dependency order.
    ///
    /// A plugin whose required dependency failed is marked `Failed` with
    /// `DependencyFailed` and never activated. Failures never abort the batch.
    pub async fn load_all(&mut self) -> Result<LoadReport> {
        if self.pipeline_ran {
            return Err(PluginSystemError::PipelineAlreadyRun);
        }
        self.pipeline_ran = true;

        let resolution = self.resolver.resolve_partial(self.containers.values());
        for (id, cause) in resolution.excluded {
            if let Some(container) = self.containers.get_mut(&id) {
                log::warn!("Plugin '{}' excluded from loading: {}", id, cause);
                container.mark_failed(cause)?;
            }
        }
        for id in &resolution.order {
            if let Some(container) = self.containers.get_mut(id) {
                container.begin_resolving()?;
            }
        }
        log::info!("Resolved load order: [{}]", resolution.order.join(", "));

        let mut active: BTreeMap<String, Arc<dyn Plugin>> = BTreeMap::new();
        for id in &resolution.order {
            let failed_dependency = self.containers.get(id).and_then(|container| {
                container
                    .manifest()
                    .required_dependencies()
                    .find(|dep| self.containers.get(&dep.id).is_none_or(|d| d.is_failed()))
                    .map(|dep| dep.id.clone())
            });

            let Some(container) = self.containers.get_mut(id) else {
                continue;
            };

            if let Some(dependency_id) = failed_dependency {
                log::warn!("Skipping plugin '{}': required dependency '{}' failed", id, dependency_id);
                container.mark_failed(PluginSystemError::DependencyFailed {
                    plugin_id: id.clone(),
                    dependency_id,
                })?;
                continue;
            }

            // The error is recorded on the container; the batch goes on.
            if self.loader.load(container, &active).await.is_ok() {
                if let Some(instance) = container.instance() {
                    active.insert(id.clone(), Arc::clone(instance));
                }
                self.load_order.push(id.clone());
            }
        }

        self.graph = resolution.graph;
        let report = self.report();
        log::info!(
            "Plugin pipeline finished: {} loaded, {} failed",
            report.loaded.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Discover, resolve and activate everything in `dir`.
    pub async fn load_plugins_from_directory(&mut self, dir: &Path) -> Result<LoadReport> {
        if self.pipeline_ran {
            return Err(PluginSystemError::PipelineAlreadyRun);
        }
        self.discover(dir).await?;
        self.load_all().await
    }

    /// Current outcome of the pipeline.
    pub fn report(&self) -> LoadReport {
        LoadReport {
            loaded: self.load_order.clone(),
            failed: self
                .failed_plugins()
                .into_iter()
                .map(|c| {
                    let cause = c.failure().map(|e| e.to_string()).unwrap_or_default();
                    (c.id().to_string(), cause)
                })
                .collect(),
            discovery_errors: self.discovery_errors.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn get_plugin(&self, id: &str) -> Option<&PluginContainer> {
        self.containers.get(id)
    }

    /// Like [`get_plugin`](Self::get_plugin), but absence is an error.
    pub fn get_require_plugin(&self, id: &str) -> Result<&PluginContainer> {
        self.containers
            .get(id)
            .ok_or_else(|| PluginSystemError::NotFound(id.to_string()))
    }

    /// The container for `id` only if it failed
    pub fn get_failed_plugin(&self, id: &str) -> Option<&PluginContainer> {
        self.containers.get(id).filter(|c| c.is_failed())
    }

    pub fn find_plugins<P>(&self, predicate: P) -> Vec<&PluginContainer>
    where
        P: Fn(&PluginContainer) -> bool,
    {
        self.containers.values().filter(|c| predicate(*c)).collect()
    }

    /// Every container, in id order.
    pub fn plugins(&self) -> impl Iterator<Item = &PluginContainer> {
        self.containers.values()
    }

    /// Loaded containers, in activation order.
    pub fn loaded_plugins(&self) -> Vec<&PluginContainer> {
        self.load_order
            .iter()
            .filter_map(|id| self.containers.get(id))
            .collect()
    }

    pub fn failed_plugins(&self) -> Vec<&PluginContainer> {
        self.find_plugins(PluginContainer::is_failed)
    }

    pub fn load_order(&self) -> &[String] {
        &self.load_order
    }

    pub fn is_plugin_loaded(&self, id: &str) -> bool {
        self.containers.get(id).is_some_and(|c| c.is_loaded())
    }

    /// Dependency graph of the last resolution, over resolvable plugins only
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn discovery_errors(&self) -> &[PluginSystemError] {
        &self.discovery_errors
    }

    /// State of each dependency `id` declares, in declaration order.
    pub fn dependencies_state(&self, id: &str) -> Result<Vec<(&PluginDependency, DependencyState)>> {
        let container = self.get_require_plugin(id)?;
        Ok(container
            .dependencies()
            .iter()
            .map(|dep| {
                let state = match self.containers.get(&dep.id) {
                    None => DependencyState::Missing,
                    Some(target) if !dep.is_compatible_with(target.version()) => DependencyState::Incompatible,
                    Some(target) if target.is_failed() => DependencyState::Failed,
                    Some(_) => DependencyState::Present,
                };
                (dep, state)
            })
            .collect())
    }

    /// Ids of the plugins that require `id`, in id order.
    pub fn dependents_of(&self, id: &str) -> Vec<&str> {
        self.containers
            .values()
            .filter(|c| c.manifest().required_dependencies().any(|d| d.id == id))
            .map(PluginContainer::id)
            .collect()
    }

    /// Deactivate every loaded plugin in reverse load order.
    ///
    /// Every plugin is asked to stop even when an earlier one fails; the
    /// failures are returned. Calling this again does nothing.
    pub async fn shutdown(&mut self) -> Vec<PluginSystemError> {
        if self.shut_down {
            return Vec::new();
        }
        self.shut_down = true;

        let mut errors = Vec::new();
        for id in self.load_order.iter().rev() {
            let Some(instance) = self.containers.get(id).and_then(|c| c.instance()).map(Arc::clone) else {
                continue;
            };
            let outcome = tokio::spawn(async move { instance.deactivate().await.map_err(|e| e.to_string()) }).await;
            let cause = match outcome {
                Ok(Ok(())) => {
                    log::debug!("Deactivated plugin '{}'", id);
                    continue;
                }
                Ok(Err(message)) => message,
                Err(e) if e.is_panic() => format!("deactivation panicked: {}", panic_message(&*e.into_panic())),
                Err(e) => format!("deactivation task was cancelled: {}", e),
            };
            log::error!("Failed to deactivate plugin '{}': {}", id, cause);
            errors.push(PluginSystemError::DeactivationError {
                plugin_id: id.clone(),
                cause,
            });
        }
        log::info!("Plugin shutdown complete ({} error(s))", errors.len());
        errors
    }
}

impl fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginManager")
            .field("plugins", &self.containers.keys().collect::<Vec<_>>())
            .field("load_order", &self.load_order)
            .field("pipeline_ran", &self.pipeline_ran)
            .finish_non_exhaustive()
    }
}
