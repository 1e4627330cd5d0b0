use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::plugin_system::dependency::PluginDependency;
use crate::plugin_system::error::{PluginSystemError, Result};
use crate::plugin_system::manifest::PluginManifest;
use crate::plugin_system::traits::Plugin;

/// Lifecycle state of a [`PluginContainer`].
///
/// `Discovered -> Resolving -> (Loaded | Failed)`. `Discovered` may also go
/// straight to `Failed` when resolution excludes the plugin. Both terminal
/// states are sticky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginState {
    Discovered,
    Resolving,
    Loaded,
    Failed,
}

impl PluginState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PluginState::Loaded | PluginState::Failed)
    }

    fn can_transition_to(&self, next: PluginState) -> bool {
        matches!(
            (self, next),
            (PluginState::Discovered, PluginState::Resolving)
                | (PluginState::Discovered, PluginState::Failed)
                | (PluginState::Resolving, PluginState::Loaded)
                | (PluginState::Resolving, PluginState::Failed)
        )
    }
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PluginState::Discovered => "Discovered",
            PluginState::Resolving => "Resolving",
            PluginState::Loaded => "Loaded",
            PluginState::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// A discovered plugin: its manifest, where it came from, and how far it got
/// through the load pipeline.
///
/// Containers are owned by the [`PluginManager`](crate::plugin_system::PluginManager).
/// Outside the crate they are only reachable through shared references, so
/// state changes happen exclusively inside the pipeline.
pub struct PluginContainer {
    manifest: PluginManifest,
    source: Option<PathBuf>,
    state: PluginState,
    failure: Option<PluginSystemError>,
    instance: Option<Arc<dyn Plugin>>,
}

impl PluginContainer {
    /// Create a container in the `Discovered` state.
    pub fn new(manifest: PluginManifest, source: Option<PathBuf>) -> Self {
        Self {
            manifest,
            source,
            state: PluginState::Discovered,
            failure: None,
            instance: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.manifest.id
    }

    pub fn version(&self) -> &str {
        &self.manifest.version
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    pub fn dependencies(&self) -> &[PluginDependency] {
        &self.manifest.dependencies
    }

    /// The artifact the container was parsed from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn state(&self) -> PluginState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == PluginState::Loaded
    }

    pub fn is_failed(&self) -> bool {
        self.state == PluginState::Failed
    }

    /// Why the container failed, once it is `Failed`
    pub fn failure(&self) -> Option<&PluginSystemError> {
        self.failure.as_ref()
    }

    /// The activated plugin, once it is `Loaded`
    pub fn instance(&self) -> Option<&Arc<dyn Plugin>> {
        self.instance.as_ref()
    }

    fn transition(&mut self, next: PluginState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(PluginSystemError::InvalidStateTransition {
                plugin_id: self.manifest.id.clone(),
                from: self.state,
                to: next,
            });
        }
        log::debug!("Plugin '{}': {} -> {}", self.manifest.id, self.state, next);
        self.state = next;
        Ok(())
    }

    pub(crate) fn begin_resolving(&mut self) -> Result<()> {
        self.transition(PluginState::Resolving)
    }

    pub(crate) fn mark_loaded(&mut self, instance: Arc<dyn Plugin>) -> Result<()> {
        self.transition(PluginState::Loaded)?;
        self.instance = Some(instance);
        Ok(())
    }

    pub(crate) fn mark_failed(&mut self, cause: PluginSystemError) -> Result<()> {
        self.transition(PluginState::Failed)?;
        self.failure = Some(cause);
        Ok(())
    }
}

impl fmt::Debug for PluginContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContainer")
            .field("id", &self.manifest.id)
            .field("version", &self.manifest.version)
            .field("source", &self.source)
            .field("state", &self.state)
            .field("failure", &self.failure.as_ref().map(|e| e.to_string()))
            .finish_non_exhaustive()
    }
}

impl fmt::Display for PluginContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.manifest.id, self.manifest.version)
    }
}
