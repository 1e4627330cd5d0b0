use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::plugin_system::error::BoxError;
use crate::plugin_system::manifest::PluginManifest;

/// Behaviour a plugin exposes to the host.
///
/// Metadata (id, version, dependencies) lives in the manifest; an instance
/// only has to know how to start and stop. `activate` is awaited in load
/// order, so a plugin can rely on every required dependency having been
/// activated before it.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Bring the plugin up. An error marks the plugin Failed and fails its dependents.
    async fn activate(&self, context: &PluginContext) -> Result<(), BoxError>;

    /// Called once at host shutdown, in reverse load order.
    async fn deactivate(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// What a plugin can see while activating.
#[derive(Clone)]
pub struct PluginContext {
    manifest: PluginManifest,
    api_version: semver::Version,
    loaded: BTreeMap<String, Arc<dyn Plugin>>,
}

impl PluginContext {
    pub fn new(
        manifest: PluginManifest,
        api_version: semver::Version,
        loaded: BTreeMap<String, Arc<dyn Plugin>>,
    ) -> Self {
        Self {
            manifest,
            api_version,
            loaded,
        }
    }

    pub fn plugin_id(&self) -> &str {
        &self.manifest.id
    }

    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    /// API version of the host
    pub fn api_version(&self) -> &semver::Version {
        &self.api_version
    }

    /// An already activated plugin, typically one of this plugin's dependencies.
    pub fn plugin(&self, id: &str) -> Option<&Arc<dyn Plugin>> {
        self.loaded.get(id)
    }

    /// Ids of every plugin activated so far, in id order.
    pub fn loaded_ids(&self) -> impl Iterator<Item = &str> {
        self.loaded.keys().map(String::as_str)
    }
}

impl fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext")
            .field("plugin_id", &self.manifest.id)
            .field("api_version", &self.api_version)
            .field("loaded", &self.loaded.keys().collect::<Vec<_>>())
            .finish()
    }
}
