use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::plugin_system::container::PluginContainer;
use crate::plugin_system::error::{BoxError, PluginSystemError, Result};
use crate::plugin_system::manifest::PluginManifest;
use crate::plugin_system::traits::Plugin;

/// Builds a plugin instance for a manifest.
pub type PluginFactory =
    Arc<dyn Fn(&PluginManifest) -> std::result::Result<Arc<dyn Plugin>, BoxError> + Send + Sync>;

/// Entry points the host knows how to instantiate.
///
/// Statically linked plugins are registered here by the host at startup,
/// keyed by the `entry_point` their manifests declare. With the
/// `native-plugins` feature, entry points naming a shared library next to
/// the manifest are loaded from disk instead.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    factories: HashMap<String, PluginFactory>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for `entry_point`.
    pub fn register<F>(&mut self, entry_point: &str, factory: F) -> Result<()>
    where
        F: Fn(&PluginManifest) -> std::result::Result<Arc<dyn Plugin>, BoxError> + Send + Sync + 'static,
    {
        if self.factories.contains_key(entry_point) {
            return Err(PluginSystemError::DuplicateEntryPoint(entry_point.to_string()));
        }
        self.factories.insert(entry_point.to_string(), Arc::new(factory));
        log::debug!("Registered plugin factory '{}'", entry_point);
        Ok(())
    }

    /// Register a plugin type constructed with `Default`.
    pub fn register_default<P>(&mut self, entry_point: &str) -> Result<()>
    where
        P: Plugin + Default + 'static,
    {
        self.register(entry_point, |_| Ok(Arc::new(P::default()) as Arc<dyn Plugin>))
    }

    pub fn contains(&self, entry_point: &str) -> bool {
        self.factories.contains_key(entry_point)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Entry point names in sorted order
    pub fn entry_points(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Create the plugin instance behind a container's entry point.
    pub fn instantiate(&self, container: &PluginContainer) -> Result<Arc<dyn Plugin>> {
        let manifest = container.manifest();
        if let Some(factory) = self.factories.get(&manifest.entry_point) {
            return (**factory)(manifest).map_err(|e| {
                PluginSystemError::activation(
                    container.id(),
                    format!("factory '{}' failed: {}", manifest.entry_point, e),
                )
            });
        }

        #[cfg(feature = "native-plugins")]
        if crate::plugin_system::native::is_library_name(&manifest.entry_point) {
            return crate::plugin_system::native::load_library(container);
        }

        Err(PluginSystemError::activation(
            container.id(),
            format!("no plugin factory registered for entry point '{}'", manifest.entry_point),
        ))
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("entry_points", &self.entry_points())
            .finish()
    }
}
