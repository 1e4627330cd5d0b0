//! Plugins compiled into the `hearth` binary.
use std::sync::Arc;

use async_trait::async_trait;
use hearth_core::plugin_system::{BoxError, Plugin, PluginContext, PluginManifest, PluginRegistry};
use hearth_core::KernelError;

/// Entry point of the no-op plugin: activates, logs, does nothing else.
pub const NOOP_ENTRY_POINT: &str = "builtin:noop";

/// Entry point of a plugin that always fails to activate. Useful to check
/// how a plugin set behaves when one member breaks.
pub const FAILING_ENTRY_POINT: &str = "builtin:fail";

struct NoopPlugin {
    id: String,
}

#[async_trait]
impl Plugin for NoopPlugin {
    async fn activate(&self, context: &PluginContext) -> Result<(), BoxError> {
        log::info!(
            "Plugin '{}' activated against host API {}",
            context.plugin_id(),
            context.api_version()
        );
        Ok(())
    }

    async fn deactivate(&self) -> Result<(), BoxError> {
        log::info!("Plugin '{}' deactivated", self.id);
        Ok(())
    }
}

struct FailingPlugin;

#[async_trait]
impl Plugin for FailingPlugin {
    async fn activate(&self, context: &PluginContext) -> Result<(), BoxError> {
        Err(format!("plugin '{}' is configured to fail", context.plugin_id()).into())
    }
}

/// Registry holding every built-in plugin factory.
pub fn registry() -> Result<PluginRegistry, KernelError> {
    let mut registry = PluginRegistry::new();
    registry.register(NOOP_ENTRY_POINT, |manifest: &PluginManifest| {
        Ok(Arc::new(NoopPlugin {
            id: manifest.id.clone(),
        }) as Arc<dyn Plugin>)
    })?;
    registry.register(FAILING_ENTRY_POINT, |_: &PluginManifest| {
        Ok(Arc::new(FailingPlugin) as Arc<dyn Plugin>)
    })?;
    Ok(registry)
}
