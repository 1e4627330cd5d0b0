use async_trait::async_trait;
use hearth_core::plugin_system::{BoxError, Plugin, PluginContext};

#[derive(Default)]
struct GreeterPlugin;

#[async_trait]
impl Plugin for GreeterPlugin {
    async fn activate(&self, context: &PluginContext) -> Result<(), BoxError> {
        for id in context.loaded_ids() {
            log::info!("{} says hello to {}", context.plugin_id(), id);
        }
        if context.plugin("chat").is_none() {
            log::info!("chat is not loaded; greeting quietly");
        }
        Ok(())
    }

    async fn deactivate(&self) -> Result<(), BoxError> {
        log::info!("greeter says goodbye");
        Ok(())
    }
}

hearth_core::declare_native_plugin!(GreeterPlugin::default());
