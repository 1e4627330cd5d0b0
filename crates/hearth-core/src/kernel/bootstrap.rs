use crate::config::HostConfig;
use crate::kernel::constants;
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};
use crate::plugin_system::{LoadReport, PluginManager, PluginRegistry, PluginSystemError};

/// The long-lived owner of the plugin subsystem.
///
/// One `Host` holds the one [`PluginManager`] of the process; nothing else
/// constructs plugin containers. `start` runs discovery, resolution and
/// activation once, `shutdown` deactivates in reverse load order.
#[derive(Debug)]
pub struct Host {
    config: HostConfig,
    plugin_manager: PluginManager,
    started: bool,
    stopped: bool,
}

impl Host {
    /// Creates a host for `config`, instantiating plugins through `registry`.
    pub fn new(config: HostConfig, registry: PluginRegistry) -> Result<Self> {
        log::info!("Initializing {} v{}", constants::APP_NAME, constants::APP_VERSION);
        let plugin_manager = PluginManager::from_config(&config, registry)?;
        Ok(Self {
            config,
            plugin_manager,
            started: false,
            stopped: false,
        })
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn plugin_manager(&self) -> &PluginManager {
        &self.plugin_manager
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Discover, resolve and activate every plugin in the configured directory.
    ///
    /// Individual plugin failures are part of the returned report; only a
    /// failure of the pipeline itself is an error.
    pub async fn start(&mut self) -> Result<LoadReport> {
        if self.started {
            return Err(Error::KernelLifecycleError {
                phase: KernelLifecyclePhase::Start,
                message: "Host already started".to_string(),
            });
        }
        self.started = true;

        let dir = self.config.plugins_dir.clone();
        log::info!("Loading plugins from {}", dir.display());
        let report = self.plugin_manager.load_plugins_from_directory(&dir).await?;
        if !report.is_clean() {
            log::warn!(
                "{} plugin(s) failed and {} artifact(s) were rejected",
                report.failed.len(),
                report.discovery_errors.len()
            );
        }
        Ok(report)
    }

    /// Deactivate loaded plugins. Returns the deactivation failures, if any.
    pub async fn shutdown(&mut self) -> Result<Vec<PluginSystemError>> {
        if self.stopped {
            return Err(Error::KernelLifecycleError {
                phase: KernelLifecyclePhase::Shutdown,
                message: "Host already shut down".to_string(),
            });
        }
        self.stopped = true;
        log::info!("Shutting down {}", constants::APP_NAME);
        Ok(self.plugin_manager.shutdown().await)
    }
}
