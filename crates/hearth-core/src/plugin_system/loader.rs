use std::any::Any;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::fs;
use tokio::task::JoinHandle;

use crate::plugin_system::container::{PluginContainer, PluginState};
use crate::plugin_system::error::{PluginSystemError, Result};
use crate::plugin_system::manifest::parse_manifests;
use crate::plugin_system::registry::PluginRegistry;
use crate::plugin_system::traits::{Plugin, PluginContext};
use crate::utils::fs::{find_artifacts, manifest_in_dir};

/// Everything a directory scan produced: parsed containers in artifact path
/// order, and the artifacts that could not be turned into containers.
#[derive(Debug, Default)]
pub struct DiscoveryOutcome {
    pub containers: Vec<PluginContainer>,
    pub errors: Vec<PluginSystemError>,
}

/// Reads plugin artifacts and activates resolved containers.
///
/// Discovery (`load_file`, `scan_directory`) never instantiates anything.
/// `load` is only valid for a container the manager has moved to
/// `Resolving`; the loader does not decide ordering.
#[derive(Debug, Clone)]
pub struct PluginLoader {
    registry: PluginRegistry,
    api_version: semver::Version,
    activation_timeout: Option<Duration>,
}

impl PluginLoader {
    pub fn new(registry: PluginRegistry, api_version: semver::Version) -> Self {
        Self {
            registry,
            api_version,
            activation_timeout: None,
        }
    }

    /// Bound every activation; an activation still running after `timeout` fails.
    pub fn with_activation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.activation_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn api_version(&self) -> &semver::Version {
        &self.api_version
    }

    pub fn activation_timeout(&self) -> Option<Duration> {
        self.activation_timeout
    }

    /// Parse a single artifact into containers, without instantiating them.
    ///
    /// `path` is a manifest file or a directory holding a canonical manifest.
    /// A manifest may declare several plugins; each becomes its own container.
    pub async fn load_file(path: &Path) -> Result<Vec<PluginContainer>> {
        let unreadable = |source: io::Error| PluginSystemError::UnreadableArtifact {
            path: path.to_path_buf(),
            source,
        };

        let metadata = fs::metadata(path).await.map_err(unreadable)?;
        let manifest_path = if metadata.is_dir() {
            manifest_in_dir(path).ok_or_else(|| {
                unreadable(io::Error::new(
                    io::ErrorKind::NotFound,
                    "directory contains no plugin manifest",
                ))
            })?
        } else {
            path.to_path_buf()
        };

        let content = fs::read_to_string(&manifest_path).await.map_err(unreadable)?;
        let manifests = parse_manifests(&content, &manifest_path)?;
        log::debug!("Parsed {} manifest(s) from {}", manifests.len(), manifest_path.display());

        Ok(manifests
            .into_iter()
            .map(|manifest| PluginContainer::new(manifest, Some(path.to_path_buf())))
            .collect())
    }

    /// Discover every artifact directly inside `dir` and parse them concurrently.
    ///
    /// A missing directory yields an empty outcome; a path that cannot be
    /// checked at all is an [`PluginSystemError::UnreadableArtifact`].
    /// Per-artifact failures are collected in [`DiscoveryOutcome::errors`]
    /// and never abort the scan.
    pub async fn scan_directory(dir: &Path) -> Result<DiscoveryOutcome> {
        match fs::try_exists(dir).await {
            Ok(true) => {}
            Ok(false) => {
                log::warn!("Plugin directory {} does not exist; nothing to discover", dir.display());
                return Ok(DiscoveryOutcome::default());
            }
            Err(source) => {
                return Err(PluginSystemError::UnreadableArtifact {
                    path: dir.to_path_buf(),
                    source,
                });
            }
        }

        let owned_dir = dir.to_path_buf();
        let artifacts = tokio::task::spawn_blocking(move || find_artifacts(&owned_dir))
            .await
            .map_err(|e| PluginSystemError::UnreadableArtifact {
                path: dir.to_path_buf(),
                source: io::Error::other(e),
            })?
            .map_err(|source| PluginSystemError::UnreadableArtifact {
                path: dir.to_path_buf(),
                source,
            })?;
        log::info!("Found {} plugin artifact(s) in {}", artifacts.len(), dir.display());

        let handles: Vec<(PathBuf, JoinHandle<Result<Vec<PluginContainer>>>)> = artifacts
            .into_iter()
            .map(|path| {
                let task_path = path.clone();
                let handle = tokio::spawn(async move { PluginLoader::load_file(&task_path).await });
                (path, handle)
            })
            .collect();

        // Awaited in path order, so the outcome is sorted regardless of completion order.
        let mut outcome = DiscoveryOutcome::default();
        for (path, handle) in handles {
            match handle.await {
                Ok(Ok(containers)) => outcome.containers.extend(containers),
                Ok(Err(e)) => {
                    log::warn!("Skipping plugin artifact {}: {}", path.display(), e);
                    outcome.errors.push(e);
                }
                Err(join_error) => {
                    log::error!("Discovery task for {} did not complete: {}", path.display(), join_error);
                    outcome.errors.push(PluginSystemError::UnreadableArtifact {
                        path,
                        source: io::Error::other(join_error.to_string()),
                    });
                }
            }
        }
        Ok(outcome)
    }

    /// Instantiate and activate a resolved container.
    ///
    /// `loaded` holds the plugins activated so far and is handed to the
    /// plugin through its [`PluginContext`]. On success the container is
    /// `Loaded`; on any failure it is `Failed` and an `ActivationError` is returned.
    pub async fn load(
        &self,
        container: &mut PluginContainer,
        loaded: &BTreeMap<String, Arc<dyn Plugin>>,
    ) -> Result<()> {
        if container.state() != PluginState::Resolving {
            return Err(PluginSystemError::InvalidStateTransition {
                plugin_id: container.id().to_string(),
                from: container.state(),
                to: PluginState::Loaded,
            });
        }

        match self.activate(container, loaded).await {
            Ok(instance) => {
                container.mark_loaded(instance)?;
                log::info!("Loaded plugin {}", container);
                Ok(())
            }
            Err(cause) => {
                log::error!("Failed to activate plugin '{}': {}", container.id(), cause);
                container.mark_failed(PluginSystemError::activation(container.id(), &cause))?;
                Err(PluginSystemError::activation(container.id(), cause))
            }
        }
    }

    async fn activate(
        &self,
        container: &PluginContainer,
        loaded: &BTreeMap<String, Arc<dyn Plugin>>,
    ) -> std::result::Result<Arc<dyn Plugin>, String> {
        let manifest = container.manifest();
        if !manifest.supports_api(&self.api_version) {
            let supported: Vec<&str> = manifest.api_versions.iter().map(|r| r.constraint_string()).collect();
            return Err(format!(
                "host API version {} is not in the supported range(s) {}",
                self.api_version,
                supported.join(", ")
            ));
        }

        let instance = self.registry.instantiate(container).map_err(|e| match e {
            PluginSystemError::ActivationError { cause, .. } => cause,
            other => other.to_string(),
        })?;

        let context = PluginContext::new(manifest.clone(), self.api_version.clone(), loaded.clone());
        let task_instance = Arc::clone(&instance);
        // A separate task isolates panics raised inside the plugin.
        let handle = tokio::spawn(async move {
            task_instance.activate(&context).await.map_err(|e| e.to_string())
        });

        let joined = match self.activation_timeout {
            Some(limit) => {
                let abort = handle.abort_handle();
                match tokio::time::timeout(limit, handle).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        abort.abort();
                        return Err(format!("activation timed out after {} ms", limit.as_millis()));
                    }
                }
            }
            None => handle.await,
        };

        match joined {
            Ok(Ok(())) => Ok(instance),
            Ok(Err(message)) => Err(message),
            Err(e) if e.is_panic() => Err(format!("activation panicked: {}", panic_message(&*e.into_panic()))),
            Err(e) => Err(format!("activation task was cancelled: {}", e)),
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic reason".to_string()
    }
}
