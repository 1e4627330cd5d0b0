//! # Hearth Plugin System Errors
//!
//! [`PluginSystemError`] is the single error type returned by discovery,
//! resolution, activation and lookup. Every variant carries the offending
//! plugin id(s) or artifact path so a diagnostic can be rendered without
//! further context.
use std::path::PathBuf;

use crate::plugin_system::container::PluginState;
use crate::plugin_system::version::VersionError;

/// Error type returned by plugin code through the [`Plugin`](crate::plugin_system::Plugin) trait.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum PluginSystemError {
    // --- Resolution ---
    #[error("Dependency '{dependency_id}' of plugin '{plugin_id}' is missing")]
    MissingDependency {
        plugin_id: String,
        dependency_id: String,
    },

    #[error("Circular dependency detected: {}", .0.join(" -> "))]
    CycleDetected(Vec<String>),

    #[error("Plugin '{plugin_id}' requires '{dependency_id}' {requirement} but found version {found}")]
    IncompatibleDependency {
        plugin_id: String,
        dependency_id: String,
        requirement: String,
        found: String,
    },

    #[error("Plugin '{plugin_id}' cannot load because its dependency '{dependency_id}' failed")]
    DependencyFailed {
        plugin_id: String,
        dependency_id: String,
    },

    // --- Discovery ---
    #[error("Malformed plugin manifest '{}': {message}", path.display())]
    MalformedManifest {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Unreadable plugin artifact '{}': {source}", path.display())]
    UnreadableArtifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Plugin '{plugin_id}' from '{}' duplicates an already discovered plugin", path.display())]
    DuplicatePlugin { plugin_id: String, path: PathBuf },

    // --- Activation ---
    #[error("Activation of plugin '{plugin_id}' failed: {cause}")]
    ActivationError { plugin_id: String, cause: String },

    #[error("Deactivation of plugin '{plugin_id}' failed: {cause}")]
    DeactivationError { plugin_id: String, cause: String },

    #[error("Plugin '{plugin_id}' cannot move from {from} to {to}")]
    InvalidStateTransition {
        plugin_id: String,
        from: PluginState,
        to: PluginState,
    },

    // --- Manager ---
    #[error("Plugin not found: {0}")]
    NotFound(String),

    #[error("A factory is already registered for entry point '{0}'")]
    DuplicateEntryPoint(String),

    #[error("The plugin load pipeline has already run for this manager")]
    PipelineAlreadyRun,

    #[error("Version parsing error: {0}")]
    VersionParsing(#[from] VersionError),
}

impl PluginSystemError {
    pub(crate) fn activation(plugin_id: &str, cause: impl ToString) -> Self {
        PluginSystemError::ActivationError {
            plugin_id: plugin_id.to_string(),
            cause: cause.to_string(),
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        PluginSystemError::MalformedManifest {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    /// The plugin this error is about, when there is a single one.
    pub fn plugin_id(&self) -> Option<&str> {
        match self {
            PluginSystemError::MissingDependency { plugin_id, .. }
            | PluginSystemError::IncompatibleDependency { plugin_id, .. }
            | PluginSystemError::DependencyFailed { plugin_id, .. }
            | PluginSystemError::DuplicatePlugin { plugin_id, .. }
            | PluginSystemError::ActivationError { plugin_id, .. }
            | PluginSystemError::DeactivationError { plugin_id, .. }
            | PluginSystemError::InvalidStateTransition { plugin_id, .. } => Some(plugin_id),
            PluginSystemError::CycleDetected(path) => path.first().map(String::as_str),
            PluginSystemError::NotFound(id) => Some(id),
            _ => None,
        }
    }

    /// Whether the error was raised while resolving the dependency graph.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            PluginSystemError::MissingDependency { .. }
                | PluginSystemError::CycleDetected(_)
                | PluginSystemError::IncompatibleDependency { .. }
                | PluginSystemError::DependencyFailed { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PluginSystemError>;
