//! # Hearth Host Configuration
//!
//! [`HostConfig`] is read once at startup from a TOML, YAML or JSON file
//! (format picked by extension, see [`ConfigFormat`]). Every key is optional;
//! missing keys fall back to the values in [`crate::kernel::constants`].
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kernel::constants;
use crate::plugin_system::version::{parse_version, VersionError};

/// Supported configuration (and manifest) file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }

    /// Deserialize a document in this format
    pub fn parse<T: DeserializeOwned>(&self, data: &str) -> Result<T, ConfigError> {
        match self {
            ConfigFormat::Json => serde_json::from_str(data).map_err(|e| ConfigError::Deserialize {
                format: "JSON",
                message: e.to_string(),
            }),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(data).map_err(|e| ConfigError::Deserialize {
                format: "YAML",
                message: e.to_string(),
            }),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(data).map_err(|e| ConfigError::Deserialize {
                format: "TOML",
                message: e.to_string(),
            }),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown or unsupported config format for path: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("Failed to deserialize from {format}: {message}")]
    Deserialize { format: &'static str, message: String },

    #[error("Invalid host API version: {0}")]
    ApiVersion(#[from] VersionError),
}

/// Host-level settings for the plugin pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Directory scanned for plugin artifacts
    pub plugins_dir: PathBuf,

    /// API version the host exposes to plugins
    pub api_version: String,

    /// Upper bound for a single plugin activation, in milliseconds; unset means unbounded
    pub activation_timeout_ms: Option<u64>,

    /// Plugin ids that are dropped at discovery
    pub disabled: Vec<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            plugins_dir: PathBuf::from(constants::DEFAULT_PLUGINS_DIR),
            api_version: constants::API_VERSION.to_string(),
            activation_timeout_ms: None,
            disabled: Vec::new(),
        }
    }
}

impl HostConfig {
    /// Load a configuration file, picking the format from its extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: HostConfig = format.parse(&content)?;
        config.api_version()?;
        log::debug!("Loaded host configuration from {}", path.display());
        Ok(config)
    }

    /// The host API version, parsed.
    pub fn api_version(&self) -> Result<semver::Version, VersionError> {
        parse_version(&self.api_version)
    }

    pub fn activation_timeout(&self) -> Option<Duration> {
        self.activation_timeout_ms.map(Duration::from_millis)
    }
}
