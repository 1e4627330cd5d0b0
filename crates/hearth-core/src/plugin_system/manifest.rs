use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::ConfigFormat;
use crate::plugin_system::dependency::PluginDependency;
use crate::plugin_system::error::{PluginSystemError, Result};
use crate::plugin_system::version::{parse_version, VersionRange};

/// Represents a plugin manifest that describes a plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Unique identifier for the plugin
    pub id: String,

    /// Human-readable name
    #[serde(default)]
    pub name: String,

    /// Plugin version (semver)
    pub version: String,

    /// Plugin description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Plugin authors
    #[serde(default)]
    pub authors: Vec<String>,

    /// Name of the factory (or shared library) that instantiates the plugin
    #[serde(default)]
    pub entry_point: String,

    /// Compatible host API versions; empty means any
    #[serde(default)]
    pub api_versions: Vec<VersionRange>,

    /// Plugin dependencies
    #[serde(default)]
    pub dependencies: Vec<PluginDependency>,

    /// Tags for categorization
    #[serde(default)]
    pub tags: Vec<String>,
}

impl PluginManifest {
    /// Create a new plugin manifest
    pub fn new(id: &str, version: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            version: version.to_string(),
            description: None,
            authors: Vec::new(),
            entry_point: id.to_string(),
            api_versions: Vec::new(),
            dependencies: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Add a dependency
    pub fn add_dependency(&mut self, dependency: PluginDependency) -> &mut Self {
        self.dependencies.push(dependency);
        self
    }

    /// Required dependencies only
    pub fn required_dependencies(&self) -> impl Iterator<Item = &PluginDependency> {
        self.dependencies.iter().filter(|d| d.required)
    }

    /// Whether the plugin declares support for the given host API version.
    pub fn supports_api(&self, api_version: &semver::Version) -> bool {
        self.api_versions.is_empty() || self.api_versions.iter().any(|r| r.includes(api_version))
    }

    /// Fill defaults and check the invariants a manifest must hold before it
    /// becomes a container: non-empty id, semver version, one declaration per dependency.
    pub(crate) fn validate(mut self, path: &Path) -> Result<Self> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(PluginSystemError::malformed(path, "plugin id must not be empty"));
        }
        if id.chars().any(char::is_whitespace) {
            return Err(PluginSystemError::malformed(
                path,
                format!("plugin id '{}' must not contain whitespace", id),
            ));
        }
        self.id = id.to_string();

        parse_version(&self.version).map_err(|e| PluginSystemError::MalformedManifest {
            path: path.to_path_buf(),
            message: format!("plugin '{}' has an invalid version", self.id),
            source: Some(Box::new(e)),
        })?;

        let mut seen = HashSet::new();
        for dep in &self.dependencies {
            if !seen.insert(dep.id.as_str()) {
                return Err(PluginSystemError::malformed(
                    path,
                    format!("plugin '{}' declares dependency '{}' more than once", self.id, dep.id),
                ));
            }
        }

        if self.name.is_empty() {
            self.name = self.id.clone();
        }
        if self.entry_point.is_empty() {
            self.entry_point = self.id.clone();
        }
        Ok(self)
    }
}

/// A manifest file declares either one plugin at the top level or several
/// under a `plugins` list.
#[derive(Debug, Deserialize)]
struct MultiPluginDocument {
    plugins: Vec<PluginManifest>,
}

/// Parse every plugin manifest declared in `content`.
///
/// `path` is only used to pick the format (by extension) and for diagnostics.
pub fn parse_manifests(content: &str, path: &Path) -> Result<Vec<PluginManifest>> {
    let format = ConfigFormat::from_path(path).ok_or_else(|| {
        PluginSystemError::malformed(path, "unsupported manifest format (expected toml, json or yaml)")
    })?;

    let document: serde_json::Value =
        format.parse(content).map_err(|e| PluginSystemError::MalformedManifest {
            path: path.to_path_buf(),
            message: format!("failed to parse {} document", format.extension()),
            source: Some(Box::new(e)),
        })?;

    let manifests = if document.get("plugins").is_some() {
        serde_json::from_value::<MultiPluginDocument>(document).map(|doc| doc.plugins)
    } else {
        serde_json::from_value::<PluginManifest>(document).map(|m| vec![m])
    }
    .map_err(|e| PluginSystemError::MalformedManifest {
        path: path.to_path_buf(),
        message: "manifest does not match the plugin schema".to_string(),
        source: Some(Box::new(e)),
    })?;

    if manifests.is_empty() {
        return Err(PluginSystemError::malformed(path, "manifest declares no plugins"));
    }

    manifests.into_iter().map(|m| m.validate(path)).collect()
}

/// Builder for creating a plugin manifest
pub struct ManifestBuilder {
    manifest: PluginManifest,
}

impl ManifestBuilder {
    /// Create a new manifest builder
    pub fn new(id: &str, version: &str) -> Self {
        Self {
            manifest: PluginManifest::new(id, version),
        }
    }

    /// Set the human-readable name
    pub fn name(mut self, name: &str) -> Self {
        self.manifest.name = name.to_string();
        self
    }

    /// Set the plugin description
    pub fn description(mut self, description: &str) -> Self {
        self.manifest.description = Some(description.to_string());
        self
    }

    /// Add an author
    pub fn author(mut self, author: &str) -> Self {
        self.manifest.authors.push(author.to_string());
        self
    }

    /// Add an API version compatibility range
    pub fn api_version(mut self, version_range: VersionRange) -> Self {
        self.manifest.api_versions.push(version_range);
        self
    }

    /// Add a required dependency on any version
    pub fn requires(mut self, id: &str) -> Self {
        self.manifest.add_dependency(PluginDependency::required_any(id));
        self
    }

    /// Add an optional dependency on any version
    pub fn optionally(mut self, id: &str) -> Self {
        self.manifest.add_dependency(PluginDependency::optional_any(id));
        self
    }

    /// Add a dependency
    pub fn dependency(mut self, dependency: PluginDependency) -> Self {
        self.manifest.add_dependency(dependency);
        self
    }

    /// Set the entry point
    pub fn entry_point(mut self, entry_point: &str) -> Self {
        self.manifest.entry_point = entry_point.to_string();
        self
    }

    /// Add a tag to the plugin
    pub fn tag(mut self, tag: &str) -> Self {
        self.manifest.tags.push(tag.to_string());
        self
    }

    /// Build the manifest
    pub fn build(self) -> PluginManifest {
        self.manifest
    }
}
