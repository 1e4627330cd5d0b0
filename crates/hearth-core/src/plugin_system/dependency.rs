use std::fmt;

use serde::{Deserialize, Serialize};

use crate::plugin_system::version::VersionRange;

/// Represents a dependency on another plugin, as declared in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDependency {
    /// The id of the plugin depended upon
    pub id: String,

    /// The version range that is acceptable
    #[serde(default, rename = "version", skip_serializing_if = "Option::is_none")]
    pub version_range: Option<VersionRange>,

    /// Versions of the dependency this plugin is known to break with
    #[serde(default, rename = "incompatible", skip_serializing_if = "Option::is_none")]
    pub incompatible_range: Option<VersionRange>,

    /// Whether this is a hard requirement or optional dependency
    #[serde(default = "default_required", rename = "optional", with = "inverted")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

// Manifests say `optional = true`; the struct keeps the positive flag.
mod inverted {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(required: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(!*required)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        bool::deserialize(deserializer).map(|optional| !optional)
    }
}

impl PluginDependency {
    /// Create a new required dependency with a specific version range
    pub fn required(id: &str, version_range: VersionRange) -> Self {
        Self {
            id: id.to_string(),
            version_range: Some(version_range),
            incompatible_range: None,
            required: true,
        }
    }

    /// Create a new required dependency with any version
    pub fn required_any(id: &str) -> Self {
        Self {
            id: id.to_string(),
            version_range: None,
            incompatible_range: None,
            required: true,
        }
    }

    /// Create a new optional dependency with a specific version range
    pub fn optional(id: &str, version_range: VersionRange) -> Self {
        Self {
            id: id.to_string(),
            version_range: Some(version_range),
            incompatible_range: None,
            required: false,
        }
    }

    /// Create a new optional dependency with any version
    pub fn optional_any(id: &str) -> Self {
        Self {
            id: id.to_string(),
            version_range: None,
            incompatible_range: None,
            required: false,
        }
    }

    /// Mark a range of the dependency's versions as incompatible
    pub fn with_incompatible(mut self, range: VersionRange) -> Self {
        self.incompatible_range = Some(range);
        self
    }

    /// Check if this dependency accepts the given plugin version string.
    ///
    /// A version is accepted when it satisfies `version_range` (if any) and
    /// does not fall into `incompatible_range` (if any).
    pub fn is_compatible_with(&self, version_str: &str) -> bool {
        if let Some(ref incompatible) = self.incompatible_range {
            if incompatible.includes_str(version_str) {
                return false;
            }
        }
        match self.version_range {
            Some(ref range) => range.includes_str(version_str),
            None => true,
        }
    }
}

impl fmt::Display for PluginDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let requirement_type = if self.required { "Requires" } else { "Optional" };
        match &self.version_range {
            Some(range) => write!(
                f,
                "{} plugin: {} (version: {})",
                requirement_type,
                self.id,
                range.constraint_string()
            ),
            None => write!(f, "{} plugin: {} (any version)", requirement_type, self.id),
        }
    }
}

/// A resolved dependency edge: `from` depends on `to`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
    pub required: bool,
}

impl DependencyEdge {
    pub fn new(from: &str, to: &str, required: bool) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            required,
        }
    }
}

/// Observed state of one declared dependency of a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyState {
    /// The dependency is loaded (or pending activation) with an acceptable version
    Present,
    /// No plugin with the dependency's id was discovered
    Missing,
    /// The dependency exists but its version is rejected by the declared ranges
    Incompatible,
    /// The dependency exists but failed to load
    Failed,
}

impl fmt::Display for DependencyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DependencyState::Present => "present",
            DependencyState::Missing => "missing",
            DependencyState::Incompatible => "incompatible",
            DependencyState::Failed => "failed",
        };
        f.write_str(s)
    }
}
