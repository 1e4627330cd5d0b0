//! # Hearth Plugin System
//!
//! Discovery, dependency resolution and activation of game-host plugins.
//!
//! A load runs through three stages, all owned by [`PluginManager`]:
//!
//! - **Discovery**: [`PluginLoader`] turns artifacts (manifest files, or
//!   directories holding one) into [`PluginContainer`]s.
//! - **Resolution**: [`DependencyResolver`] checks every declared dependency
//!   against the discovered set and asks [`DependencyGraph`] for a
//!   deterministic load order. Missing, incompatible or cyclic plugins are
//!   excluded together with everything that requires them.
//! - **Activation**: containers are activated one at a time in resolved
//!   order. A failing plugin takes its dependents down with it, the rest of
//!   the batch still loads.
//!
//! Plugin instances come from a [`PluginRegistry`] of factories keyed by the
//! manifest's `entry_point`, or, with the `native-plugins` feature, from a
//! shared library next to the manifest.
pub mod container;
pub mod dependency;
pub mod error;
pub mod graph;
pub mod loader;
pub mod manager;
pub mod manifest;
#[cfg(feature = "native-plugins")]
pub mod native;
pub mod registry;
pub mod resolver;
pub mod traits;
pub mod version;

pub use container::{PluginContainer, PluginState};
pub use dependency::{DependencyEdge, DependencyState, PluginDependency};
pub use error::{BoxError, PluginSystemError};
pub use graph::DependencyGraph;
pub use loader::{DiscoveryOutcome, PluginLoader};
pub use manager::{LoadReport, PluginManager};
pub use manifest::{ManifestBuilder, PluginManifest};
pub use registry::{PluginFactory, PluginRegistry};
pub use resolver::{DependencyResolver, ResolutionResult};
pub use traits::{Plugin, PluginContext};
pub use version::{VersionError, VersionRange};

#[cfg(test)]
mod tests;
