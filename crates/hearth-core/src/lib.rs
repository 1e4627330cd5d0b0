pub mod config;
pub mod kernel;
pub mod plugin_system;
pub mod utils;

// Re-export key public types/traits for easier use by the binary and plugins
pub use config::{ConfigError, ConfigFormat, HostConfig};
pub use kernel::error::Error as KernelError;
pub use kernel::Host;
pub use plugin_system::{
    DependencyGraph, DependencyResolver, LoadReport, Plugin, PluginContainer, PluginContext, PluginLoader,
    PluginManager, PluginManifest, PluginRegistry, PluginState, PluginSystemError,
};
