//! # Hearth Kernel
//!
//! The kernel owns the process-wide pieces of the host:
//!
//! - **Bootstrap**: [`Host`](bootstrap::Host) builds the single
//!   [`PluginManager`](crate::plugin_system::PluginManager) from a
//!   [`HostConfig`](crate::config::HostConfig), runs the load pipeline on
//!   start and deactivates plugins on shutdown.
//! - **Constants**: application name, version and the host API version.
//! - **Error Handling**: the kernel [`Error`](error::Error) and its `Result` alias.
pub mod bootstrap;
pub mod constants;
pub mod error;

pub use bootstrap::Host;
pub use error::{Error, KernelLifecyclePhase, Result};
