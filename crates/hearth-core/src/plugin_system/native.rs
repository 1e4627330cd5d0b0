//! Shared-library plugins (`native-plugins` feature).
//!
//! A library exports `hearth_plugin_create`, returning a boxed
//! `Box<dyn Plugin>` as an opaque pointer; [`declare_native_plugin!`] writes
//! that export. The library must be built with the same compiler and the same
//! `hearth-core` version as the host, since `dyn Plugin` has no stable ABI.
use std::ffi::c_void;
use std::panic;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use libloading::{Library, Symbol};

use crate::plugin_system::container::PluginContainer;
use crate::plugin_system::error::{BoxError, PluginSystemError, Result};
use crate::plugin_system::loader::panic_message;
use crate::plugin_system::traits::{Plugin, PluginContext};

/// Symbol every native plugin library exports.
pub const CREATE_SYMBOL: &[u8] = b"hearth_plugin_create\0";

type PluginCreateFn = unsafe extern "C-unwind" fn() -> *mut c_void;

/// Declares the `hearth_plugin_create` export for a plugin type.
///
/// ```ignore
/// hearth_core::declare_native_plugin!(MyPlugin::default());
/// ```
#[macro_export]
macro_rules! declare_native_plugin {
    ($constructor:expr) => {
        #[unsafe(no_mangle)]
        pub extern "C-unwind" fn hearth_plugin_create() -> *mut ::std::ffi::c_void {
            let plugin: ::std::boxed::Box<dyn $crate::plugin_system::Plugin> =
                ::std::boxed::Box::new($constructor);
            ::std::boxed::Box::into_raw(::std::boxed::Box::new(plugin)) as *mut ::std::ffi::c_void
        }
    };
}

pub fn is_library_name(entry_point: &str) -> bool {
    let ext = Path::new(entry_point).extension().and_then(|e| e.to_str());
    matches!(ext, Some("so") | Some("dylib") | Some("dll"))
}

/// Keeps the library mapped for as long as the plugin instance lives.
struct NativePlugin {
    // Dropped before `_library`: fields drop in declaration order.
    plugin: Box<dyn Plugin>,
    _library: Library,
}

#[async_trait]
impl Plugin for NativePlugin {
    async fn activate(&self, context: &PluginContext) -> std::result::Result<(), BoxError> {
        self.plugin.activate(context).await
    }

    async fn deactivate(&self) -> std::result::Result<(), BoxError> {
        self.plugin.deactivate().await
    }
}

fn library_path(container: &PluginContainer) -> Result<PathBuf> {
    let entry_point = &container.manifest().entry_point;
    let relative = Path::new(entry_point);
    if relative.is_absolute() || relative.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(PluginSystemError::activation(
            container.id(),
            format!("invalid entry_point '{}': must be relative and not traverse upwards", entry_point),
        ));
    }
    let base = match container.source() {
        Some(source) if source.is_dir() => source.to_path_buf(),
        Some(source) => source.parent().map(Path::to_path_buf).unwrap_or_default(),
        None => PathBuf::new(),
    };
    Ok(base.join(relative))
}

/// Load the library named by the container's entry point and create its plugin.
pub fn load_library(container: &PluginContainer) -> Result<Arc<dyn Plugin>> {
    let path = library_path(container)?;
    let id = container.id();

    let library = unsafe { Library::new(&path) }
        .map_err(|e| PluginSystemError::activation(id, format!("cannot open '{}': {}", path.display(), e)))?;

    let create: PluginCreateFn = {
        let symbol: Symbol<PluginCreateFn> = unsafe { library.get(CREATE_SYMBOL) }.map_err(|e| {
            PluginSystemError::activation(id, format!("missing symbol hearth_plugin_create: {}", e))
        })?;
        *symbol
    };

    let raw = panic::catch_unwind(|| unsafe { create() }).map_err(|payload| {
        PluginSystemError::activation(
            id,
            format!("hearth_plugin_create panicked: {}", panic_message(&*payload)),
        )
    })?;
    if raw.is_null() {
        return Err(PluginSystemError::activation(id, "hearth_plugin_create returned null"));
    }

    // SAFETY: produced by `declare_native_plugin!` as Box<Box<dyn Plugin>>::into_raw.
    let plugin: Box<dyn Plugin> = *unsafe { Box::from_raw(raw as *mut Box<dyn Plugin>) };
    log::info!("Loaded native plugin '{}' from {}", id, path.display());
    Ok(Arc::new(NativePlugin {
        plugin,
        _library: library,
    }))
}
