/// Application name
pub const APP_NAME: &str = "Hearth";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Host API version plugins declare compatibility against
pub const API_VERSION: &str = "1.0.0";

/// Default plugins directory
pub const DEFAULT_PLUGINS_DIR: &str = "plugins";

/// Configuration file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "hearth.toml";
