/// Application name
pub const APP_NAME: &str = "Tessera";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Plugin configuration directory, relative to the base directory
pub const CONFIG_DIR_NAME: &str = "config";

/// Plugin data directory root, relative to the base directory
pub const DATA_DIR_NAME: &str = "data";

/// Extension used when writing a plugin's default configuration
pub const DEFAULT_CONFIG_EXTENSION: &str = "json";

/// Root of the per-plugin management route groups
pub const DEFAULT_MANAGEMENT_PREFIX: &str = "/manage";
