//! # Tessera Core Storage
//!
//! Configuration plumbing: the [`ConfigData`] slice each plugin receives,
//! the [`ConfigSource`] contract the lifecycle orchestrator pulls it from,
//! and [`PluginConfigLoader`], which reads `config/{name}.json` (or YAML/TOML)
//! and overlays it on the plugin's declared defaults.
pub mod config;
pub mod error;

pub use config::{ConfigData, ConfigFormat, ConfigSource, PluginConfigLoader, StaticConfigSource};
pub use error::StorageSystemError;
