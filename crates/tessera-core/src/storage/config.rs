use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::kernel::constants;
use crate::kernel::error::Result;
use crate::plugin_system::descriptor::PluginDescriptor;
use crate::storage::error::StorageSystemError;

/// Supported configuration file formats
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
    /// Formats in lookup order; JSON is the host convention and wins ties.
    pub const SEARCH_ORDER: &'static [ConfigFormat] = &[
        ConfigFormat::Json,
        #[cfg(feature = "yaml-config")]
        ConfigFormat::Yaml,
        #[cfg(feature = "toml-config")]
        ConfigFormat::Toml,
    ];

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

    /// Like [`ConfigFormat::from_path`], but unknown extensions are an error.
    pub fn require_from_path(path: &Path) -> Result<Self> {
        Self::from_path(path).ok_or_else(|| {
            StorageSystemError::UnsupportedConfigFormat(path.display().to_string()).into()
        })
    }
}

/// Deserialize any document in the given format.
pub fn parse_document<T: DeserializeOwned>(data: &str, format: ConfigFormat) -> Result<T> {
    let failed = |source: Box<dyn std::error::Error + Send + Sync>| StorageSystemError::DeserializationError {
        format: format.extension().to_string(),
        source,
    };
    let parsed = match format {
        ConfigFormat::Json => serde_json::from_str(data).map_err(|e| failed(Box::new(e)))?,
        #[cfg(feature = "yaml-config")]
        ConfigFormat::Yaml => serde_yaml::from_str(data).map_err(|e| failed(Box::new(e)))?,
        #[cfg(feature = "toml-config")]
        ConfigFormat::Toml => toml::from_str(data).map_err(|e| failed(Box::new(e)))?,
    };
    Ok(parsed)
}

/// Serialize any value in the given format.
pub fn render_document<T: Serialize>(value: &T, format: ConfigFormat) -> Result<String> {
    let failed = |source: Box<dyn std::error::Error + Send + Sync>| StorageSystemError::SerializationError {
        format: format.extension().to_string(),
        source,
    };
    let rendered = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(value).map_err(|e| failed(Box::new(e)))?,
        #[cfg(feature = "yaml-config")]
        ConfigFormat::Yaml => serde_yaml::to_string(value).map_err(|e| failed(Box::new(e)))?,
        #[cfg(feature = "toml-config")]
        ConfigFormat::Toml => toml::to_string_pretty(value).map_err(|e| failed(Box::new(e)))?,
    };
    Ok(rendered)
}

/// A plugin's own configuration slice
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigData {
    /// Raw configuration values
    #[serde(flatten)]
    values: BTreeMap<String, serde_json::Value>,
}

impl ConfigData {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON value, which must be an object.
    pub fn from_value(name: &str, value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Object(map) => Ok(Self {
                values: map.into_iter().collect(),
            }),
            other => Err(StorageSystemError::InvalidConfigShape {
                name: name.to_string(),
                found: json_kind(&other).to_string(),
            }
            .into()),
        }
    }

    /// Get a configuration value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Get a configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Set a configuration value
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value).map_err(|e| StorageSystemError::SerializationError {
            format: "json".to_string(),
            source: Box::new(e),
        })?;
        self.values.insert(key.to_string(), json_value);
        Ok(())
    }

    /// Remove a configuration value
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Merge with another config, overriding existing values
    pub fn merge(&mut self, other: &ConfigData) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::Value::Object(self.values.clone().into_iter().collect())
    }

    /// Serialize to string based on format
    pub fn serialize(&self, format: ConfigFormat) -> Result<String> {
        render_document(self, format)
    }

    /// Deserialize from string based on format
    pub fn deserialize(data: &str, format: ConfigFormat) -> Result<Self> {
        parse_document(data, format)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// The plugin's `default_config` as config data (empty when absent).
pub fn descriptor_defaults(descriptor: &PluginDescriptor) -> Result<ConfigData> {
    match &descriptor.default_config {
        Some(value) => ConfigData::from_value(&descriptor.name, value.clone()),
        None => Ok(ConfigData::new()),
    }
}

/// Supplies each plugin with its own configuration slice.
pub trait ConfigSource: Send + Sync {
    fn plugin_config(&self, descriptor: &PluginDescriptor) -> Result<ConfigData>;
}

/// Loads `{config_dir}/{name}.{json,yaml,yml,toml}` overlaid on the plugin's defaults.
#[derive(Debug, Clone)]
pub struct PluginConfigLoader {
    config_dir: PathBuf,
    write_defaults: bool,
}

impl PluginConfigLoader {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            write_defaults: false,
        }
    }

    /// Write a plugin's defaults to `{name}.json` when it has no config file yet.
    pub fn with_write_defaults(mut self, write_defaults: bool) -> Self {
        self.write_defaults = write_defaults;
        self
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Where a freshly materialized config for `name` goes.
    pub fn default_config_path(&self, name: &str) -> PathBuf {
        self.config_dir
            .join(format!("{}.{}", name, constants::DEFAULT_CONFIG_EXTENSION))
    }

    /// First existing config file for `name`, in [`ConfigFormat::SEARCH_ORDER`].
    pub fn find_config_file(&self, name: &str) -> Option<(PathBuf, ConfigFormat)> {
        let mut candidates: Vec<(PathBuf, ConfigFormat)> = ConfigFormat::SEARCH_ORDER
            .iter()
            .map(|format| (self.config_dir.join(format!("{}.{}", name, format.extension())), *format))
            .collect();
        #[cfg(feature = "yaml-config")]
        candidates.push((self.config_dir.join(format!("{}.yml", name)), ConfigFormat::Yaml));

        candidates.into_iter().find(|(path, _)| path.is_file())
    }

    pub fn load(&self, descriptor: &PluginDescriptor) -> Result<ConfigData> {
        let mut config = descriptor_defaults(descriptor)?;

        match self.find_config_file(&descriptor.name) {
            Some((path, format)) => {
                log::debug!("Loading config for '{}' from {}", descriptor.name, path.display());
                let content = fs::read_to_string(&path)
                    .map_err(|e| StorageSystemError::io(e, "read plugin config", path.clone()))?;
                let from_file = ConfigData::deserialize(&content, format)?;
                config.merge(&from_file);
            }
            None if self.write_defaults && descriptor.default_config.is_some() => {
                self.write_defaults_file(&descriptor.name, &config)?;
            }
            None => {
                log::debug!("No config file for '{}', using defaults", descriptor.name);
            }
        }

        Ok(config)
    }

    fn write_defaults_file(&self, name: &str, defaults: &ConfigData) -> Result<()> {
        let path = self.default_config_path(name);
        fs::create_dir_all(&self.config_dir)
            .map_err(|e| StorageSystemError::io(e, "create config directory", self.config_dir.clone()))?;
        let content = defaults.serialize(ConfigFormat::Json)?;
        fs::write(&path, content)
            .map_err(|e| StorageSystemError::io(e, "write default plugin config", path.clone()))?;
        log::info!("Wrote default config for '{}' to {}", name, path.display());
        Ok(())
    }
}

impl ConfigSource for PluginConfigLoader {
    fn plugin_config(&self, descriptor: &PluginDescriptor) -> Result<ConfigData> {
        self.load(descriptor)
    }
}

/// In-memory configs keyed by plugin name, overlaid on the plugin's defaults.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigSource {
    configs: HashMap<String, ConfigData>,
}

impl StaticConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, name: &str, config: ConfigData) -> Self {
        self.insert(name, config);
        self
    }

    pub fn insert(&mut self, name: &str, config: ConfigData) {
        self.configs.insert(name.to_string(), config);
    }
}

impl ConfigSource for StaticConfigSource {
    fn plugin_config(&self, descriptor: &PluginDescriptor) -> Result<ConfigData> {
        let mut config = descriptor_defaults(descriptor)?;
        if let Some(overrides) = self.configs.get(&descriptor.name) {
            config.merge(overrides);
        }
        Ok(config)
    }
}
