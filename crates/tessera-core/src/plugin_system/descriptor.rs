use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::plugin_system::dependency::PluginDependency;

/// Identity, dependencies and capability flags of a plugin.
///
/// Descriptors are produced by whoever discovers plugins and are only read by
/// the core during a load attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Unique identifier name
    pub name: String,
    /// Semantic version string (e.g. `"1.4.0"`)
    pub version: String,
    /// Human readable name, defaults to `name`
    #[serde(default)]
    pub display_name: String,
    /// Required plugin name -> version requirement (`"1.0.0"`, `"[1.0,2.0)"`, `"*"`)
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    /// Mount this plugin's routes under `/{name}`
    #[serde(default)]
    pub use_auto_route_prefix: bool,
    /// Default configuration object, overlaid by the plugin's config file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_config: Option<serde_json::Value>,
    /// Overrides `{base}/data/{name}`; relative paths are taken from the base directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl PluginDescriptor {
    /// Create a descriptor with no dependencies and default flags
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            display_name: name.to_string(),
            dependencies: BTreeMap::new(),
            use_auto_route_prefix: false,
            default_config: None,
            data_dir: None,
        }
    }

    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.display_name = display_name.to_string();
        self
    }

    /// Declare a dependency. A second declaration for the same name replaces the first.
    pub fn with_dependency(mut self, plugin_name: &str, requirement: &str) -> Self {
        self.dependencies
            .insert(plugin_name.to_string(), requirement.to_string());
        self
    }

    pub fn with_auto_route_prefix(mut self, enabled: bool) -> Self {
        self.use_auto_route_prefix = enabled;
        self
    }

    pub fn with_default_config(mut self, config: serde_json::Value) -> Self {
        self.default_config = Some(config);
        self
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    /// Display name, falling back to the identifier when left empty
    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }

    /// Declared dependencies in ascending name order
    pub fn dependency_list(&self) -> Vec<PluginDependency> {
        self.dependencies
            .iter()
            .map(|(name, requirement)| PluginDependency::new(name, requirement))
            .collect()
    }
}
