use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use semver::Version;

use crate::kernel::error::Result;
use crate::plugin_system::descriptor::PluginDescriptor;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::paths::normalize_route_segment;
use crate::plugin_system::traits::Plugin;
use crate::plugin_system::version::parse_version;

/// A plugin together with its parsed version
#[derive(Clone)]
pub struct RegisteredPlugin {
    plugin: Arc<dyn Plugin>,
    version: Version,
}

impl RegisteredPlugin {
    pub fn plugin(&self) -> &Arc<dyn Plugin> {
        &self.plugin
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        self.plugin.descriptor()
    }

    pub fn name(&self) -> &str {
        &self.descriptor().name
    }

    pub fn version(&self) -> &Version {
        &self.version
    }
}

impl fmt::Debug for RegisteredPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredPlugin")
            .field("name", &self.name())
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Registry of discovered plugins, keyed and iterated by name.
///
/// Built once before a load attempt and only read during resolution and activation.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, RegisteredPlugin>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin after validating its descriptor
    pub fn register_plugin(&mut self, plugin: Arc<dyn Plugin>) -> Result<()> {
        let descriptor = plugin.descriptor();
        let name = descriptor.name.clone();
        let invalid = |message: String| PluginSystemError::InvalidDescriptor {
            plugin_id: name.clone(),
            message,
        };

        if name.trim().is_empty() {
            return Err(invalid("plugin name must not be empty".to_string()).into());
        }
        if name.trim() != name {
            return Err(invalid("plugin name must not have surrounding whitespace".to_string()).into());
        }
        // The name becomes a file stem under config/ and a directory under data/.
        if name == "." || name == ".." || name.chars().any(|c| matches!(c, '/' | '\\') || c.is_control()) {
            return Err(invalid("plugin name must not contain path separators or be '.' or '..'".to_string()).into());
        }
        if self.plugins.contains_key(&name) {
            return Err(PluginSystemError::DuplicatePlugin { plugin_id: name.clone() }.into());
        }

        let segment = normalize_route_segment(&name);
        if segment.is_empty() {
            return Err(invalid("plugin name has no characters usable in a route".to_string()).into());
        }
        if let Some(taken) = self
            .plugins
            .keys()
            .find(|existing| normalize_route_segment(existing) == segment)
        {
            return Err(invalid(format!("route segment '{}' is already used by plugin '{}'", segment, taken)).into());
        }

        let version = parse_version(&descriptor.version).map_err(|e| invalid(e.to_string()))?;

        if descriptor.dependencies.keys().any(|dep| dep.trim().is_empty()) {
            return Err(invalid("dependency names must not be empty".to_string()).into());
        }
        if let Some(config) = &descriptor.default_config {
            if !config.is_object() {
                return Err(invalid("default config must be a JSON object".to_string()).into());
            }
        }

        log::debug!("Registered plugin '{}' v{}", name, version);
        self.plugins
            .insert(name, RegisteredPlugin { plugin, version });
        Ok(())
    }

    /// Unregister a plugin by name
    pub fn unregister_plugin(&mut self, name: &str) -> Result<Arc<dyn Plugin>> {
        self.plugins
            .remove(name)
            .map(|entry| entry.plugin)
            .ok_or_else(|| PluginSystemError::NotFound(name.to_string()).into())
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredPlugin> {
        self.plugins.get(name)
    }

    pub fn get_plugin(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins.get(name).map(|entry| entry.plugin.clone())
    }

    /// Entries in ascending name order
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredPlugin> {
        self.plugins.values()
    }

    pub fn names(&self) -> Vec<String> {
        self.plugins.keys().cloned().collect()
    }

    /// A copy of this registry without the named plugins
    pub fn without(&self, excluded: &[String]) -> PluginRegistry {
        PluginRegistry {
            plugins: self
                .plugins
                .iter()
                .filter(|(name, _)| !excluded.contains(name))
                .map(|(name, entry)| (name.clone(), entry.clone()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
