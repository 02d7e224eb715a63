use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::host::pipeline::PipelineBuilder;
use crate::host::routing::RouteGroup;
use crate::host::services::ServiceCollection;
use crate::kernel::error::Result;
use crate::plugin_system::descriptor::PluginDescriptor;
use crate::plugin_system::paths::PluginPaths;
use crate::storage::config::ConfigData;

/// Plugin name -> declared version of every other plugin that passed stage-one validation.
pub type AcceptedPlugins = BTreeMap<String, String>;

/// Plugin-authored dependency check run after the declarative check passes.
pub trait DependencyValidator: Send + Sync {
    /// Return `false` to keep the plugin from loading.
    fn validate_dependency(&self, accepted: &AcceptedPlugins) -> bool;
}

/// Plugin-specific endpoints mounted under the management route group.
pub trait ManagementEndpoints: Send + Sync {
    fn register_management_endpoints(&self, group: &mut RouteGroup<'_>) -> Result<()>;
}

/// Per-plugin view handed to lifecycle callbacks.
#[derive(Debug, Clone)]
pub struct PluginContext {
    name: String,
    config: ConfigData,
    paths: PluginPaths,
    route_prefix: String,
}

impl PluginContext {
    pub fn new(name: &str, config: ConfigData, paths: PluginPaths, route_prefix: String) -> Self {
        Self {
            name: name.to_string(),
            config,
            paths,
            route_prefix,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The plugin's own configuration slice
    pub fn config(&self) -> &ConfigData {
        &self.config
    }

    pub fn paths(&self) -> &PluginPaths {
        &self.paths
    }

    /// `"/{name}"` when the plugin uses automatic prefixing, otherwise empty
    pub fn route_prefix(&self) -> &str {
        &self.route_prefix
    }
}

/// Core trait that all plugins must implement
///
/// Plugins are registered explicitly with the host as `Arc<dyn Plugin>`.
/// The optional capabilities are modeled as accessors returning `None` by
/// default:
///
/// - [`Plugin::dependency_validator`]: `None` means stage-two validation accepts.
/// - [`Plugin::management_endpoints`]: `None` mounts the default
///   "Not Applicable" handler at `GET /` of the management group.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Identity, dependencies and capability flags
    fn descriptor(&self) -> &PluginDescriptor;

    /// Custom stage-two dependency validation, if any
    fn dependency_validator(&self) -> Option<&dyn DependencyValidator> {
        None
    }

    /// Custom management endpoints, if any
    fn management_endpoints(&self) -> Option<&dyn ManagementEndpoints> {
        None
    }

    /// Register services into the container. `context.config()` is this plugin's own slice.
    async fn register_services(&self, services: &mut ServiceCollection, context: &PluginContext) -> Result<()>;

    /// Add middleware to the request pipeline.
    async fn configure_pipeline(&self, pipeline: &mut PipelineBuilder) -> Result<()>;

    /// Register business routes. `routes` is already prefixed when auto prefixing is on.
    async fn register_routes(&self, routes: &mut RouteGroup<'_>, context: &PluginContext) -> Result<()>;

    /// Called once the plugin is `Active` and its registrations are committed.
    ///
    /// Shared state reached through `services` should only be touched here, as
    /// a plugin that fails an earlier step has its registrations discarded.
    async fn on_activated(&self, _services: &ServiceCollection) {}
}
