use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use core_health::{HealthRegistry, PLUGIN_NAME as HEALTH_PLUGIN};
use tessera_core::host::{PipelineBuilder, Request, Response, RouteGroup, ServiceCollection};
use tessera_core::kernel::error::{Error, Result as KernelResult};
use tessera_core::plugin_system::traits::{AcceptedPlugins, DependencyValidator, Plugin, PluginContext};
use tessera_core::plugin_system::PluginDescriptor;

pub const PLUGIN_NAME: &str = "greeter";

/// Formats greetings from the plugin's configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeter {
    pub greeting: String,
    pub audience: String,
}

impl Greeter {
    pub fn greet(&self, name: Option<&str>) -> String {
        format!("{}, {}!", self.greeting, name.unwrap_or(&self.audience))
    }
}

/// Refuses to load unless core-health made it through stage one
struct RequireHealth;

impl DependencyValidator for RequireHealth {
    fn validate_dependency(&self, accepted: &AcceptedPlugins) -> bool {
        let present = accepted.contains_key(HEALTH_PLUGIN);
        if !present {
            log::warn!("{} requires {} to be loaded", PLUGIN_NAME, HEALTH_PLUGIN);
        }
        present
    }
}

pub struct GreeterPlugin {
    descriptor: PluginDescriptor,
    validator: RequireHealth,
}

impl Default for GreeterPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl GreeterPlugin {
    pub fn new() -> Self {
        Self {
            descriptor: PluginDescriptor::new(PLUGIN_NAME, "0.3.0")
                .with_display_name("Greeter")
                .with_dependency(HEALTH_PLUGIN, "[1.0,2.0)")
                .with_auto_route_prefix(true)
                .with_default_config(json!({ "greeting": "Hello", "audience": "world" })),
            validator: RequireHealth,
        }
    }

    fn greeter_from(context: &PluginContext) -> Greeter {
        let config = context.config();
        Greeter {
            greeting: config.get_or("greeting", "Hello".to_string()),
            audience: config.get_or("audience", "world".to_string()),
        }
    }
}

#[async_trait]
impl Plugin for GreeterPlugin {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn dependency_validator(&self) -> Option<&dyn DependencyValidator> {
        Some(&self.validator)
    }

    async fn register_services(&self, services: &mut ServiceCollection, context: &PluginContext) -> KernelResult<()> {
        if services.get::<HealthRegistry>().is_none() {
            return Err(Error::from(format!("{} service is not registered", HEALTH_PLUGIN)));
        }
        services.add_singleton(Self::greeter_from(context));
        Ok(())
    }

    async fn configure_pipeline(&self, _pipeline: &mut PipelineBuilder) -> KernelResult<()> {
        Ok(())
    }

    async fn register_routes(&self, routes: &mut RouteGroup<'_>, context: &PluginContext) -> KernelResult<()> {
        let greeter = Arc::new(Self::greeter_from(context));

        let default_greeter = greeter.clone();
        routes.map_get("/", move |_| Response::ok(json!({ "message": default_greeter.greet(None) })))?;

        routes.map_post("/", move |request: &Request| {
            let name = request
                .body
                .as_ref()
                .and_then(|body| body.get("name"))
                .and_then(|name| name.as_str());
            match name {
                Some(name) => Response::ok(json!({ "message": greeter.greet(Some(name)) })),
                None => Response::new(400, json!({ "error": "expected a JSON body with a 'name' string" })),
            }
        })
    }

    async fn on_activated(&self, services: &ServiceCollection) {
        match services.get::<HealthRegistry>() {
            Some(health) => health.report(PLUGIN_NAME, true, None),
            None => log::warn!("{} activated without a {} service", PLUGIN_NAME, HEALTH_PLUGIN),
        }
    }
}
