use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use crate::host::{PipelineBuilder, Response, RouteGroup, ServiceCollection};
use crate::kernel::error::Result;
use crate::plugin_system::descriptor::PluginDescriptor;
use crate::plugin_system::lifecycle::LifecycleStep;
use crate::plugin_system::registry::PluginRegistry;
use crate::plugin_system::traits::{AcceptedPlugins, DependencyValidator, ManagementEndpoints, Plugin, PluginContext};


pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Stage-two hook that records what it was shown
pub struct RecordingValidator {
    pub accept: bool,
    pub seen: Arc<Mutex<Vec<AcceptedPlugins>>>,
}

impl DependencyValidator for RecordingValidator {
    fn validate_dependency(&self, accepted: &AcceptedPlugins) -> bool {
        self.seen.lock().unwrap().push(accepted.clone());
        self.accept
    }
}

/// Custom management endpoints: `GET /status` under the management group
pub struct StatusEndpoint;

impl ManagementEndpoints for StatusEndpoint {
    fn register_management_endpoints(&self, group: &mut RouteGroup<'_>) -> Result<()> {
        group.map_get("/status", |_| Response::ok(json!({ "status": "custom" })))
    }
}

// --- Mock Plugin ---
pub struct MockPlugin {
    descriptor: PluginDescriptor,
    calls: CallLog,
    fail_at: Option<LifecycleStep>,
    validator: Option<RecordingValidator>,
    management: Option<StatusEndpoint>,
    configs: Arc<Mutex<BTreeMap<String, serde_json::Value>>>,
    activations: CallLog,
}

impl MockPlugin {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            descriptor: PluginDescriptor::new(name, version).with_auto_route_prefix(true),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_at: None,
            validator: None,
            management: None,
            configs: Arc::new(Mutex::new(BTreeMap::new())),
            activations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn depends_on(mut self, name: &str, requirement: &str) -> Self {
        self.descriptor = self.descriptor.with_dependency(name, requirement);
        self
    }

    pub fn with_descriptor(mut self, build: impl FnOnce(PluginDescriptor) -> PluginDescriptor) -> Self {
        self.descriptor = build(self.descriptor);
        self
    }

    pub fn with_calls(mut self, calls: CallLog) -> Self {
        self.calls = calls;
        self
    }

    pub fn failing_at(mut self, step: LifecycleStep) -> Self {
        self.fail_at = Some(step);
        self
    }

    pub fn with_validator(mut self, accept: bool, seen: Arc<Mutex<Vec<AcceptedPlugins>>>) -> Self {
        self.validator = Some(RecordingValidator { accept, seen });
        self
    }

    pub fn with_status_endpoint(mut self) -> Self {
        self.management = Some(StatusEndpoint);
        self
    }

    pub fn with_config_recorder(mut self, configs: Arc<Mutex<BTreeMap<String, serde_json::Value>>>) -> Self {
        self.configs = configs;
        self
    }

    /// Logs `name:owner` on activation, where owner is the committed `MockService`'s
    pub fn with_activation_log(mut self, activations: CallLog) -> Self {
        self.activations = activations;
        self
    }

    fn record(&self, step: LifecycleStep) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.descriptor.name, step));
        if self.fail_at == Some(step) {
            return Err(format!("{} refused {}", self.descriptor.name, step).into());
        }
        Ok(())
    }
}

#[async_trait]
impl Plugin for MockPlugin {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn dependency_validator(&self) -> Option<&dyn DependencyValidator> {
        self.validator.as_ref().map(|v| v as &dyn DependencyValidator)
    }

    fn management_endpoints(&self) -> Option<&dyn ManagementEndpoints> {
        if self.fail_at == Some(LifecycleStep::RegisterManagementEndpoints) {
            return Some(&FailingEndpoints);
        }
        self.management.as_ref().map(|m| m as &dyn ManagementEndpoints)
    }

    async fn register_services(&self, services: &mut ServiceCollection, context: &PluginContext) -> Result<()> {
        self.configs
            .lock()
            .unwrap()
            .insert(context.name().to_string(), context.config().to_value());
        services.add_singleton(MockService {
            owner: self.descriptor.name.clone(),
        });
        self.record(LifecycleStep::RegisterServices)
    }

    async fn configure_pipeline(&self, pipeline: &mut PipelineBuilder) -> Result<()> {
        pipeline.use_middleware(&format!("{}-layer", self.descriptor.name), |_| None);
        self.record(LifecycleStep::ConfigurePipeline)
    }

    async fn register_routes(&self, routes: &mut RouteGroup<'_>, context: &PluginContext) -> Result<()> {
        let owner = context.name().to_string();
        routes.map_get("/", move |_| Response::ok(json!({ "plugin": owner })))?;
        self.record(LifecycleStep::RegisterRoutes)
    }

    async fn on_activated(&self, services: &ServiceCollection) {
        let owner = services
            .get::<MockService>()
            .map(|service| service.owner.clone())
            .unwrap_or_default();
        self.activations
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.descriptor.name, owner));
    }
}

struct FailingEndpoints;

impl ManagementEndpoints for FailingEndpoints {
    fn register_management_endpoints(&self, _group: &mut RouteGroup<'_>) -> Result<()> {
        Err("management endpoints unavailable".into())
    }
}

/// Service registered by every mock; the last one activated wins
#[derive(Debug)]
pub struct MockService {
    pub owner: String,
}

pub fn registry_of(plugins: Vec<MockPlugin>) -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    for plugin in plugins {
        registry.register_plugin(Arc::new(plugin)).unwrap();
    }
    registry
}
