//! Health checks for a Tessera host.
//!
//! Other plugins resolve [`HealthRegistry`] from the service collection and
//! report their own status into it from `on_activated`; the plugin serves the aggregate under
//! `/core-health` and answers `GET /healthz` straight from the pipeline.
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use log::{debug, info};
use serde::Serialize;
use serde_json::json;

use tessera_core::host::{Method, PipelineBuilder, Request, Response, RouteGroup, ServiceCollection};
use tessera_core::kernel::error::Result as KernelResult;
use tessera_core::plugin_system::traits::{ManagementEndpoints, Plugin, PluginContext};
use tessera_core::plugin_system::PluginDescriptor;

pub const PLUGIN_NAME: &str = "core-health";
pub const PLUGIN_VERSION: &str = "1.2.0";

/// Path answered by the liveness middleware, before routing
pub const LIVENESS_PATH: &str = "/healthz";

/// One reported check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckStatus {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Aggregated health of the host, shared through the service collection
#[derive(Debug, Default)]
pub struct HealthRegistry {
    service_name: RwLock<String>,
    checks: RwLock<BTreeMap<String, CheckStatus>>,
}

impl HealthRegistry {
    pub fn new(service_name: &str) -> Self {
        Self {
            service_name: RwLock::new(service_name.to_string()),
            checks: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn service_name(&self) -> String {
        self.service_name
            .read()
            .map(|name| name.clone())
            .unwrap_or_default()
    }

    fn set_service_name(&self, name: &str) {
        if let Ok(mut current) = self.service_name.write() {
            *current = name.to_string();
        }
    }

    /// Record the status of `check`, replacing any earlier report.
    pub fn report(&self, check: &str, healthy: bool, detail: Option<&str>) {
        if let Ok(mut checks) = self.checks.write() {
            checks.insert(
                check.to_string(),
                CheckStatus {
                    healthy,
                    detail: detail.map(str::to_string),
                },
            );
        }
    }

    pub fn clear(&self) {
        if let Ok(mut checks) = self.checks.write() {
            checks.clear();
        }
    }

    pub fn snapshot(&self) -> BTreeMap<String, CheckStatus> {
        self.checks
            .read()
            .map(|checks| checks.clone())
            .unwrap_or_default()
    }

    /// Healthy when every reported check is healthy (vacuously true)
    pub fn is_healthy(&self) -> bool {
        self.snapshot().values().all(|check| check.healthy)
    }

    fn summary(&self, include_details: bool) -> serde_json::Value {
        let status = if self.is_healthy() { "ok" } else { "degraded" };
        let mut body = json!({
            "service": self.service_name(),
            "status": status,
        });
        if include_details {
            body["checks"] = json!(self.snapshot());
        }
        body
    }
}

/// Management group: `GET /` for a summary, `POST /reset` to drop all checks
struct HealthManagement {
    registry: Arc<HealthRegistry>,
}

impl ManagementEndpoints for HealthManagement {
    fn register_management_endpoints(&self, group: &mut RouteGroup<'_>) -> KernelResult<()> {
        let registry = self.registry.clone();
        group.map_get("/", move |_| {
            let snapshot = registry.snapshot();
            Response::ok(json!({
                "status": if registry.is_healthy() { "ok" } else { "degraded" },
                "checks": snapshot.len(),
            }))
        })?;

        let registry = self.registry.clone();
        group.map(Method::Post, "/reset", move |_| {
            registry.clear();
            Response::ok(json!({ "reset": true }))
        })
    }
}

pub struct HealthPlugin {
    descriptor: PluginDescriptor,
    registry: Arc<HealthRegistry>,
    management: HealthManagement,
}

impl Default for HealthPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthPlugin {
    pub fn new() -> Self {
        let registry = Arc::new(HealthRegistry::new("tessera"));
        Self {
            descriptor: PluginDescriptor::new(PLUGIN_NAME, PLUGIN_VERSION)
                .with_display_name("Core Health")
                .with_auto_route_prefix(true)
                .with_default_config(json!({
                    "service_name": "tessera",
                    "include_details": true
                })),
            management: HealthManagement {
                registry: registry.clone(),
            },
            registry,
        }
    }

    pub fn registry(&self) -> Arc<HealthRegistry> {
        self.registry.clone()
    }
}

#[async_trait]
impl Plugin for HealthPlugin {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn management_endpoints(&self) -> Option<&dyn ManagementEndpoints> {
        Some(&self.management)
    }

    async fn register_services(&self, services: &mut ServiceCollection, context: &PluginContext) -> KernelResult<()> {
        let service_name: String = context.config().get_or("service_name", "tessera".to_string());
        self.registry.set_service_name(&service_name);
        services.add_shared(self.registry.clone());
        info!("Health registry available for '{}'", service_name);
        Ok(())
    }

    async fn configure_pipeline(&self, pipeline: &mut PipelineBuilder) -> KernelResult<()> {
        pipeline.use_middleware("liveness", |request: &Request| {
            (request.method == Method::Get && request.path == LIVENESS_PATH)
                .then(|| Response::ok(json!({ "status": "alive" })))
        });
        debug!("Liveness check mounted at {}", LIVENESS_PATH);
        Ok(())
    }

    async fn register_routes(&self, routes: &mut RouteGroup<'_>, context: &PluginContext) -> KernelResult<()> {
        let include_details: bool = context.config().get_or("include_details", true);
        let registry = self.registry.clone();
        routes.map_get("/", move |_| {
            let body = registry.summary(include_details);
            let status = if registry.is_healthy() { 200 } else { 503 };
            Response::new(status, body)
        })
    }

    async fn on_activated(&self, _services: &ServiceCollection) {
        self.registry.report(PLUGIN_NAME, true, None);
    }
}
