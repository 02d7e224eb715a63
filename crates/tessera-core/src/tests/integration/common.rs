#![cfg(test)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use crate::host::{PipelineBuilder, Request, Response, RouteGroup, ServiceCollection};
use crate::kernel::bootstrap::{HostSettings, PluginHost};
use crate::kernel::error::Result;
use crate::plugin_system::descriptor::PluginDescriptor;
use crate::plugin_system::traits::{AcceptedPlugins, DependencyValidator, ManagementEndpoints, Plugin, PluginContext};

pub type Trace = Arc<Mutex<Vec<String>>>;

// ===== SERVICES =====

/// Registered by `core`
#[derive(Debug)]
pub struct CoreClock {
    pub epoch: u64,
}

/// Registered by `auth`; needs the core clock
#[derive(Debug)]
pub struct TokenIssuer {
    pub issuer: String,
    pub epoch: u64,
}

/// Registered by `billing`
#[derive(Debug)]
pub struct Ledger {
    pub path: PathBuf,
    pub issuer: String,
}

// ===== MOCK PLUGINS =====

pub struct CorePlugin {
    descriptor: PluginDescriptor,
    trace: Trace,
}

impl CorePlugin {
    pub fn new(version: &str, trace: Trace) -> Self {
        Self {
            descriptor: PluginDescriptor::new("core", version)
                .with_display_name("Core")
                .with_default_config(json!({ "epoch": 1000 })),
            trace,
        }
    }
}

#[async_trait]
impl Plugin for CorePlugin {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    async fn register_services(&self, services: &mut ServiceCollection, context: &PluginContext) -> Result<()> {
        self.trace.lock().unwrap().push("core:services".to_string());
        services.add_singleton(CoreClock {
            epoch: context.config().get_or("epoch", 0),
        });
        Ok(())
    }

    async fn configure_pipeline(&self, pipeline: &mut PipelineBuilder) -> Result<()> {
        self.trace.lock().unwrap().push("core:pipeline".to_string());
        pipeline.use_middleware("request-id", |_| None);
        Ok(())
    }

    async fn register_routes(&self, routes: &mut RouteGroup<'_>, _context: &PluginContext) -> Result<()> {
        self.trace.lock().unwrap().push("core:routes".to_string());
        routes.map_get("/version", |_| Response::ok(json!({ "version": "core" })))
    }
}

/// Requires `core` to be accepted, on top of the declared range
struct RequiresCore;

impl DependencyValidator for RequiresCore {
    fn validate_dependency(&self, accepted: &AcceptedPlugins) -> bool {
        accepted.contains_key("core")
    }
}

struct AuthManagement;

impl ManagementEndpoints for AuthManagement {
    fn register_management_endpoints(&self, group: &mut RouteGroup<'_>) -> Result<()> {
        group.map_get("/", |_| Response::ok(json!({ "status": "ok", "sessions": 0 })))?;
        group.map_post("/revoke", |request: &Request| {
            Response::ok(json!({ "revoked": request.body.clone() }))
        })
    }
}

pub struct AuthPlugin {
    descriptor: PluginDescriptor,
    trace: Trace,
    validator: RequiresCore,
    management: AuthManagement,
}

impl AuthPlugin {
    pub fn new(core_range: &str, trace: Trace) -> Self {
        Self {
            descriptor: PluginDescriptor::new("auth", "1.0.0")
                .with_display_name("Auth")
                .with_dependency("core", core_range)
                .with_auto_route_prefix(true)
                .with_default_config(json!({ "issuer": "tessera" })),
            trace,
            validator: RequiresCore,
            management: AuthManagement,
        }
    }
}

#[async_trait]
impl Plugin for AuthPlugin {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn dependency_validator(&self) -> Option<&dyn DependencyValidator> {
        Some(&self.validator)
    }

    fn management_endpoints(&self) -> Option<&dyn ManagementEndpoints> {
        Some(&self.management)
    }

    async fn register_services(&self, services: &mut ServiceCollection, context: &PluginContext) -> Result<()> {
        self.trace.lock().unwrap().push("auth:services".to_string());
        let clock = services
            .get::<CoreClock>()
            .ok_or("auth needs the core clock service")?;
        let issuer: String = context.config().get_or("issuer", "unknown".to_string());
        services.add_singleton(TokenIssuer {
            issuer,
            epoch: clock.epoch,
        });
        Ok(())
    }

    async fn configure_pipeline(&self, _pipeline: &mut PipelineBuilder) -> Result<()> {
        self.trace.lock().unwrap().push("auth:pipeline".to_string());
        Ok(())
    }

    async fn register_routes(&self, routes: &mut RouteGroup<'_>, _context: &PluginContext) -> Result<()> {
        self.trace.lock().unwrap().push("auth:routes".to_string());
        routes.map_post("/token", |_| Response::ok(json!({ "token": "t-1" })))
    }
}

pub struct BillingPlugin {
    descriptor: PluginDescriptor,
    trace: Trace,
}

impl BillingPlugin {
    pub fn new(trace: Trace) -> Self {
        Self {
            descriptor: PluginDescriptor::new("billing", "1.0.0")
                .with_display_name("Billing")
                .with_dependency("auth", "*")
                .with_auto_route_prefix(true),
            trace,
        }
    }
}

#[async_trait]
impl Plugin for BillingPlugin {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    async fn register_services(&self, services: &mut ServiceCollection, context: &PluginContext) -> Result<()> {
        self.trace.lock().unwrap().push("billing:services".to_string());
        let issuer = services
            .get::<TokenIssuer>()
            .ok_or("billing needs the token issuer")?;
        services.add_singleton(Ledger {
            path: context.paths().resolve_data_path("ledger.db"),
            issuer: issuer.issuer.clone(),
        });
        Ok(())
    }

    async fn configure_pipeline(&self, _pipeline: &mut PipelineBuilder) -> Result<()> {
        self.trace.lock().unwrap().push("billing:pipeline".to_string());
        Ok(())
    }

    async fn register_routes(&self, routes: &mut RouteGroup<'_>, _context: &PluginContext) -> Result<()> {
        self.trace.lock().unwrap().push("billing:routes".to_string());
        routes.map_get("/invoices", |_| Response::ok(json!([])))
    }
}

pub fn new_trace() -> Trace {
    Arc::new(Mutex::new(Vec::new()))
}

/// `core@1.5.0`, `auth` -> core `[1.0,2.0)`, `billing` -> auth `*`
pub fn setup_host(settings: HostSettings, trace: &Trace) -> PluginHost {
    let mut host = PluginHost::new(settings);
    host.register_plugin(Arc::new(BillingPlugin::new(trace.clone())))
        .expect("register billing");
    host.register_plugin(Arc::new(AuthPlugin::new("[1.0,2.0)", trace.clone())))
        .expect("register auth");
    host.register_plugin(Arc::new(CorePlugin::new("1.5.0", trace.clone())))
        .expect("register core");
    host
}
