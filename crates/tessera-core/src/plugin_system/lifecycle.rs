//! Plugin lifecycle states and the orchestrator that drives accepted plugins
//! through service registration, pipeline configuration and route
//! registration, one plugin at a time in activation order.
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::host::HostContext;
use crate::host::routing::map_default_management;
use crate::kernel::constants;
use crate::kernel::error::{Error, Result};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::paths::PathDeriver;
use crate::plugin_system::registry::{PluginRegistry, RegisteredPlugin};
use crate::plugin_system::resolver::{LoadPlan, ResolutionResult};
use crate::plugin_system::traits::PluginContext;
use crate::storage::config::ConfigSource;

/// Where a plugin is in its load attempt. `Active` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum LifecycleState {
    Discovered,
    StageOneValidated,
    StageTwoValidated,
    ServicesRegistered,
    Configured,
    RoutesRegistered,
    Active,
    Failed(String),
}

impl LifecycleState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Active | LifecycleState::Failed(_))
    }

    fn rank(&self) -> Option<u8> {
        match self {
            LifecycleState::Discovered => Some(0),
            LifecycleState::StageOneValidated => Some(1),
            LifecycleState::StageTwoValidated => Some(2),
            LifecycleState::ServicesRegistered => Some(3),
            LifecycleState::Configured => Some(4),
            LifecycleState::RoutesRegistered => Some(5),
            LifecycleState::Active => Some(6),
            LifecycleState::Failed(_) => None,
        }
    }

    /// Only the next state in sequence, or `Failed` from any non-terminal state.
    pub fn can_advance_to(&self, next: &LifecycleState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (_, None) => true,
            (Some(current), Some(target)) => target == current + 1,
            (None, Some(_)) => false,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Discovered => write!(f, "Discovered"),
            LifecycleState::StageOneValidated => write!(f, "StageOneValidated"),
            LifecycleState::StageTwoValidated => write!(f, "StageTwoValidated"),
            LifecycleState::ServicesRegistered => write!(f, "ServicesRegistered"),
            LifecycleState::Configured => write!(f, "Configured"),
            LifecycleState::RoutesRegistered => write!(f, "RoutesRegistered"),
            LifecycleState::Active => write!(f, "Active"),
            LifecycleState::Failed(reason) => write!(f, "Failed({})", reason),
        }
    }
}

/// The externally visible callbacks, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStep {
    RegisterServices,
    ConfigurePipeline,
    RegisterRoutes,
    RegisterManagementEndpoints,
}

impl fmt::Display for LifecycleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LifecycleStep::RegisterServices => "register_services",
            LifecycleStep::ConfigurePipeline => "configure_pipeline",
            LifecycleStep::RegisterRoutes => "register_routes",
            LifecycleStep::RegisterManagementEndpoints => "register_management_endpoints",
        };
        write!(f, "{}", text)
    }
}

/// Lifecycle state of every plugin in one load attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LifecycleTracker {
    states: BTreeMap<String, LifecycleState>,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed states from a validated plan: accepted plugins end in `StageTwoValidated`,
    /// rejected ones in `Failed` after walking the stages they did pass.
    pub fn from_plan(registry: &PluginRegistry, plan: &LoadPlan) -> Result<Self> {
        let mut tracker = Self::new();
        for entry in registry.iter() {
            let name = entry.name();
            tracker.discover(name);
            match plan.result(name) {
                Some(ResolutionResult::Accepted) => {
                    tracker.advance(name, LifecycleState::StageOneValidated)?;
                    tracker.advance(name, LifecycleState::StageTwoValidated)?;
                }
                Some(result @ ResolutionResult::RejectedCustomValidation) => {
                    tracker.advance(name, LifecycleState::StageOneValidated)?;
                    tracker.fail(name, Self::rejection_reason(name, result))?;
                }
                Some(result) => {
                    tracker.fail(name, Self::rejection_reason(name, result))?;
                }
                None => {}
            }
        }
        Ok(tracker)
    }

    fn rejection_reason(name: &str, result: &ResolutionResult) -> String {
        match result.to_error(name) {
            Some(err) => format!("{}: {}", result.stage(), err),
            None => result.stage().to_string(),
        }
    }

    pub fn discover(&mut self, name: &str) {
        self.states
            .insert(name.to_string(), LifecycleState::Discovered);
    }

    /// Move `name` to `next`, rejecting out-of-sequence transitions.
    pub fn advance(&mut self, name: &str, next: LifecycleState) -> Result<()> {
        let current = self
            .states
            .get_mut(name)
            .ok_or_else(|| PluginSystemError::NotFound(name.to_string()))?;
        if !current.can_advance_to(&next) {
            return Err(PluginSystemError::InvalidTransition {
                plugin_id: name.to_string(),
                from: current.clone(),
                to: next,
            }
            .into());
        }
        log::debug!("Plugin '{}': {} -> {}", name, current, next);
        *current = next;
        Ok(())
    }

    pub fn fail(&mut self, name: &str, reason: impl Into<String>) -> Result<()> {
        self.advance(name, LifecycleState::Failed(reason.into()))
    }

    pub fn state(&self, name: &str) -> Option<&LifecycleState> {
        self.states.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &LifecycleState)> {
        self.states.iter()
    }

    /// Names of plugins in `state`, ascending
    pub fn in_state(&self, state: &LifecycleState) -> Vec<String> {
        self.states
            .iter()
            .filter(|(_, s)| *s == state)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn failed(&self) -> Vec<(String, String)> {
        self.states
            .iter()
            .filter_map(|(name, state)| match state {
                LifecycleState::Failed(reason) => Some((name.clone(), reason.clone())),
                _ => None,
            })
            .collect()
    }
}

/// Drives accepted plugins through their lifecycle callbacks.
///
/// Each plugin registers into a staged copy of the host; the copy replaces the
/// host only once the plugin reaches `Active`, so a failed plugin leaves no
/// services, middleware or routes behind.
#[derive(Debug, Clone)]
pub struct LifecycleOrchestrator {
    deriver: PathDeriver,
    fail_fast: bool,
    management_prefix: String,
}

impl LifecycleOrchestrator {
    pub fn new(deriver: PathDeriver) -> Self {
        Self {
            deriver,
            fail_fast: false,
            management_prefix: constants::DEFAULT_MANAGEMENT_PREFIX.to_string(),
        }
    }

    /// Abort the remaining sequence on the first lifecycle failure.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_management_prefix(mut self, prefix: &str) -> Self {
        self.management_prefix = prefix.to_string();
        self
    }

    pub fn deriver(&self) -> &PathDeriver {
        &self.deriver
    }

    /// Activate `order` strictly in sequence. Returns the names that reached `Active`.
    ///
    /// In fail-fast mode the first failure marks every later plugin `Failed`
    /// and is returned as [`PluginSystemError::ActivationAborted`].
    pub async fn activate(
        &self,
        registry: &PluginRegistry,
        order: &[String],
        configs: &dyn ConfigSource,
        host: &mut HostContext,
        tracker: &mut LifecycleTracker,
    ) -> Result<Vec<String>> {
        let mut activated = Vec::new();

        for (index, name) in order.iter().enumerate() {
            let outcome = match registry.get(name) {
                Some(entry) => self.activate_plugin(entry, configs, host, tracker).await,
                None => Err(PluginSystemError::NotFound(name.clone()).into()),
            };

            match outcome {
                Ok(()) => {
                    log::info!("Plugin '{}' is active", name);
                    activated.push(name.clone());
                }
                Err(err) => {
                    log::error!("Plugin '{}' failed during activation: {}", name, err);
                    tracker.fail(name, err.to_string())?;

                    if self.fail_fast {
                        for rest in &order[index + 1..] {
                            let reason = format!("activation aborted after '{}' failed (fail-fast)", name);
                            log::warn!("Plugin '{}' not activated: {}", rest, reason);
                            tracker.fail(rest, reason)?;
                        }
                        return Err(PluginSystemError::ActivationAborted {
                            plugin_id: name.clone(),
                            source: Box::new(err),
                        }
                        .into());
                    }
                }
            }
        }

        Ok(activated)
    }

    async fn activate_plugin(
        &self,
        entry: &RegisteredPlugin,
        configs: &dyn ConfigSource,
        host: &mut HostContext,
        tracker: &mut LifecycleTracker,
    ) -> Result<()> {
        let descriptor = entry.descriptor();
        let plugin = entry.plugin();
        let name = descriptor.name.as_str();
        let step_failed = |step: LifecycleStep, source: Error| -> Error {
            PluginSystemError::LifecycleStepFailed {
                plugin_id: name.to_string(),
                step,
                source: Box::new(source),
            }
            .into()
        };

        let mut staged = host.clone();
        staged.pipeline.set_owner(name);

        let config = configs
            .plugin_config(descriptor)
            .map_err(|e| step_failed(LifecycleStep::RegisterServices, e))?;
        let context = PluginContext::new(
            name,
            config,
            self.deriver.plugin_paths(descriptor),
            self.deriver.route_prefix(descriptor),
        );

        plugin
            .register_services(&mut staged.services, &context)
            .await
            .map_err(|e| step_failed(LifecycleStep::RegisterServices, e))?;
        tracker.advance(name, LifecycleState::ServicesRegistered)?;

        plugin
            .configure_pipeline(&mut staged.pipeline)
            .await
            .map_err(|e| step_failed(LifecycleStep::ConfigurePipeline, e))?;
        tracker.advance(name, LifecycleState::Configured)?;

        {
            let mut routes = staged.routes.group(context.route_prefix(), name);
            plugin
                .register_routes(&mut routes, &context)
                .await
                .map_err(|e| step_failed(LifecycleStep::RegisterRoutes, e))?;
        }
        tracker.advance(name, LifecycleState::RoutesRegistered)?;

        {
            let prefix = self.deriver.management_route(&self.management_prefix, descriptor);
            let mut management = staged.routes.group(&prefix, name);
            let mounted = match plugin.management_endpoints() {
                Some(endpoints) => endpoints.register_management_endpoints(&mut management),
                None => map_default_management(&mut management),
            };
            mounted.map_err(|e| step_failed(LifecycleStep::RegisterManagementEndpoints, e))?;
        }

        *host = staged;
        tracker.advance(name, LifecycleState::Active)?;
        plugin.on_activated(&host.services).await;
        Ok(())
    }
}
