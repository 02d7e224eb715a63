use crate::plugin_system::registry::PluginRegistry;
use crate::plugin_system::resolver::{DependencyResolver, LoadPlan, ResolutionResult};
use crate::plugin_system::traits::AcceptedPlugins;

/// Declarative resolution followed by plugin-authored validation.
///
/// Stage two runs a single pass in activation order. Every hook receives the
/// same snapshot: the stage-one-accepted plugins other than itself. A stage-two
/// rejection removes only that plugin from the activation order; dependents
/// that already passed stage one are not re-resolved in the same attempt.
pub struct TwoStageValidator;

impl TwoStageValidator {
    pub fn validate(registry: &PluginRegistry) -> LoadPlan {
        let plan = DependencyResolver::resolve(registry);
        Self::apply_custom_validation(registry, plan)
    }

    /// Stage two over a stage-one plan.
    pub fn apply_custom_validation(registry: &PluginRegistry, mut plan: LoadPlan) -> LoadPlan {
        let stage_one = Self::accepted_versions(registry, &plan);
        let mut order = Vec::with_capacity(plan.order.len());

        for name in std::mem::take(&mut plan.order) {
            let Some(entry) = registry.get(&name) else {
                continue;
            };

            let accepted = match entry.plugin().dependency_validator() {
                None => true,
                Some(validator) => {
                    let mut visible = stage_one.clone();
                    visible.remove(&name);
                    validator.validate_dependency(&visible)
                }
            };

            if accepted {
                order.push(name);
            } else {
                let result = ResolutionResult::RejectedCustomValidation;
                if let Some(err) = result.to_error(&name) {
                    log::warn!("Plugin '{}' rejected at {}: {}", name, result.stage(), err);
                }
                plan.results.insert(name, result);
            }
        }

        plan.order = order;
        plan
    }

    /// Declared versions of every plugin accepted by stage one.
    pub fn accepted_versions(registry: &PluginRegistry, plan: &LoadPlan) -> AcceptedPlugins {
        plan.order
            .iter()
            .filter_map(|name| {
                registry
                    .get(name)
                    .map(|entry| (name.clone(), entry.descriptor().version.clone()))
            })
            .collect()
    }
}
