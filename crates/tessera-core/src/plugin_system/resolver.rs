//! Declarative (stage-one) dependency resolution.
//!
//! For every plugin, each declared dependency is parsed, looked up and
//! version-checked. Plugins that pass form a dependency graph whose strongly
//! connected components are found by depth-first search (Tarjan); every member
//! of a component with a cycle is removed, then the survivors are ordered
//! topologically with ascending-name tie-breaking.
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::plugin_system::dependency::DependencyError;
use crate::plugin_system::registry::{PluginRegistry, RegisteredPlugin};
use crate::plugin_system::version::VersionConstraint;

/// Outcome of resolution for one plugin in one load attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResolutionResult {
    Accepted,
    /// Dependency absent, requirement unparseable (`cause` holds the parse error),
    /// or dependency itself rejected
    RejectedMissingDependency {
        dependency: String,
        cause: Option<String>,
    },
    RejectedVersionMismatch {
        dependency: String,
        required: String,
        actual: String,
    },
    RejectedCycle {
        members: Vec<String>,
    },
    RejectedCustomValidation,
}

impl ResolutionResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ResolutionResult::Accepted)
    }

    /// Which validation stage produced this result
    pub fn stage(&self) -> &'static str {
        match self {
            ResolutionResult::Accepted => "accepted",
            ResolutionResult::RejectedMissingDependency { .. }
            | ResolutionResult::RejectedVersionMismatch { .. } => "stage-one dependency check",
            ResolutionResult::RejectedCycle { .. } => "stage-one cycle detection",
            ResolutionResult::RejectedCustomValidation => "stage-two custom validation",
        }
    }

    /// The rejection as an error value, `None` when accepted
    pub fn to_error(&self, plugin: &str) -> Option<DependencyError> {
        match self {
            ResolutionResult::Accepted => None,
            ResolutionResult::RejectedMissingDependency { dependency, cause } => {
                Some(DependencyError::MissingDependency {
                    plugin: plugin.to_string(),
                    dependency: dependency.clone(),
                    cause: cause.clone(),
                })
            }
            ResolutionResult::RejectedVersionMismatch { dependency, required, actual } => {
                Some(DependencyError::VersionMismatch {
                    plugin: plugin.to_string(),
                    dependency: dependency.clone(),
                    required: required.clone(),
                    actual: actual.clone(),
                })
            }
            ResolutionResult::RejectedCycle { members } => {
                let mut path = members.clone();
                if let Some(first) = members.first() {
                    path.push(first.clone());
                }
                Some(DependencyError::CyclicDependency(path))
            }
            ResolutionResult::RejectedCustomValidation => Some(DependencyError::CustomValidationRejected {
                plugin: plugin.to_string(),
            }),
        }
    }
}

/// Per-plugin results plus the activation order of the accepted plugins
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadPlan {
    pub results: BTreeMap<String, ResolutionResult>,
    /// Every accepted plugin, dependencies before dependents
    pub order: Vec<String>,
}

impl LoadPlan {
    pub fn result(&self, name: &str) -> Option<&ResolutionResult> {
        self.results.get(name)
    }

    pub fn is_accepted(&self, name: &str) -> bool {
        self.result(name).is_some_and(ResolutionResult::is_accepted)
    }

    /// Rejected plugins in name order
    pub fn rejected(&self) -> impl Iterator<Item = (&String, &ResolutionResult)> {
        self.results.iter().filter(|(_, result)| !result.is_accepted())
    }
}

pub struct DependencyResolver;

impl DependencyResolver {
    /// Run stage-one resolution over the whole registry.
    pub fn resolve(registry: &PluginRegistry) -> LoadPlan {
        let mut results = BTreeMap::new();
        let mut survivors = BTreeSet::new();

        for entry in registry.iter() {
            match Self::check_declared(registry, entry) {
                ResolutionResult::Accepted => {
                    survivors.insert(entry.name().to_string());
                }
                rejected => Self::reject(&mut results, entry.name(), rejected),
            }
        }

        // Removing whole components leaves the graph acyclic, and propagation only removes nodes.
        for cycle in Self::find_cycles(registry, &survivors) {
            for member in &cycle {
                survivors.remove(member);
                Self::reject(
                    &mut results,
                    member,
                    ResolutionResult::RejectedCycle { members: cycle.clone() },
                );
            }
        }
        Self::propagate_rejections(registry, &mut survivors, &mut results);

        let order = Self::topological_order(registry, &survivors);
        for name in &survivors {
            results.insert(name.clone(), ResolutionResult::Accepted);
        }
        log::debug!("Stage-one activation order: {:?}", order);

        LoadPlan { results, order }
    }

    fn reject(results: &mut BTreeMap<String, ResolutionResult>, name: &str, result: ResolutionResult) {
        if let Some(err) = result.to_error(name) {
            log::warn!("Plugin '{}' rejected at {}: {}", name, result.stage(), err);
        }
        results.insert(name.to_string(), result);
    }

    /// Parse, look up and version-check each declared dependency; the first failure wins.
    fn check_declared(registry: &PluginRegistry, entry: &RegisteredPlugin) -> ResolutionResult {
        for (dependency, requirement) in &entry.descriptor().dependencies {
            let constraint = match VersionConstraint::parse(requirement) {
                Ok(constraint) => constraint,
                Err(err) => {
                    return ResolutionResult::RejectedMissingDependency {
                        dependency: dependency.clone(),
                        cause: Some(err.to_string()),
                    };
                }
            };

            let Some(found) = registry.get(dependency) else {
                return ResolutionResult::RejectedMissingDependency {
                    dependency: dependency.clone(),
                    cause: None,
                };
            };

            if !constraint.satisfies(found.version()) {
                return ResolutionResult::RejectedVersionMismatch {
                    dependency: dependency.clone(),
                    required: requirement.clone(),
                    actual: found.descriptor().version.clone(),
                };
            }
        }
        ResolutionResult::Accepted
    }

    /// Rejects survivors whose dependencies were rejected, until nothing changes.
    fn propagate_rejections(
        registry: &PluginRegistry,
        survivors: &mut BTreeSet<String>,
        results: &mut BTreeMap<String, ResolutionResult>,
    ) {
        loop {
            let mut newly_rejected = Vec::new();
            for name in survivors.iter() {
                let Some(entry) = registry.get(name) else {
                    continue;
                };
                let lost = entry
                    .descriptor()
                    .dependencies
                    .keys()
                    .find(|dependency| !survivors.contains(*dependency));
                if let Some(dependency) = lost {
                    let upstream = results
                        .get(dependency)
                        .and_then(|result| result.to_error(dependency))
                        .map(|err| format!("dependency '{}' was rejected: {}", dependency, err))
                        .unwrap_or_else(|| format!("dependency '{}' was rejected", dependency));
                    newly_rejected.push((
                        name.clone(),
                        ResolutionResult::RejectedMissingDependency {
                            dependency: dependency.clone(),
                            cause: Some(upstream),
                        },
                    ));
                }
            }

            if newly_rejected.is_empty() {
                return;
            }
            for (name, result) in newly_rejected {
                survivors.remove(&name);
                Self::reject(results, &name, result);
            }
        }
    }

    /// Every strongly connected component of the survivor graph that contains a
    /// cycle (two or more members, or a plugin depending on itself). Members are
    /// in name order.
    fn find_cycles(registry: &PluginRegistry, survivors: &BTreeSet<String>) -> Vec<Vec<String>> {
        let mut search = ComponentSearch {
            registry,
            survivors,
            index: BTreeMap::new(),
            lowlink: BTreeMap::new(),
            stack: Vec::new(),
            on_stack: BTreeSet::new(),
            cycles: Vec::new(),
        };
        for start in survivors {
            if !search.index.contains_key(start.as_str()) {
                search.strong_connect(start);
            }
        }
        search.cycles.sort();
        search.cycles
    }

    /// Kahn's algorithm over an acyclic survivor set; the ready set is ordered by name.
    fn topological_order(registry: &PluginRegistry, survivors: &BTreeSet<String>) -> Vec<String> {
        let mut pending: BTreeMap<&str, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

        for name in survivors {
            let deps: Vec<&str> = registry
                .get(name)
                .map(|entry| {
                    entry
                        .descriptor()
                        .dependencies
                        .keys()
                        .filter(|dep| survivors.contains(*dep))
                        .map(String::as_str)
                        .collect()
                })
                .unwrap_or_default();
            pending.insert(name.as_str(), deps.len());
            for dep in deps {
                dependents.entry(dep).or_default().push(name.as_str());
            }
        }

        let mut ready: BTreeSet<&str> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(name, _)| *name)
            .collect();
        let mut order = Vec::with_capacity(survivors.len());

        while let Some(next) = ready.pop_first() {
            order.push(next.to_string());
            for dependent in dependents.get(next).into_iter().flatten() {
                if let Some(count) = pending.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        order
    }
}

/// Tarjan's strongly connected components over the stage-one survivors.
struct ComponentSearch<'a> {
    registry: &'a PluginRegistry,
    survivors: &'a BTreeSet<String>,
    index: BTreeMap<&'a str, usize>,
    lowlink: BTreeMap<&'a str, usize>,
    stack: Vec<&'a str>,
    on_stack: BTreeSet<&'a str>,
    cycles: Vec<Vec<String>>,
}

impl<'a> ComponentSearch<'a> {
    /// Dependencies of `node` that are still survivors
    fn edges(&self, node: &str) -> Vec<&'a str> {
        let survivors = self.survivors;
        self.registry
            .get(node)
            .map(|entry| {
                entry
                    .descriptor()
                    .dependencies
                    .keys()
                    .filter_map(|dep| survivors.get(dep).map(String::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn strong_connect(&mut self, node: &'a str) {
        let index = self.index.len();
        self.index.insert(node, index);
        self.lowlink.insert(node, index);
        self.stack.push(node);
        self.on_stack.insert(node);

        let edges = self.edges(node);
        for &dependency in &edges {
            let reached = match self.index.get(dependency) {
                None => {
                    self.strong_connect(dependency);
                    self.lowlink.get(dependency).copied()
                }
                Some(&dep_index) if self.on_stack.contains(dependency) => Some(dep_index),
                Some(_) => None,
            };
            if let (Some(reached), Some(low)) = (reached, self.lowlink.get_mut(node)) {
                *low = (*low).min(reached);
            }
        }

        if self.lowlink.get(node) != Some(&index) {
            return;
        }

        let mut component = Vec::new();
        while let Some(member) = self.stack.pop() {
            self.on_stack.remove(member);
            component.push(member.to_string());
            if member == node {
                break;
            }
        }
        if component.len() > 1 || edges.contains(&node) {
            component.sort();
            self.cycles.push(component);
        }
    }
}
