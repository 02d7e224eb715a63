//! # Tessera Core Plugin System
//!
//! Everything between "a set of plugin descriptors" and "an ordered list of
//! active plugins".
//!
//! ## Key Submodules and Responsibilities:
//!
//! - **[`version`]**: Parses constraint strings (`*`, exact versions, bracket
//!   intervals) into [`VersionConstraint`] values and tests versions against them.
//! - **[`descriptor`]**: The [`PluginDescriptor`] metadata every plugin exposes.
//! - **[`dependency`]**: A single declared requirement ([`PluginDependency`]) and
//!   the [`DependencyError`](dependency::DependencyError) values rejections carry.
//! - **[`registry`]**: The name-keyed [`PluginRegistry`], validated at registration.
//! - **[`resolver`]**: Stage-one resolution: presence and version checks, cycle
//!   detection and the deterministic topological activation order.
//! - **[`validator`]**: Runs stage one, then each plugin's own
//!   [`DependencyValidator`] hook.
//! - **[`lifecycle`]**: Lifecycle states and the [`LifecycleOrchestrator`] that
//!   invokes plugin callbacks in order, isolating failures.
//! - **[`paths`]**: Route prefixes and data directories derived from descriptors.
//! - **[`traits`]**: The [`Plugin`] contract and its optional capabilities.
//! - **[`error`]**: [`PluginSystemError`](error::PluginSystemError).
pub mod dependency;
pub mod descriptor;
pub mod error;
pub mod lifecycle;
pub mod paths;
pub mod registry;
pub mod resolver;
pub mod traits;
pub mod validator;
pub mod version;

pub use dependency::PluginDependency;
pub use descriptor::PluginDescriptor;
pub use lifecycle::{LifecycleOrchestrator, LifecycleState, LifecycleStep, LifecycleTracker};
pub use paths::{PathDeriver, PluginPaths};
pub use registry::PluginRegistry;
pub use resolver::{DependencyResolver, LoadPlan, ResolutionResult};
pub use traits::{AcceptedPlugins, DependencyValidator, ManagementEndpoints, Plugin, PluginContext};
pub use validator::TwoStageValidator;
pub use version::VersionConstraint;

#[cfg(test)]
pub(crate) mod tests;
