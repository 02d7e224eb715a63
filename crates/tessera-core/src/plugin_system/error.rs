//! # Tessera Core Plugin System Errors
//!
//! [`PluginSystemError`] covers registration problems, lifecycle step
//! failures and route conflicts, and wraps the dependency and version errors
//! raised during resolution.
use crate::host::routing::Method;
use crate::kernel::error::Error;
use crate::plugin_system::dependency::DependencyError;
use crate::plugin_system::lifecycle::{LifecycleState, LifecycleStep};
use crate::plugin_system::version::VersionError;

#[derive(Debug, thiserror::Error)]
pub enum PluginSystemError {
    #[error("Plugin already registered: {plugin_id}")]
    DuplicatePlugin { plugin_id: String },

    #[error("Invalid descriptor for plugin '{plugin_id}': {message}")]
    InvalidDescriptor { plugin_id: String, message: String },

    #[error("Plugin not found: {0}")]
    NotFound(String),

    #[error("Lifecycle step '{step}' failed for plugin '{plugin_id}': {source}")]
    LifecycleStepFailed {
        plugin_id: String,
        step: LifecycleStep,
        #[source]
        source: Box<Error>,
    },

    #[error("Invalid lifecycle transition for plugin '{plugin_id}': {from} -> {to}")]
    InvalidTransition {
        plugin_id: String,
        from: LifecycleState,
        to: LifecycleState,
    },

    #[error("Activation aborted (fail-fast) after plugin '{plugin_id}' failed: {source}")]
    ActivationAborted {
        plugin_id: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Route conflict: {method} {path} is already registered by '{owner}'")]
    RouteConflict {
        method: Method,
        path: String,
        owner: String,
    },

    #[error("Dependency resolution failed: {0}")]
    DependencyResolution(#[from] DependencyError),

    #[error("Version parsing error: {0}")]
    VersionParsing(#[from] VersionError),
}
