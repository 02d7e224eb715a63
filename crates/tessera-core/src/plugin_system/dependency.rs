use std::fmt;

use semver::Version;
use serde::Serialize;
use thiserror::Error;

use crate::plugin_system::version::{VersionConstraint, VersionError};

/// Represents a declared dependency on another plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginDependency {
    /// The name of the required plugin
    pub plugin_name: String,

    /// The requirement as written by the plugin author (e.g. `"[1.0,2.0)"`, `"*"`)
    pub requirement: String,
}

/// Error that can occur when resolving dependencies
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    /// The required plugin is absent, its requirement is unparseable, or it was itself rejected
    #[error("Plugin '{plugin}' requires '{dependency}', which is not available{}", .cause.as_ref().map(|c| format!(" ({})", c)).unwrap_or_default())]
    MissingDependency {
        plugin: String,
        dependency: String,
        cause: Option<String>,
    },

    /// The plugin was found, but the version is outside the requirement
    #[error("Plugin version mismatch: '{plugin}' requires '{dependency}' version '{required}' but found '{actual}'")]
    VersionMismatch {
        plugin: String,
        dependency: String,
        required: String,
        actual: String,
    },

    /// Dependency cycle detected
    #[error("Circular dependency detected: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    /// The plugin's own validation hook declined to load
    #[error("Plugin '{plugin}' rejected the accepted plugin set in its custom dependency validation")]
    CustomValidationRejected { plugin: String },
}

impl PluginDependency {
    /// Create a dependency with the given requirement string
    pub fn new(plugin_name: &str, requirement: &str) -> Self {
        Self {
            plugin_name: plugin_name.to_string(),
            requirement: requirement.to_string(),
        }
    }

    /// Create a dependency accepting any version
    pub fn any(plugin_name: &str) -> Self {
        Self::new(plugin_name, "*")
    }

    /// Parse the requirement string
    pub fn constraint(&self) -> Result<VersionConstraint, VersionError> {
        VersionConstraint::parse(&self.requirement)
    }

    /// Check if this dependency is satisfied by the given version.
    /// An unparseable requirement is never satisfied.
    pub fn is_satisfied_by(&self, version: &Version) -> bool {
        self.constraint()
            .map(|constraint| constraint.satisfies(version))
            .unwrap_or(false)
    }
}

impl fmt::Display for PluginDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.requirement.trim() == "*" {
            write!(f, "Requires plugin: {} (any version)", self.plugin_name)
        } else {
            write!(f, "Requires plugin: {} (version: {})", self.plugin_name, self.requirement)
        }
    }
}
