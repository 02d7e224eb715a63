pub mod host;
pub mod kernel;
pub mod plugin_system;
pub mod storage;

// Re-export key public types/traits for the binary and plugin crates
pub use host::{HostContext, Method, PipelineBuilder, Request, Response, RouteGroup, ServiceCollection};
pub use kernel::error::Error as KernelError;
pub use kernel::{HostSettings, PluginHost, StartupReport};
pub use plugin_system::{
    AcceptedPlugins, DependencyValidator, LifecycleState, ManagementEndpoints, Plugin, PluginContext,
    PluginDescriptor,
};
pub use storage::{ConfigData, ConfigSource};

#[cfg(test)]
mod tests;
