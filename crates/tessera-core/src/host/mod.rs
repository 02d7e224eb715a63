//! # Tessera Core Host Contracts
//!
//! Narrow shapes of the collaborators the lifecycle orchestrator drives:
//! a singleton service container ([`ServiceCollection`]), an ordered
//! middleware pipeline ([`PipelineBuilder`]) and a route table with prefixed
//! route groups ([`RouteTable`], [`RouteGroup`]).
//!
//! All three are in-memory. An HTTP server or DI container is adapted behind
//! the same calls.
pub mod pipeline;
pub mod routing;
pub mod services;

pub use pipeline::{Middleware, PipelineBuilder};
pub use routing::{Method, Request, Response, RouteGroup, RouteTable};
pub use services::ServiceCollection;

/// Everything plugins register into during activation.
#[derive(Debug, Clone, Default)]
pub struct HostContext {
    pub services: ServiceCollection,
    pub pipeline: PipelineBuilder,
    pub routes: RouteTable,
}

impl HostContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a request: middleware first, then the route table.
    pub fn handle(&self, request: &Request) -> Response {
        self.pipeline
            .run(request)
            .unwrap_or_else(|| self.routes.dispatch(request))
    }
}
