use std::fmt;
use std::sync::Arc;

use crate::host::routing::{Request, Response};

/// Middleware sees every request before routing and may answer it directly.
pub type Middleware = Arc<dyn Fn(&Request) -> Option<Response> + Send + Sync>;

/// A named middleware layer
#[derive(Clone)]
pub struct Layer {
    pub name: String,
    pub owner: String,
    middleware: Middleware,
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

/// Ordered middleware pipeline handed to `configure_pipeline`.
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    layers: Vec<Layer>,
    owner: String,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute layers added from now on to `owner`.
    pub(crate) fn set_owner(&mut self, owner: &str) {
        self.owner = owner.to_string();
    }

    /// Append a middleware layer. Layers run in insertion order.
    pub fn use_middleware<F>(&mut self, name: &str, middleware: F) -> &mut Self
    where
        F: Fn(&Request) -> Option<Response> + Send + Sync + 'static,
    {
        self.layers.push(Layer {
            name: name.to_string(),
            owner: self.owner.clone(),
            middleware: Arc::new(middleware),
        });
        self
    }

    /// Run the request through the layers; the first layer that answers wins.
    pub fn run(&self, request: &Request) -> Option<Response> {
        self.layers
            .iter()
            .find_map(|layer| (layer.middleware)(request))
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|layer| layer.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
