use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::kernel::error::Result;
use crate::plugin_system::error::PluginSystemError;

/// HTTP method of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        };
        write!(f, "{}", text)
    }
}

/// Minimal request shape handed to handlers and middleware
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

impl Request {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            body: None,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Minimal response shape: a status code and a JSON body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub status: u16,
    pub body: serde_json::Value,
}

impl Response {
    pub fn new(status: u16, body: serde_json::Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: serde_json::Value) -> Self {
        Self::new(200, body)
    }

    pub fn not_found(path: &str) -> Self {
        Self::new(404, json!({ "error": "Not Found", "path": path }))
    }
}

pub type Handler = Arc<dyn Fn(&Request) -> Response + Send + Sync>;

/// A registered route and the plugin that owns it
#[derive(Clone)]
pub struct Route {
    pub method: Method,
    pub path: String,
    pub owner: String,
    handler: Handler,
}

impl Route {
    pub fn handle(&self, request: &Request) -> Response {
        (self.handler)(request)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

/// Joins a group prefix and a relative route path into a normalized absolute path.
pub fn join_route(prefix: &str, path: &str) -> String {
    let mut joined = prefix.trim_end_matches('/').to_string();
    let tail = path.trim_matches('/');
    if !tail.is_empty() {
        joined.push('/');
        joined.push_str(tail);
    }
    if joined.is_empty() {
        "/".to_string()
    } else if joined.starts_with('/') {
        joined
    } else {
        format!("/{}", joined)
    }
}

/// In-memory routing table standing in for the host's router.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a route group rooted at `prefix`, recording `owner` on every route mapped through it.
    pub fn group(&mut self, prefix: &str, owner: &str) -> RouteGroup<'_> {
        RouteGroup {
            table: self,
            prefix: join_route(prefix, ""),
            owner: owner.to_string(),
        }
    }

    fn insert(&mut self, route: Route) -> Result<()> {
        if let Some(existing) = self.find(route.method, &route.path) {
            return Err(PluginSystemError::RouteConflict {
                method: route.method,
                path: route.path,
                owner: existing.owner.clone(),
            }
            .into());
        }
        self.routes.push(route);
        Ok(())
    }

    pub fn find(&self, method: Method, path: &str) -> Option<&Route> {
        self.routes
            .iter()
            .find(|route| route.method == method && route.path == path)
    }

    /// Route a request to its handler; unknown paths yield 404.
    pub fn dispatch(&self, request: &Request) -> Response {
        let path = join_route(&request.path, "");
        match self.find(request.method, &path) {
            Some(route) => route.handle(request),
            None => Response::not_found(&path),
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn routes_owned_by<'a>(&'a self, owner: &'a str) -> impl Iterator<Item = &'a Route> + 'a {
        self.routes.iter().filter(move |route| route.owner == owner)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// A view onto a [`RouteTable`] that prefixes every mapped path.
pub struct RouteGroup<'a> {
    table: &'a mut RouteTable,
    prefix: String,
    owner: String,
}

impl RouteGroup<'_> {
    /// The absolute prefix of this group (`"/"` when unprefixed)
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Map a handler; fails if the same method and path is already taken.
    pub fn map<F>(&mut self, method: Method, path: &str, handler: F) -> Result<()>
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        let route = Route {
            method,
            path: join_route(&self.prefix, path),
            owner: self.owner.clone(),
            handler: Arc::new(handler),
        };
        self.table.insert(route)
    }

    pub fn map_get<F>(&mut self, path: &str, handler: F) -> Result<()>
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.map(Method::Get, path, handler)
    }

    pub fn map_post<F>(&mut self, path: &str, handler: F) -> Result<()>
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.map(Method::Post, path, handler)
    }

    /// Nested group under this group's prefix
    pub fn group(&mut self, prefix: &str) -> RouteGroup<'_> {
        RouteGroup {
            prefix: join_route(&self.prefix, prefix),
            owner: self.owner.clone(),
            table: &mut *self.table,
        }
    }
}

/// Payload served by plugins that do not provide management endpoints
pub fn default_management_response() -> Response {
    Response::ok(json!({
        "status": "Not Applicable",
        "message": "This plugin does not have configurable management endpoints."
    }))
}

/// Maps `GET /` of a management group to [`default_management_response`].
pub fn map_default_management(group: &mut RouteGroup<'_>) -> Result<()> {
    group.map_get("/", |_| default_management_response())
}
