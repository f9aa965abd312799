//! Request/response route declaration.
//!
//! # Responsibilities
//! - Collect `(method, path) → Dispatcher` declarations, nested via `sub`
//! - Merge sub-router prefixes (and their parameters) into every route
//! - Mount the flattened table on axum
//!
//! # Design Decisions
//! - Paths use `:name` like socket routes; translated to axum's `{name}`
//! - Conflicting parameter names are rejected with the same compiler the
//!   socket routes use, before axum sees them
//! - A later declaration of the same method and path replaces the earlier one
//! - The request timeout wraps extraction and dispatch so an overrun still
//!   answers with the envelope

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::Method;
use axum::response::Response;
use axum::routing::{MethodFilter, MethodRouter};
use serde::Serialize;

use crate::error::{ErpcError, ErrorKind, RouteError};
use crate::http::request::{extract, request_id, RequestOptions};
use crate::http::response::{success, ErrorBoundary};
use crate::observability::metrics;
use crate::procedure::{Dispatcher, Locals, Procedure, Request};
use crate::routing::{compile, split_path, RawRouteTree, Segment};

/// Shared state of every mounted endpoint.
#[derive(Debug, Clone)]
pub(crate) struct HttpContext {
    pub(crate) options: RequestOptions,
    pub(crate) boundary: ErrorBoundary,
    pub(crate) request_timeout: Duration,
}

/// One declared route.
#[derive(Clone)]
pub struct Endpoint {
    pub method: Method,
    pub path: String,
    pub dispatcher: Dispatcher,
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("method", &self.method)
            .field("path", &self.path)
            .finish()
    }
}

/// Declaration-time router.
#[derive(Debug, Default)]
pub struct Router {
    endpoints: Vec<Endpoint>,
    subs: Vec<(String, Router)>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nested router mounted under `path`.
    ///
    /// Parameters in `path` are visible to every route declared below it.
    pub fn sub(&mut self, path: &str) -> &mut Router {
        let index = self.subs.len();
        self.subs.push((path.to_string(), Router::new()));
        &mut self.subs[index].1
    }

    /// Declare `method path` served by `procedure` and `handler`.
    pub fn route<H, Fut, R>(&mut self, method: Method, path: &str, procedure: &Procedure, handler: H) -> &mut Self
    where
        H: Fn(Arc<Request>, Locals) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ErpcError>> + Send + 'static,
        R: Serialize,
    {
        self.endpoints.push(Endpoint {
            method,
            path: path.to_string(),
            dispatcher: procedure.finalize(handler),
        });
        self
    }

    pub fn get<H, Fut, R>(&mut self, path: &str, procedure: &Procedure, handler: H) -> &mut Self
    where
        H: Fn(Arc<Request>, Locals) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ErpcError>> + Send + 'static,
        R: Serialize,
    {
        self.route(Method::GET, path, procedure, handler)
    }

    pub fn post<H, Fut, R>(&mut self, path: &str, procedure: &Procedure, handler: H) -> &mut Self
    where
        H: Fn(Arc<Request>, Locals) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ErpcError>> + Send + 'static,
        R: Serialize,
    {
        self.route(Method::POST, path, procedure, handler)
    }

    pub fn put<H, Fut, R>(&mut self, path: &str, procedure: &Procedure, handler: H) -> &mut Self
    where
        H: Fn(Arc<Request>, Locals) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ErpcError>> + Send + 'static,
        R: Serialize,
    {
        self.route(Method::PUT, path, procedure, handler)
    }

    pub fn patch<H, Fut, R>(&mut self, path: &str, procedure: &Procedure, handler: H) -> &mut Self
    where
        H: Fn(Arc<Request>, Locals) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ErpcError>> + Send + 'static,
        R: Serialize,
    {
        self.route(Method::PATCH, path, procedure, handler)
    }

    pub fn delete<H, Fut, R>(&mut self, path: &str, procedure: &Procedure, handler: H) -> &mut Self
    where
        H: Fn(Arc<Request>, Locals) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ErpcError>> + Send + 'static,
        R: Serialize,
    {
        self.route(Method::DELETE, path, procedure, handler)
    }

    /// Every endpoint with its full path, in declaration order.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        let mut out = Vec::new();
        self.flatten("", &mut out);
        out
    }

    fn flatten(&self, prefix: &str, out: &mut Vec<Endpoint>) {
        for endpoint in &self.endpoints {
            out.push(Endpoint {
                path: join_path(prefix, &endpoint.path),
                ..endpoint.clone()
            });
        }
        for (path, sub) in &self.subs {
            sub.flatten(&join_path(prefix, path), out);
        }
    }

    /// Mount the declarations on an axum router.
    pub(crate) fn to_axum(&self, ctx: Arc<HttpContext>) -> Result<axum::Router, RouteError> {
        let mut table: Vec<(String, Vec<Endpoint>)> = Vec::new();
        for endpoint in self.endpoints() {
            let index = match table.iter().position(|(path, _)| *path == endpoint.path) {
                Some(index) => index,
                None => {
                    table.push((endpoint.path.clone(), Vec::new()));
                    table.len() - 1
                }
            };
            let methods = &mut table[index].1;
            if let Some(slot) = methods.iter_mut().find(|e| e.method == endpoint.method) {
                tracing::warn!(method = %endpoint.method, path = %endpoint.path, "Route declared twice, keeping the later one");
                *slot = endpoint;
            } else {
                methods.push(endpoint);
            }
        }

        let mut raw = RawRouteTree::new();
        for (path, _) in &table {
            *raw.node_mut(path).leaf_mut() = Some(());
        }
        compile(&raw)?;

        // `:` and braces are already translated, so a leading `*` or `:` in a
        // literal segment is matched as text.
        let mut router = axum::Router::new().without_v07_checks();
        for (path, endpoints) in table {
            let route: Arc<str> = Arc::from(path.as_str());
            let mut methods: MethodRouter = MethodRouter::new();
            for endpoint in endpoints {
                let Ok(filter) = MethodFilter::try_from(endpoint.method.clone()) else {
                    tracing::warn!(method = %endpoint.method, path = %path, "Unsupported method, route skipped");
                    continue;
                };
                let ctx = Arc::clone(&ctx);
                let route = Arc::clone(&route);
                let dispatcher = endpoint.dispatcher;
                methods = methods.on(filter, move |req: axum::extract::Request| {
                    serve_endpoint(ctx, route, dispatcher, req)
                });
            }
            let fallback_ctx = Arc::clone(&ctx);
            methods = methods.fallback(move |req: axum::extract::Request| async move {
                let err = ErpcError::new(
                    ErrorKind::MethodNotSupported,
                    format!("{} not supported on {}", req.method(), req.uri().path()),
                );
                fallback_ctx.boundary.respond(&err, request_id(req.headers()))
            });
            tracing::debug!(path = %path, "Mounted route");
            router = router.route(&to_axum_path(&path), methods);
        }
        Ok(router)
    }
}

async fn serve_endpoint(
    ctx: Arc<HttpContext>,
    route: Arc<str>,
    dispatcher: Dispatcher,
    req: axum::extract::Request,
) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let request_id = request_id(req.headers()).to_string();

    tracing::debug!(request_id = %request_id, method = %method, route = %route, "Dispatching procedure");

    let work = async {
        let request = extract(req, &ctx.options).await?;
        dispatcher.dispatch(request).await
    };
    let result = match tokio::time::timeout(ctx.request_timeout, work).await {
        Ok(result) => result,
        Err(_) => Err(ErpcError::new(
            ErrorKind::Timeout,
            format!("request exceeded {}s", ctx.request_timeout.as_secs()),
        )),
    };
    let response = match result {
        Ok(value) => success(value),
        Err(e) => ctx.boundary.respond(&e, &request_id),
    };

    metrics::record_request(method.as_str(), &route, response.status().as_u16(), start);
    response
}

/// Join a prefix and a relative path into a normalized absolute path.
pub fn join_path(prefix: &str, path: &str) -> String {
    let segments: Vec<&str> = split_path(prefix)
        .into_iter()
        .chain(split_path(path))
        .collect();
    format!("/{}", segments.join("/"))
}

/// Translate `:name` segments into axum's `{name}` captures.
pub fn to_axum_path(path: &str) -> String {
    let segments: Vec<String> = split_path(path)
        .into_iter()
        .map(|raw| match Segment::parse(raw) {
            Segment::Param(name) => format!("{{{name}}}"),
            Segment::Literal(lit) => lit.replace('{', "{{").replace('}', "}}"),
        })
        .collect();
    format!("/{}", segments.join("/"))
}
