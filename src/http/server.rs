//! Server assembly.
//!
//! # Responsibilities
//! - Own the route declarations for both transports until activation
//! - Compile socket routes exactly once and mount request routes on axum
//! - Wire middleware (tracing, request ID, CORS, headers)
//! - Serve until the shutdown signal
//!
//! # Design Decisions
//! - Declarations are mutable only before `into_app`; the app is immutable
//! - Route errors surface at activation, never at request time
//! - Socket routes can still be swapped later through [`WsRouteTable::reload`]

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::Response;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::{ErpcError, RouteError};
use crate::http::middleware::{cors_layer, powered_by_layer};
use crate::http::request::RequestOptions;
use crate::http::response::{ErrorBoundary, ErrorHandler};
use crate::http::router::{HttpContext, Router};
use crate::http::websocket::{self, WsContext};
use crate::lifecycle::{shutdown_signal, Shutdown};
use crate::ws::{ConnectionRegistry, WsRouteTable, WsRoutes};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid routes: {0}")]
    Route(#[from] RouteError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Route declarations plus configuration, before activation.
pub struct Server {
    config: ServerConfig,
    router: Router,
    ws: WsRoutes,
    error_handler: Option<ErrorHandler>,
    connections: ConnectionRegistry,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            router: Router::new(),
            ws: WsRoutes::new(),
            error_handler: None,
            connections: ConnectionRegistry::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Root request/response router.
    pub fn router(&mut self) -> &mut Router {
        &mut self.router
    }

    /// Nested router under `path`, see [`Router::sub`].
    pub fn sub(&mut self, path: &str) -> &mut Router {
        self.router.sub(path)
    }

    /// Socket route declarations.
    pub fn ws(&mut self) -> &mut WsRoutes {
        &mut self.ws
    }

    /// Replace the default error rendering for request/response failures.
    pub fn on_error<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&ErpcError) -> Response + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Registry of open connections, usable before and after activation.
    pub fn connections(&self) -> ConnectionRegistry {
        self.connections.clone()
    }

    /// Compile every route and build the axum application.
    pub fn into_app(self) -> Result<App, ServerError> {
        let Server {
            config,
            router,
            ws,
            error_handler,
            connections,
        } = self;

        let mut boundary = ErrorBoundary::new(config.errors.log_errors);
        if let Some(handler) = error_handler {
            boundary = boundary.with_handler(handler);
        }
        let options = RequestOptions::from(&config.middleware);

        let ws_routes = ws.compile()?;
        tracing::info!(routes = ws_routes.route_count(), "Socket routes compiled");

        let http_ctx = Arc::new(HttpContext {
            options: options.clone(),
            boundary: boundary.clone(),
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        });
        let closing = Arc::new(Shutdown::new());
        let ws_ctx = Arc::new(WsContext {
            table: ws_routes.clone(),
            registry: connections.clone(),
            boundary,
            options,
            unknown_events: config.websocket.unknown_events,
            outbound_buffer: config.websocket.outbound_buffer,
            closing: Arc::clone(&closing),
        });

        let mut app = router.to_axum(http_ctx)?.fallback(
            move |upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
                  method: Method,
                  uri: Uri,
                  headers: HeaderMap| {
                websocket::fallback(Arc::clone(&ws_ctx), upgrade, method, uri, headers)
            },
        );

        app = app
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));
        if let Some(cors) = &config.middleware.cors {
            app = app.layer(cors_layer(cors));
        }
        if config.headers.x_powered_by {
            app = app.layer(powered_by_layer());
        }

        Ok(App {
            config,
            router: app,
            ws_routes,
            connections,
            closing,
        })
    }

    /// Activate and serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), ServerError> {
        self.into_app()?.serve(listener, shutdown).await
    }

    /// Bind the configured address and serve until Ctrl+C.
    pub async fn listen(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.config.listener.bind_address).await?;
        let shutdown = Shutdown::new();
        let rx = shutdown.subscribe();
        tokio::spawn(async move { shutdown_signal(&shutdown).await });
        self.run(listener, rx).await
    }
}

/// An activated server.
pub struct App {
    config: ServerConfig,
    router: axum::Router,
    ws_routes: WsRouteTable,
    connections: ConnectionRegistry,
    closing: Arc<Shutdown>,
}

impl App {
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The axum router, for embedding or `oneshot` tests.
    pub fn router(&self) -> axum::Router {
        self.router.clone()
    }

    /// Compiled socket routes; `reload` swaps them without a restart.
    pub fn ws_routes(&self) -> &WsRouteTable {
        &self.ws_routes
    }

    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    /// Accept connections until `shutdown` fires, then close open sockets.
    pub async fn serve(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "erpc server starting");

        let closing = Arc::clone(&self.closing);
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Closing open connections");
                closing.trigger();
            })
            .await?;

        tracing::info!("erpc server stopped");
        Ok(())
    }
}
