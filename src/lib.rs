//! erpc: typed procedures over HTTP and WebSocket.
//!
//! # Architecture Overview
//!
//! ```text
//!   Setup                              Runtime
//!   ─────                              ───────
//!   Procedure::base()                  HTTP request
//!     .extend(..).input(..)              → http::router (method + path)
//!        │                               → procedure pipeline → handler
//!        ├─ Router::post(path, ..)       → envelope / error boundary
//!        │
//!        └─ WsRoutes::on(path, event)  Upgrade request
//!              → RawRouteTree            → routing matcher (compiled tree)
//!              → compiled at activation  → Session per connection
//!                                        → frame → pipeline → event handler
//! ```
//!
//! Cross-cutting: `config` (TOML), `observability` (tracing + Prometheus),
//! `lifecycle` (shutdown).

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod procedure;
pub mod routing;
pub mod ws;

pub use config::ServerConfig;
pub use error::{ErpcError, ErrorKind, RouteError, ValidationFailure};
pub use http::{App, Router, Server, ServerError};
pub use lifecycle::Shutdown;
pub use procedure::{schema_fn, typed, Locals, Procedure, Request};
pub use ws::{Connection, EventContext, EventTable, WsRouteTable, WsRoutes};
