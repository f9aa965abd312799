//! Request/response transport subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum app, tracing, request ID, timeout, CORS)
//!     → router.rs (declared method + path → Dispatcher)
//!         → request.rs (params, query, cookies, JSON body)
//!         → Dispatcher (procedure steps, then handler)
//!         → response.rs (envelope or error boundary)
//!     → websocket.rs (fallback: socket upgrade or NOT_FOUND)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod websocket;

pub use request::{RequestOptions, X_REQUEST_ID};
pub use response::{Envelope, ErrorBody, ErrorBoundary, ErrorHandler};
pub use router::Router;
pub use server::{App, Server, ServerError};
