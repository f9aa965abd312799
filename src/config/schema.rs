//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for an erpc server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, auto start).
    pub listener: ListenerConfig,

    /// Error boundary behaviour.
    pub errors: ErrorConfig,

    /// Default response headers.
    pub headers: HeadersConfig,

    /// Transport glue middleware toggles.
    pub middleware: MiddlewareConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Persistent-connection settings.
    pub websocket: WebSocketConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:2000").
    pub bind_address: String,

    /// Start listening as soon as setup finishes.
    pub start_auto: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:2000".to_string(),
            start_auto: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ErrorConfig {
    /// Log unclassified errors and include their message in responses.
    pub log_errors: bool,
}

impl Default for ErrorConfig {
    fn default() -> Self {
        Self { log_errors: true }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HeadersConfig {
    /// Send `X-Powered-By: erpc`.
    pub x_powered_by: bool,
}

/// Transport glue middleware.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MiddlewareConfig {
    /// CORS is only enabled when this section is present.
    pub cors: Option<CorsConfig>,

    /// Parse JSON request bodies.
    pub body_parser: bool,

    /// Parse the Cookie header.
    pub cookie_parser: bool,

    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            cors: None,
            body_parser: true,
            cookie_parser: true,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins; empty means any origin.
    pub allowed_origins: Vec<String>,

    /// Send `Access-Control-Allow-Credentials`.
    pub allow_credentials: bool,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// What to do with a frame whose event has no binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownEventPolicy {
    /// Drop the frame silently.
    #[default]
    Ignore,
    /// Reply with an `error` frame.
    ErrorFrame,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebSocketConfig {
    pub unknown_events: UnknownEventPolicy,

    /// Outbound frames buffered per connection before `emit` waits.
    pub outbound_buffer: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            unknown_events: UnknownEventPolicy::Ignore,
            outbound_buffer: 256,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
