//! Transport-neutral request seen by steps and handlers.

use std::collections::HashMap;

use axum::http::{HeaderMap, Method};
use serde_json::{Map, Value};

/// A request after transport pre-processing.
///
/// For request/response traffic `body` is the parsed JSON body. For a
/// socket event it is the frame's `data`, and `params`/`query` come from the
/// upgrade request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub params: HashMap<String, String>,
    pub query: Map<String, Value>,
    pub cookies: HashMap<String, String>,
    pub body: Value,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            method: Method::GET,
            path: "/".to_string(),
            headers: HeaderMap::new(),
            params: HashMap::new(),
            query: Map::new(),
            cookies: HashMap::new(),
            body: Value::Null,
        }
    }
}

impl Request {
    /// Request carrying only a body, mostly useful in tests.
    pub fn with_body(body: Value) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }

    /// Look up a path parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Look up a header as a string.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }
}
