//! Request extraction.
//!
//! # Responsibilities
//! - Pull path parameters, query, cookies and JSON body off an axum request
//! - Enforce the body size limit
//! - Produce the transport-neutral [`Request`] seen by procedures
//!
//! # Design Decisions
//! - Request ID is assigned by `tower_http::request_id` before extraction
//! - Empty body is `null`, non-JSON content types are not parsed
//! - Repeated query keys collect into arrays

use std::collections::HashMap;

use axum::body::Body;
use axum::extract::{FromRequestParts, Path};
use axum::http::{header, HeaderMap};
use serde_json::{Map, Value};

use crate::config::MiddlewareConfig;
use crate::error::{ErpcError, ErrorKind};
use crate::procedure::Request;

/// Standard header name for request IDs.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Pre-processing toggles applied before a procedure runs.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub body_parser: bool,
    pub cookie_parser: bool,
    pub max_body_size: usize,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::from(&MiddlewareConfig::default())
    }
}

impl From<&MiddlewareConfig> for RequestOptions {
    fn from(config: &MiddlewareConfig) -> Self {
        Self {
            body_parser: config.body_parser,
            cookie_parser: config.cookie_parser,
            max_body_size: config.max_body_size,
        }
    }
}

/// Request ID assigned to this request, if any.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Parse a raw query string. Repeated keys become arrays.
pub fn parse_query(raw: Option<&str>) -> Map<String, Value> {
    let mut query = Map::new();
    let Some(raw) = raw else {
        return query;
    };
    for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
        let value = Value::String(value.into_owned());
        match query.get_mut(key.as_ref()) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                query.insert(key.into_owned(), value);
            }
        }
    }
    query
}

/// Parse every `Cookie` header into a name → value map.
pub fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

fn is_json(headers: &HeaderMap) -> bool {
    match headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
        Some(content_type) => content_type.to_ascii_lowercase().contains("json"),
        None => true,
    }
}

/// Parse a buffered body. Empty or whitespace-only is `null`.
pub fn parse_body(bytes: &[u8]) -> Result<Value, ErpcError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes)
        .map_err(|e| ErpcError::new(ErrorKind::BadRequest, format!("malformed JSON body: {e}")))
}

/// Turn an axum request into a procedure request.
pub async fn extract(req: axum::extract::Request, opts: &RequestOptions) -> Result<Request, ErpcError> {
    let (mut parts, body) = req.into_parts();

    let params = match Path::<HashMap<String, String>>::from_request_parts(&mut parts, &()).await {
        Ok(Path(params)) => params,
        Err(_) => HashMap::new(),
    };
    let query = parse_query(parts.uri.query());
    let cookies = if opts.cookie_parser {
        parse_cookies(&parts.headers)
    } else {
        HashMap::new()
    };
    let body = if opts.body_parser && is_json(&parts.headers) {
        read_body(body, &parts.headers, opts.max_body_size).await?
    } else {
        Value::Null
    };

    Ok(Request {
        method: parts.method,
        path: parts.uri.path().to_string(),
        headers: parts.headers,
        params,
        query,
        cookies,
        body,
    })
}

async fn read_body(body: Body, headers: &HeaderMap, limit: usize) -> Result<Value, ErpcError> {
    let too_large = || {
        ErpcError::new(
            ErrorKind::PayloadTooLarge,
            format!("request body exceeds {limit} bytes"),
        )
    };

    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(too_large());
    }

    let bytes = axum::body::to_bytes(body, limit).await.map_err(|_| too_large())?;
    parse_body(&bytes)
}
