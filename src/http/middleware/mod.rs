//! Transport glue layers configured from `[middleware]` and `[headers]`.

use axum::http::{HeaderName, HeaderValue};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::CorsConfig;

pub const X_POWERED_BY: &str = "x-powered-by";

/// CORS layer for the configured origins.
///
/// An empty origin list allows any origin. With credentials the request
/// origin is mirrored, since a wildcard cannot carry credentials.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    let layer = match (origins.is_empty(), config.allow_credentials) {
        (false, _) => CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request()),
        (true, true) => CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request()),
        (true, false) => CorsLayer::permissive(),
    };
    layer.allow_credentials(config.allow_credentials)
}

/// Adds `X-Powered-By: erpc` unless a handler set it.
pub fn powered_by_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::if_not_present(
        HeaderName::from_static(X_POWERED_BY),
        HeaderValue::from_static("erpc"),
    )
}
