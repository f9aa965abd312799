//! Metrics collection and exposition.
//!
//! # Metrics
//! - `erpc_requests_total` (counter): requests by method, route, status
//! - `erpc_request_duration_seconds` (histogram): latency distribution
//! - `erpc_events_total` (counter): socket events by event name and outcome
//! - `erpc_active_connections` (gauge): open persistent connections
//!
//! Recording is a no-op until a recorder is installed, so tests and
//! embedders that skip [`init_metrics`] pay almost nothing.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    metrics::counter!(
        "erpc_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "erpc_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_event(event: &str, outcome: &'static str) {
    metrics::counter!(
        "erpc_events_total",
        "event" => event.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn connection_opened() {
    metrics::gauge!("erpc_active_connections").increment(1.0);
}

pub fn connection_closed() {
    metrics::gauge!("erpc_active_connections").decrement(1.0);
}
