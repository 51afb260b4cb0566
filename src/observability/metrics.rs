//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, attempts, breaker, registry)
//! - Expose Prometheus-compatible metrics endpoint
//! - Track per-endpoint and per-route metrics
//!
//! # Metrics
//! - `gateway_requests_total` (counter): routed requests by route, outcome
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_endpoint_attempts_total` (counter): attempts by endpoint, result
//! - `gateway_breaker_transitions_total` (counter): by endpoint, target state
//! - `gateway_endpoint_up` (gauge): 1=up, 0=down from the last probe
//! - `gateway_registry_refresh_total` (counter): by result
//! - `gateway_registry_instances` (gauge): instances in the current snapshot
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Labels for route, endpoint, outcome

use std::net::SocketAddr;

use ::metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::load_balancer::endpoint::Endpoint;
use crate::resilience::BreakerState;
use crate::routing::RouteReport;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record everything the router learned about one request.
pub fn record_route(report: &RouteReport) {
    let outcome = report.outcome;
    counter!(
        "gateway_requests_total",
        "route" => report.route,
        "outcome" => outcome
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "route" => report.route)
        .record(report.elapsed.as_secs_f64());

    for attempt in &report.attempts {
        counter!(
            "gateway_endpoint_attempts_total",
            "endpoint" => attempt.endpoint.to_string(),
            "result" => attempt.result.label()
        )
        .increment(1);
    }
}

pub fn record_breaker_transition(endpoint: &Endpoint, to: BreakerState) {
    counter!(
        "gateway_breaker_transitions_total",
        "endpoint" => endpoint.to_string(),
        "to" => to.as_str()
    )
    .increment(1);
}

pub fn record_probe(endpoint: &Endpoint, alive: bool) {
    gauge!("gateway_endpoint_up", "endpoint" => endpoint.to_string())
        .set(if alive { 1.0 } else { 0.0 });
}

pub fn record_registry_refresh(ok: bool, instances: usize) {
    counter!(
        "gateway_registry_refresh_total",
        "result" => if ok { "ok" } else { "error" }
    )
    .increment(1);
    if ok {
        gauge!("gateway_registry_instances").set(instances as f64);
    }
}
