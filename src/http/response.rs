//! Response rendering.
//!
//! # Responsibilities
//! - Mirror backend responses (status, content type, body) unchanged
//! - Map gateway-generated outcomes to status codes and JSON bodies
//!
//! # Design Decisions
//! - Backend-reported errors are never reinterpreted
//! - Timeouts result in 504 Gateway Timeout
//! - Exhausted instances and registry failures result in 500

use std::fmt;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::proxy::{RouteOutcome, UpstreamReply};
use crate::routing::{RoutePolicy, RouteSpec};

/// Render the outcome of routing `route`.
pub fn render(route: &RouteSpec, outcome: RouteOutcome) -> Response {
    match outcome {
        RouteOutcome::Success(reply) | RouteOutcome::UpstreamError(reply) => mirror(reply),
        RouteOutcome::Timeout { after } => (
            StatusCode::GATEWAY_TIMEOUT,
            Json(json!({
                "message": format!("Request to {} timed out after {}.", route.target, describe(after)),
            })),
        )
            .into_response(),
        RouteOutcome::AllInstancesDown {
            service,
            last_error,
        } => {
            let message = match route.policy {
                RoutePolicy::Single => format!("Error {}", route.action),
                RoutePolicy::Failover { .. } => {
                    format!("Error {}, all instances of {} are down", route.action, service)
                }
            };
            error_response(StatusCode::INTERNAL_SERVER_ERROR, message, last_error)
        }
    }
}

/// `{"message": ..., "error": ...}` body with the given status.
pub fn error_response(status: StatusCode, message: impl Into<String>, error: impl fmt::Display) -> Response {
    (
        status,
        Json(json!({
            "message": message.into(),
            "error": error.to_string(),
        })),
    )
        .into_response()
}

fn mirror(reply: UpstreamReply) -> Response {
    let mut response = Response::new(Body::from(reply.body));
    *response.status_mut() = reply.status;
    if let Some(content_type) = reply.content_type {
        response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }
    response
}

/// "3 seconds", "1 second", "2500 ms".
fn describe(after: Duration) -> String {
    let ms = after.as_millis();
    match ms {
        1000 => "1 second".to_string(),
        ms if ms % 1000 == 0 => format!("{} seconds", ms / 1000),
        ms => format!("{ms} ms"),
    }
}
