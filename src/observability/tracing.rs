//! Request spans.
//!
//! # Responsibilities
//! - Create one span per routed request carrying its correlation fields
//!
//! # Design Decisions
//! - Request ID comes from the `x-request-id` header set at the edge
//! - Endpoint-level events nest inside the request span

use ::tracing::Span;

use crate::load_balancer::endpoint::ServiceName;

/// Span wrapping the routing of one inbound request.
pub fn route_span(request_id: &str, route: &'static str, service: &ServiceName) -> Span {
    ::tracing::info_span!(
        "route",
        request_id = %request_id,
        route = route,
        service = %service,
    )
}
