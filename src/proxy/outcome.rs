//! Caller-facing routing outcomes and per-attempt records.

use std::time::Duration;

use crate::error::GatewayError;
use crate::load_balancer::endpoint::{Endpoint, ServiceName};
use crate::proxy::forwarder::{Forwarded, UpstreamReply};

/// Final result of routing one request.
#[derive(Debug, Clone)]
pub enum RouteOutcome {
    /// 2xx from the backend, mirrored as-is.
    Success(UpstreamReply),
    /// Backend-reported error, mirrored as-is.
    UpstreamError(UpstreamReply),
    /// The call hit its deadline (every forwarded attempt, on failover routes).
    Timeout { after: Duration },
    /// No viable endpoint produced an answer.
    AllInstancesDown {
        service: ServiceName,
        last_error: GatewayError,
    },
}

impl RouteOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RouteOutcome::Success(_) => "success",
            RouteOutcome::UpstreamError(_) => "upstream_error",
            RouteOutcome::Timeout { .. } => "timeout",
            RouteOutcome::AllInstancesDown { .. } => "all_instances_down",
        }
    }
}

/// What happened on one attempt against one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptResult {
    Success,
    UpstreamError(u16),
    Timeout,
    TransportError,
    /// Breaker open or liveness probe failed; the endpoint was not called.
    Skipped,
}

impl AttemptResult {
    pub fn label(&self) -> &'static str {
        match self {
            AttemptResult::Success => "success",
            AttemptResult::UpstreamError(_) => "upstream_error",
            AttemptResult::Timeout => "timeout",
            AttemptResult::TransportError => "transport_error",
            AttemptResult::Skipped => "skipped",
        }
    }
}

impl From<&Forwarded> for AttemptResult {
    fn from(forwarded: &Forwarded) -> Self {
        match forwarded {
            Forwarded::Success(_) => AttemptResult::Success,
            Forwarded::UpstreamError(reply) => AttemptResult::UpstreamError(reply.status.as_u16()),
            Forwarded::Failed(GatewayError::Timeout { .. }) => AttemptResult::Timeout,
            Forwarded::Failed(_) => AttemptResult::TransportError,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub endpoint: Endpoint,
    pub result: AttemptResult,
}
