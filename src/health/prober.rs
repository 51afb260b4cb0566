//! Single-endpoint liveness probe.
//!
//! # Responsibilities
//! - Issue one GET to an endpoint's health path under a fixed timeout
//! - Classify the endpoint as alive or not, keeping the reason

use std::fmt;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request};

use crate::load_balancer::endpoint::Endpoint;
use crate::proxy::UpstreamClient;
use crate::resilience::with_timeout;

/// Largest health response body kept for status reporting.
const MAX_PROBE_BODY: usize = 64 * 1024;

/// Why a probe concluded what it did.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeDetail {
    /// 2xx; the body is kept when it is JSON.
    Healthy {
        status: u16,
        response: Option<serde_json::Value>,
    },
    /// Non-success status.
    Status(u16),
    Timeout(Duration),
    Unreachable(String),
    /// Breaker open; the endpoint was not contacted.
    CircuitOpen,
}

impl fmt::Display for ProbeDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeDetail::Healthy { status, .. } => write!(f, "healthy ({status})"),
            ProbeDetail::Status(status) => write!(f, "non-success status {status}"),
            ProbeDetail::Timeout(after) => write!(f, "timed out after {}ms", after.as_millis()),
            ProbeDetail::Unreachable(e) => write!(f, "unreachable: {e}"),
            ProbeDetail::CircuitOpen => f.write_str("circuit open"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub alive: bool,
    pub detail: ProbeDetail,
}

impl ProbeResult {
    pub fn down(detail: ProbeDetail) -> Self {
        Self {
            alive: false,
            detail,
        }
    }

    /// JSON health body, when the endpoint returned one.
    pub fn response(&self) -> Option<&serde_json::Value> {
        match &self.detail {
            ProbeDetail::Healthy { response, .. } => response.as_ref(),
            _ => None,
        }
    }
}

/// Issues liveness requests.
#[derive(Debug, Clone)]
pub struct HealthProber {
    client: UpstreamClient,
    path: String,
    timeout: Duration,
}

impl HealthProber {
    pub fn new(client: UpstreamClient, path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            path: path.into(),
            timeout,
        }
    }

    /// Probe `endpoint`. Never fails; every problem is a `down` result.
    pub async fn probe(&self, endpoint: &Endpoint) -> ProbeResult {
        let request = match Request::builder()
            .method(Method::GET)
            .uri(endpoint.url_for(&self.path))
            .header("user-agent", "game-gateway-health-check")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(endpoint = %endpoint, error = %e, "Failed to build health check request");
                return ProbeResult::down(ProbeDetail::Unreachable(e.to_string()));
            }
        };

        let exchange = async {
            let response = self.client.request(request).await.map_err(|e| e.to_string())?;
            let status = response.status();
            if !status.is_success() {
                return Ok(ProbeResult::down(ProbeDetail::Status(status.as_u16())));
            }
            let body = axum::body::to_bytes(Body::new(response.into_body()), MAX_PROBE_BODY)
                .await
                .ok();
            let response = body.and_then(|b| serde_json::from_slice(&b).ok());
            Ok::<_, String>(ProbeResult {
                alive: true,
                detail: ProbeDetail::Healthy {
                    status: status.as_u16(),
                    response,
                },
            })
        };

        let result = match with_timeout(self.timeout, exchange).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => ProbeResult::down(ProbeDetail::Unreachable(e)),
            Err(elapsed) => ProbeResult::down(ProbeDetail::Timeout(elapsed.after)),
        };

        if !result.alive {
            tracing::warn!(endpoint = %endpoint, detail = %result.detail, "Health check failed");
        }
        result
    }
}
