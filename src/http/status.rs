//! Gateway status aggregation.
//!
//! Probes every registered instance concurrently and reports per-instance
//! state plus aggregate counts.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use futures_util::future::join_all;
use serde::Serialize;

use crate::discovery::ServiceInstance;
use crate::error::GatewayError;
use crate::http::response::error_response;
use crate::load_balancer::ServiceName;
use crate::resilience::BreakerState;
use crate::routing::{GatewayContext, GatewayRouter};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub total_services: usize,
    pub operational_services: usize,
    pub service_details: Vec<InstanceStatus>,
    pub message: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceStatus {
    pub name: ServiceName,
    pub instance_id: String,
    pub address: String,
    pub port: u16,
    /// "up" or "down".
    pub status: &'static str,
    pub breaker: BreakerState,
    /// Health body returned by the instance, `{}` when none.
    pub response: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Probe every instance in the current snapshot.
pub async fn collect_status(ctx: &GatewayContext) -> Result<StatusReport, GatewayError> {
    let snapshot = ctx.cache.ensure_populated().await?;
    let checks = snapshot.instances().iter().map(|instance| check_instance(ctx, instance));
    let service_details = join_all(checks).await;
    let operational_services = service_details.iter().filter(|s| s.status == "up").count();

    Ok(StatusReport {
        total_services: service_details.len(),
        operational_services,
        service_details,
        message: "Gateway health check complete",
    })
}

async fn check_instance(ctx: &GatewayContext, instance: &ServiceInstance) -> InstanceStatus {
    let endpoint = instance.endpoint();
    let probe = ctx.prober.check(&endpoint).await;

    InstanceStatus {
        name: instance.service.clone(),
        instance_id: instance.id.clone(),
        address: instance.address.clone(),
        port: instance.port,
        status: if probe.alive { "up" } else { "down" },
        breaker: ctx.breakers.state_of(&endpoint),
        response: probe
            .response()
            .cloned()
            .unwrap_or_else(|| serde_json::json!({})),
        detail: (!probe.alive).then(|| probe.detail.to_string()),
    }
}

/// `GET /status`
pub async fn status_handler(State(router): State<GatewayRouter>) -> Response {
    match collect_status(router.context()).await {
        Ok(report) => {
            tracing::debug!(
                total = report.total_services,
                operational = report.operational_services,
                "Status check complete"
            );
            Json(report).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Status check failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error checking gateway health", e)
        }
    }
}
