//! Gateway router: binds routes to the selection machinery.
//!
//! # Responsibilities
//! - Own the gateway context (registry cache, breakers, cursors, clients)
//! - Run one logical route to completion under its retry policy
//! - Hand a per-request report to metrics and logs
//!
//! # Design Decisions
//! - All shared state lives in one context object; no globals, so several
//!   gateways (or tests) can run side by side in one process
//! - The router never renders HTTP; it returns a `RouteOutcome`

use std::sync::Arc;
use std::time::{Duration, Instant};

use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use tracing::Instrument;

use crate::config::GatewayConfig;
use crate::discovery::{RegistryCache, RegistryRefresher, ServiceRegistry};
use crate::health::{GuardedProber, HealthProber};
use crate::load_balancer::endpoint::{Endpoint, ServiceName};
use crate::load_balancer::InstanceSelector;
use crate::observability::{metrics, tracing::route_span};
use crate::proxy::{AttemptRecord, OutboundRequest, RequestForwarder, RouteOutcome, UpstreamClient};
use crate::resilience::BreakerRegistry;
use crate::routing::table::RouteSpec;

/// What one routed request did, for the observability collaborator.
#[derive(Debug, Clone)]
pub struct RouteReport {
    pub route: &'static str,
    pub service: ServiceName,
    pub attempts: Vec<AttemptRecord>,
    pub outcome: &'static str,
    pub elapsed: Duration,
}

impl RouteReport {
    fn log(&self) {
        let tried = self
            .attempts
            .iter()
            .map(|a| format!("{}:{}", a.endpoint, a.result.label()))
            .collect::<Vec<_>>()
            .join(",");
        match self.outcome {
            "success" | "upstream_error" => tracing::info!(
                route = self.route,
                service = %self.service,
                outcome = self.outcome,
                attempts = %tried,
                elapsed_ms = self.elapsed.as_millis() as u64,
                "Request routed"
            ),
            _ => tracing::warn!(
                route = self.route,
                service = %self.service,
                outcome = self.outcome,
                attempts = %tried,
                elapsed_ms = self.elapsed.as_millis() as u64,
                "Request failed"
            ),
        }
    }
}

/// Shared gateway state.
pub struct GatewayContext {
    pub config: GatewayConfig,
    pub cache: Arc<RegistryCache>,
    pub breakers: Arc<BreakerRegistry>,
    pub selector: InstanceSelector,
    pub prober: GuardedProber,
    pub forwarder: RequestForwarder,
}

impl GatewayContext {
    pub fn new(config: GatewayConfig, registry: Arc<dyn ServiceRegistry>) -> Self {
        let client: UpstreamClient = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let cache = Arc::new(RegistryCache::new(registry, config.registry.query_timeout()));
        let breakers = Arc::new(BreakerRegistry::new(config.circuit_breaker.clone()));
        let selector = InstanceSelector::new(cache.clone(), breakers.clone());
        let prober = GuardedProber::new(
            HealthProber::new(client.clone(), config.health.path.clone(), config.health.timeout()),
            breakers.clone(),
        );
        let forwarder = RequestForwarder::new(
            client,
            config.forwarding.timeout(),
            config.forwarding.max_response_bytes,
        );

        Self {
            config,
            cache,
            breakers,
            selector,
            prober,
            forwarder,
        }
    }
}

/// Routes logical operations to backend instances.
#[derive(Clone)]
pub struct GatewayRouter {
    ctx: Arc<GatewayContext>,
}

impl GatewayRouter {
    pub fn new(config: GatewayConfig, registry: Arc<dyn ServiceRegistry>) -> Self {
        Self {
            ctx: Arc::new(GatewayContext::new(config, registry)),
        }
    }

    pub fn context(&self) -> &GatewayContext {
        &self.ctx
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.ctx.config
    }

    /// Background task keeping the registry cache fresh.
    pub fn refresher(&self) -> RegistryRefresher {
        RegistryRefresher::new(
            self.ctx.cache.clone(),
            self.ctx.breakers.clone(),
            self.ctx.config.registry.poll_interval(),
        )
    }

    /// Route `request` as the operation `spec`.
    pub async fn route(&self, spec: &RouteSpec, request: OutboundRequest) -> RouteOutcome {
        let service = spec.service.service_name(&self.ctx.config.services);
        let span = route_span(request.request_id.as_deref().unwrap_or("-"), spec.name, &service);

        async move {
            let started = Instant::now();
            let forwarder = &self.ctx.forwarder;
            let request = &request;
            let attempt = |endpoint: Endpoint| async move { forwarder.forward(&endpoint, request).await };

            let selection = match spec.retry_policy(&self.ctx.config.retries) {
                Some(policy) => {
                    self.ctx
                        .selector
                        .select_and_retry(&service, &policy, &self.ctx.prober, attempt)
                        .await
                }
                None => self.ctx.selector.attempt_single(&service, attempt).await,
            };

            let report = RouteReport {
                route: spec.name,
                service,
                attempts: selection.attempts,
                outcome: selection.outcome.label(),
                elapsed: started.elapsed(),
            };
            metrics::record_route(&report);
            report.log();
            selection.outcome
        }
        .instrument(span)
        .await
    }
}
