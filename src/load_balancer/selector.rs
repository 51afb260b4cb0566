//! Instance selection with bounded retry and failover.
//!
//! # Responsibilities
//! - Resolve a logical service to its current endpoints
//! - Pick where a request's sweep starts (round-robin cursor or registry order)
//! - Drive the per-instance retry budget and fail over across instances
//! - Report every attempt so the router can log and record it
//!
//! # Design Decisions
//! - Sequential: one endpoint is exhausted before the next is considered
//! - A down endpoint is skipped without consuming retries
//! - Backend-reported errors end the request immediately, verbatim
//! - A sweep whose every forwarded attempt timed out surfaces as a timeout
//! - Each attempt needs a breaker permit; once an instance's breaker opens,
//!   its remaining retries are abandoned and the sweep moves on

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::discovery::RegistryCache;
use crate::error::GatewayError;
use crate::health::Liveness;
use crate::load_balancer::endpoint::{Endpoint, ServiceName};
use crate::load_balancer::round_robin::SelectionCursors;
use crate::proxy::{AttemptRecord, AttemptResult, Forwarded, RouteOutcome};
use crate::resilience::{failover_order, BreakerRegistry, EndpointOrdering, RetryPolicy};

/// Final outcome plus every attempt made to reach it.
#[derive(Debug, Clone)]
pub struct Selection {
    pub outcome: RouteOutcome,
    pub attempts: Vec<AttemptRecord>,
}

impl Selection {
    fn new(outcome: RouteOutcome, attempts: Vec<AttemptRecord>) -> Self {
        Self { outcome, attempts }
    }

    fn all_down(service: &ServiceName, last_error: GatewayError, attempts: Vec<AttemptRecord>) -> Self {
        Self::new(
            RouteOutcome::AllInstancesDown {
                service: service.clone(),
                last_error,
            },
            attempts,
        )
    }
}

/// Chooses endpoints for logical services.
pub struct InstanceSelector {
    cache: Arc<RegistryCache>,
    breakers: Arc<BreakerRegistry>,
    cursors: SelectionCursors,
}

impl InstanceSelector {
    pub fn new(cache: Arc<RegistryCache>, breakers: Arc<BreakerRegistry>) -> Self {
        Self {
            cache,
            breakers,
            cursors: SelectionCursors::new(),
        }
    }

    pub fn cache(&self) -> &Arc<RegistryCache> {
        &self.cache
    }

    pub fn breakers(&self) -> &Arc<BreakerRegistry> {
        &self.breakers
    }

    pub fn cursors(&self) -> &SelectionCursors {
        &self.cursors
    }

    /// Current endpoints of `service`, populating the cache on first use.
    async fn endpoints(&self, service: &ServiceName) -> Result<Arc<[Endpoint]>, GatewayError> {
        let snapshot = self.cache.ensure_populated().await?;
        let endpoints = snapshot.lookup(service.as_str());
        if endpoints.is_empty() {
            return Err(GatewayError::NoInstancesRegistered(service.clone()));
        }
        Ok(endpoints)
    }

    /// Run `attempt` against the endpoints of `service` until one answers.
    ///
    /// Success and backend-reported errors end the sweep. Timeouts and
    /// transport failures are retried on the same endpoint up to the policy's
    /// budget, then the next endpoint is tried. Exhausting every endpoint
    /// yields `Timeout` when each forwarded attempt timed out, otherwise
    /// `AllInstancesDown` carrying the last error seen.
    pub async fn select_and_retry<L, F, Fut>(
        &self,
        service: &ServiceName,
        policy: &RetryPolicy,
        liveness: &L,
        mut attempt: F,
    ) -> Selection
    where
        L: Liveness + ?Sized,
        F: FnMut(Endpoint) -> Fut,
        Fut: Future<Output = Forwarded>,
    {
        let mut attempts = Vec::new();
        let endpoints = match self.endpoints(service).await {
            Ok(endpoints) => endpoints,
            Err(e) => return Selection::all_down(service, e, attempts),
        };

        let start = match policy.ordering {
            EndpointOrdering::RegistryOrder => 0,
            EndpointOrdering::RoundRobin => self.cursors.advance(service, endpoints.len()).unwrap_or(0),
        };

        let mut last_error = GatewayError::NoInstancesRegistered(service.clone());
        let mut forwarded_count = 0usize;
        let mut timed_out: Option<(usize, Duration)> = None;
        for index in failover_order(endpoints.len(), start) {
            let endpoint = &endpoints[index];

            if !liveness.is_up(endpoint).await {
                tracing::warn!(service = %service, endpoint = %endpoint, "Endpoint is down, skipping");
                attempts.push(AttemptRecord {
                    endpoint: endpoint.clone(),
                    result: AttemptResult::Skipped,
                });
                last_error = GatewayError::EndpointDown(endpoint.clone());
                continue;
            }

            let breaker = self.breakers.get(endpoint);
            for attempt_no in 0..policy.max_attempts_per_instance {
                if attempt_no > 0 {
                    let delay = policy.backoff(attempt_no);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }

                let Ok(permit) = breaker.try_acquire() else {
                    tracing::debug!(endpoint = %endpoint, "Circuit open, abandoning retries on endpoint");
                    attempts.push(AttemptRecord {
                        endpoint: endpoint.clone(),
                        result: AttemptResult::Skipped,
                    });
                    // Keep the failure that tripped the breaker when there was one.
                    if attempt_no == 0 {
                        last_error = GatewayError::EndpointDown(endpoint.clone());
                    }
                    break;
                };

                let forwarded = attempt(endpoint.clone()).await;
                permit.report(forwarded.is_breaker_failure());
                attempts.push(AttemptRecord {
                    endpoint: endpoint.clone(),
                    result: AttemptResult::from(&forwarded),
                });
                forwarded_count += 1;
                if let Forwarded::Failed(GatewayError::Timeout { after, .. }) = &forwarded {
                    let seen = timed_out.map_or(0, |(n, _)| n);
                    timed_out = Some((seen + 1, *after));
                }

                match forwarded {
                    Forwarded::Success(reply) => {
                        return Selection::new(RouteOutcome::Success(reply), attempts);
                    }
                    Forwarded::UpstreamError(reply) => {
                        return Selection::new(RouteOutcome::UpstreamError(reply), attempts);
                    }
                    Forwarded::Failed(e) => {
                        tracing::warn!(
                            service = %service,
                            endpoint = %endpoint,
                            attempt = attempt_no + 1,
                            error = %e,
                            "Attempt failed"
                        );
                        last_error = e;
                    }
                }
            }
        }

        if let Some((count, after)) = timed_out {
            if count == forwarded_count {
                tracing::error!(service = %service, error = %last_error, "Every attempt timed out");
                return Selection::new(RouteOutcome::Timeout { after }, attempts);
            }
        }

        tracing::error!(service = %service, error = %last_error, "All instances are down");
        Selection::all_down(service, last_error, attempts)
    }

    /// One direct attempt against the service's canonical (first) endpoint.
    ///
    /// The cursor and liveness probe are bypassed; the breaker still gates
    /// and records the call. A timeout is surfaced as such.
    pub async fn attempt_single<F, Fut>(&self, service: &ServiceName, attempt: F) -> Selection
    where
        F: FnOnce(Endpoint) -> Fut,
        Fut: Future<Output = Forwarded>,
    {
        let mut attempts = Vec::new();
        let endpoint = match self.endpoints(service).await {
            Ok(endpoints) => endpoints[0].clone(),
            Err(e) => return Selection::all_down(service, e, attempts),
        };

        let Ok(permit) = self.breakers.get(&endpoint).try_acquire() else {
            tracing::warn!(service = %service, endpoint = %endpoint, "Circuit open, rejecting request");
            attempts.push(AttemptRecord {
                endpoint: endpoint.clone(),
                result: AttemptResult::Skipped,
            });
            return Selection::all_down(service, GatewayError::EndpointDown(endpoint), attempts);
        };

        let forwarded = attempt(endpoint.clone()).await;
        permit.report(forwarded.is_breaker_failure());
        attempts.push(AttemptRecord {
            endpoint: endpoint.clone(),
            result: AttemptResult::from(&forwarded),
        });

        let outcome = match forwarded {
            Forwarded::Success(reply) => RouteOutcome::Success(reply),
            Forwarded::UpstreamError(reply) => RouteOutcome::UpstreamError(reply),
            Forwarded::Failed(GatewayError::Timeout { after, .. }) => {
                tracing::warn!(service = %service, endpoint = %endpoint, "Request timed out");
                RouteOutcome::Timeout { after }
            }
            Forwarded::Failed(e) => {
                tracing::warn!(service = %service, endpoint = %endpoint, error = %e, "Request failed");
                RouteOutcome::AllInstancesDown {
                    service: service.clone(),
                    last_error: e,
                }
            }
        };
        Selection::new(outcome, attempts)
    }
}
