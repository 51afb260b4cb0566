//! Registry cache.
//!
//! # Responsibilities
//! - Hold the latest registry snapshot (service name → ordered endpoints)
//! - Replace it atomically on each successful poll
//! - Keep serving the previous snapshot when a poll fails
//! - Poll on a fixed interval in a cancellable background task

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::{broadcast, Mutex};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::discovery::registry::{ServiceInstance, ServiceRegistry};
use crate::error::GatewayError;
use crate::load_balancer::endpoint::{Endpoint, ServiceName};
use crate::observability::metrics;
use crate::resilience::{with_timeout, BreakerRegistry};

/// Immutable view of the registry at one point in time.
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    services: HashMap<ServiceName, Arc<[Endpoint]>>,
    /// All instances, ordered by (service, instance id).
    instances: Vec<ServiceInstance>,
    refreshed_at: Option<Instant>,
}

impl RegistrySnapshot {
    /// Build a snapshot, ordering each service's instances by instance id so
    /// "registry order" does not depend on the backend's map iteration order.
    pub fn from_instances(mut instances: Vec<ServiceInstance>) -> Self {
        instances.sort_by(|a, b| a.service.cmp(&b.service).then_with(|| a.id.cmp(&b.id)));

        let mut grouped: HashMap<ServiceName, Vec<Endpoint>> = HashMap::new();
        for instance in &instances {
            grouped
                .entry(instance.service.clone())
                .or_default()
                .push(instance.endpoint());
        }

        Self {
            services: grouped
                .into_iter()
                .map(|(name, endpoints)| (name, Arc::from(endpoints)))
                .collect(),
            instances,
            refreshed_at: Some(Instant::now()),
        }
    }

    /// Endpoints of `service` in registry order; empty when none are known.
    pub fn lookup(&self, service: &str) -> Arc<[Endpoint]> {
        self.services
            .get(service)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// Whether the registry knows `service` at all.
    pub fn contains(&self, service: &str) -> bool {
        self.services.contains_key(service)
    }

    pub fn instances(&self) -> &[ServiceInstance] {
        &self.instances
    }

    pub fn endpoints(&self) -> HashSet<Endpoint> {
        self.instances.iter().map(ServiceInstance::endpoint).collect()
    }

    /// `false` until the first successful poll.
    pub fn is_populated(&self) -> bool {
        self.refreshed_at.is_some()
    }

    pub fn refreshed_at(&self) -> Option<Instant> {
        self.refreshed_at
    }
}

/// Eventually-consistent, in-memory copy of the service registry.
pub struct RegistryCache {
    registry: Arc<dyn ServiceRegistry>,
    snapshot: ArcSwap<RegistrySnapshot>,
    query_timeout: Duration,
    populate_lock: Mutex<()>,
}

impl RegistryCache {
    pub fn new(registry: Arc<dyn ServiceRegistry>, query_timeout: Duration) -> Self {
        Self {
            registry,
            snapshot: ArcSwap::from_pointee(RegistrySnapshot::default()),
            query_timeout,
            populate_lock: Mutex::new(()),
        }
    }

    /// Current snapshot. Never blocks on an in-flight refresh.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot.load_full()
    }

    /// Endpoints for `service` from the current snapshot.
    pub fn lookup(&self, service: &str) -> Arc<[Endpoint]> {
        self.snapshot.load().lookup(service)
    }

    /// Query the registry and swap in a new snapshot.
    ///
    /// On failure the previous snapshot stays in place.
    pub async fn refresh(&self) -> Result<Arc<RegistrySnapshot>, GatewayError> {
        let listed = with_timeout(self.query_timeout, self.registry.list_services())
            .await
            .map_err(|e| e.to_string())
            .and_then(|res| res.map_err(|e| e.to_string()));

        match listed {
            Ok(instances) => {
                let snapshot = Arc::new(RegistrySnapshot::from_instances(instances));
                self.snapshot.store(snapshot.clone());
                metrics::record_registry_refresh(true, snapshot.instances().len());
                tracing::debug!(
                    instances = snapshot.instances().len(),
                    services = snapshot.services.len(),
                    "Registry snapshot refreshed"
                );
                Ok(snapshot)
            }
            Err(message) => {
                metrics::record_registry_refresh(false, 0);
                tracing::error!(error = %message, "Registry refresh failed, keeping previous snapshot");
                Err(GatewayError::RegistryUnavailable(message))
            }
        }
    }

    /// Refresh synchronously if the cache has never been populated.
    ///
    /// Concurrent callers share one query.
    pub async fn ensure_populated(&self) -> Result<Arc<RegistrySnapshot>, GatewayError> {
        let current = self.snapshot();
        if current.is_populated() {
            return Ok(current);
        }

        let _guard = self.populate_lock.lock().await;
        let current = self.snapshot();
        if current.is_populated() {
            return Ok(current);
        }
        self.refresh().await
    }
}

/// Background task polling the registry on a fixed interval.
pub struct RegistryRefresher {
    cache: Arc<RegistryCache>,
    breakers: Arc<BreakerRegistry>,
    interval: Duration,
}

impl RegistryRefresher {
    pub fn new(cache: Arc<RegistryCache>, breakers: Arc<BreakerRegistry>, interval: Duration) -> Self {
        Self {
            cache,
            breakers,
            interval,
        }
    }

    /// Poll until `shutdown` fires.
    ///
    /// The first poll happens one interval after start; callers wanting an
    /// immediate refresh run [`RegistryRefresher::tick`] first.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Registry refresher starting");

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Registry refresher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// One refresh plus breaker garbage collection.
    pub async fn tick(&self) {
        if let Ok(snapshot) = self.cache.refresh().await {
            self.breakers.retain_known(&snapshot.endpoints());
        }
    }
}
