//! Service discovery subsystem.
//!
//! # Data Flow
//! ```text
//! Background refresher (every poll interval) / first request
//!     → registry.rs (ServiceRegistry::list_services)
//!         - consul.rs (Consul agent HTTP API)
//!         - static_registry.rs (configured instances)
//!     → cache.rs (build RegistrySnapshot, atomic swap)
//!
//! Request path:
//!     → cache.rs lookup(service) → ordered endpoints (possibly stale)
//! ```
//!
//! # Design Decisions
//! - Snapshot replacement is a single pointer swap (readers never see a mix)
//! - Failed polls keep the previous snapshot; lookups never fail
//! - Empty endpoint list is distinct from an unknown service

pub mod cache;
pub mod consul;
pub mod registry;
pub mod static_registry;

use std::sync::Arc;

use crate::config::{RegistryConfig, RegistryKind};

pub use cache::{RegistryCache, RegistryRefresher, RegistrySnapshot};
pub use consul::ConsulRegistry;
pub use registry::{RegistryError, ServiceInstance, ServiceRegistry};
pub use static_registry::StaticRegistry;

/// Build the registry backend selected by configuration.
pub fn registry_from_config(config: &RegistryConfig) -> Result<Arc<dyn ServiceRegistry>, RegistryError> {
    match config.kind {
        RegistryKind::Consul => Ok(Arc::new(ConsulRegistry::new(
            &config.consul_address,
            config.query_timeout(),
        )?)),
        RegistryKind::Static => Ok(Arc::new(StaticRegistry::new(
            config.services.iter().map(ServiceInstance::from).collect(),
        ))),
    }
}
