//! Registry backend interface.
//!
//! # Responsibilities
//! - Define the read side (`list_services`) the cache polls
//! - Define the write side used once at startup/shutdown
//! - Convert registry entries to endpoints

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::InstanceConfig;
use crate::load_balancer::endpoint::{Endpoint, ServiceName};

/// One registered instance of a logical service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub service: ServiceName,
    pub id: String,
    pub address: String,
    pub port: u16,
}

impl ServiceInstance {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.address.clone(), self.port)
    }
}

impl From<&InstanceConfig> for ServiceInstance {
    fn from(config: &InstanceConfig) -> Self {
        Self {
            service: ServiceName::new(config.name.clone()),
            id: config.id.clone(),
            address: config.address.clone(),
            port: config.port,
        }
    }
}

/// Errors returned by registry backends.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("registry request failed: {0}")]
    Request(String),

    #[error("registry query timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("registry returned status {0}")]
    Status(u16),

    #[error("invalid registry response: {0}")]
    Decode(String),

    #[error("instance not found: {0}")]
    InstanceNotFound(String),
}

/// External service catalog.
///
/// Reads are eventually consistent with registrations; the gateway never
/// assumes a registration is visible on the next `list_services`.
#[async_trait]
pub trait ServiceRegistry: Send + Sync {
    /// Every currently registered instance, in no particular order.
    async fn list_services(&self) -> Result<Vec<ServiceInstance>, RegistryError>;

    async fn register_service(&self, instance: &ServiceInstance) -> Result<(), RegistryError>;

    async fn deregister_service(&self, instance_id: &str) -> Result<(), RegistryError>;
}
