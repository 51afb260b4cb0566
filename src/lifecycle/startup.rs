//! Startup registration and shutdown deregistration.
//!
//! # Responsibilities
//! - Register the configured instances with the registry at startup
//! - Deregister exactly those instances on the way out
//!
//! # Design Decisions
//! - Registration failures are logged, never fatal: the gateway can still
//!   route to whatever the registry already knows

use std::sync::Arc;

use crate::config::InstanceConfig;
use crate::discovery::{ServiceInstance, ServiceRegistry};

/// Instances this process registered and must clean up.
pub struct Registrations {
    registry: Arc<dyn ServiceRegistry>,
    registered: Vec<ServiceInstance>,
}

impl Registrations {
    /// Register every instance in `instances`.
    pub async fn register_all(registry: Arc<dyn ServiceRegistry>, instances: &[InstanceConfig]) -> Self {
        let mut registered = Vec::with_capacity(instances.len());
        for config in instances {
            let instance = ServiceInstance::from(config);
            match registry.register_service(&instance).await {
                Ok(()) => {
                    tracing::info!(
                        service = %instance.service,
                        id = %instance.id,
                        endpoint = %instance.endpoint(),
                        "Registered instance"
                    );
                    registered.push(instance);
                }
                Err(e) => tracing::error!(
                    service = %instance.service,
                    id = %instance.id,
                    error = %e,
                    "Failed to register instance"
                ),
            }
        }
        Self { registry, registered }
    }

    pub fn registered(&self) -> &[ServiceInstance] {
        &self.registered
    }

    /// Deregister everything registered at startup.
    pub async fn deregister_all(self) {
        for instance in &self.registered {
            match self.registry.deregister_service(&instance.id).await {
                Ok(()) => tracing::info!(id = %instance.id, "Deregistered instance"),
                Err(e) => tracing::warn!(id = %instance.id, error = %e, "Failed to deregister instance"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::StaticRegistry;

    fn instance(id: &str) -> InstanceConfig {
        InstanceConfig {
            name: "session_service".into(),
            id: id.into(),
            address: "10.0.0.1".into(),
            port: 5001,
        }
    }

    #[tokio::test]
    async fn test_register_then_deregister_round_trip() {
        let registry = Arc::new(StaticRegistry::default());
        let registrations =
            Registrations::register_all(registry.clone(), &[instance("s1"), instance("s2")]).await;

        assert_eq!(registrations.registered().len(), 2);
        assert_eq!(registry.list_services().await.unwrap().len(), 2);

        registrations.deregister_all().await;
        assert!(registry.list_services().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_only_registered_instances_are_deregistered() {
        let registry = Arc::new(StaticRegistry::new(vec![ServiceInstance::from(&instance("existing"))]));
        let registrations = Registrations::register_all(registry.clone(), &[instance("mine")]).await;
        registrations.deregister_all().await;

        let remaining = registry.list_services().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "existing");
    }
}
