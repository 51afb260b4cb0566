//! In-memory registry for static deployments and tests.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::discovery::registry::{RegistryError, ServiceInstance, ServiceRegistry};

/// Registry holding a fixed, mutable list of instances.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    instances: RwLock<Vec<ServiceInstance>>,
}

impl StaticRegistry {
    pub fn new(instances: Vec<ServiceInstance>) -> Self {
        Self {
            instances: RwLock::new(instances),
        }
    }
}

#[async_trait]
impl ServiceRegistry for StaticRegistry {
    async fn list_services(&self) -> Result<Vec<ServiceInstance>, RegistryError> {
        let instances = self
            .instances
            .read()
            .map_err(|_| RegistryError::Request("static registry lock poisoned".into()))?;
        Ok(instances.clone())
    }

    async fn register_service(&self, instance: &ServiceInstance) -> Result<(), RegistryError> {
        let mut instances = self
            .instances
            .write()
            .map_err(|_| RegistryError::Request("static registry lock poisoned".into()))?;
        instances.retain(|existing| existing.id != instance.id);
        instances.push(instance.clone());
        Ok(())
    }

    async fn deregister_service(&self, instance_id: &str) -> Result<(), RegistryError> {
        let mut instances = self
            .instances
            .write()
            .map_err(|_| RegistryError::Request("static registry lock poisoned".into()))?;
        let before = instances.len();
        instances.retain(|existing| existing.id != instance_id);
        if instances.len() == before {
            return Err(RegistryError::InstanceNotFound(instance_id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(id: &str, port: u16) -> ServiceInstance {
        ServiceInstance {
            service: "session_service".into(),
            id: id.into(),
            address: "127.0.0.1".into(),
            port,
        }
    }

    #[tokio::test]
    async fn test_register_replaces_same_id() {
        let registry = StaticRegistry::new(vec![instance("s1", 5001)]);
        registry.register_service(&instance("s1", 5002)).await.unwrap();
        registry.register_service(&instance("s2", 5003)).await.unwrap();

        let listed = registry.list_services().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().any(|i| i.id == "s1" && i.port == 5002));
    }

    #[tokio::test]
    async fn test_deregister_unknown() {
        let registry = StaticRegistry::default();
        let err = registry.deregister_service("nope").await.unwrap_err();
        assert!(matches!(err, RegistryError::InstanceNotFound(id) if id == "nope"));
    }
}
