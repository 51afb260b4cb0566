//! Consul agent HTTP API client.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::discovery::registry::{RegistryError, ServiceInstance, ServiceRegistry};
use crate::load_balancer::endpoint::ServiceName;

/// Entry of `GET /v1/agent/services`.
#[derive(Debug, Deserialize)]
struct AgentService {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Service")]
    service: String,
    #[serde(rename = "Address", default)]
    address: String,
    #[serde(rename = "Port", default)]
    port: u16,
}

/// Body of `PUT /v1/agent/service/register`.
#[derive(Debug, Serialize)]
struct Registration<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "ID")]
    id: &'a str,
    #[serde(rename = "Address")]
    address: &'a str,
    #[serde(rename = "Port")]
    port: u16,
}

/// Registry backed by a Consul agent.
#[derive(Debug, Clone)]
pub struct ConsulRegistry {
    base: Url,
    client: reqwest::Client,
    timeout: Duration,
}

impl ConsulRegistry {
    pub fn new(address: &str, timeout: Duration) -> Result<Self, RegistryError> {
        let base = Url::parse(address).map_err(|e| RegistryError::Request(e.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RegistryError::Request(e.to_string()))?;
        Ok(Self {
            base,
            client,
            timeout,
        })
    }

    fn url(&self, path: &str) -> Result<Url, RegistryError> {
        self.base
            .join(path)
            .map_err(|e| RegistryError::Request(e.to_string()))
    }

    fn map_err(&self, e: reqwest::Error) -> RegistryError {
        if e.is_timeout() {
            RegistryError::Timeout(self.timeout)
        } else if e.is_decode() {
            RegistryError::Decode(e.to_string())
        } else {
            RegistryError::Request(e.to_string())
        }
    }

    fn check_status(res: &reqwest::Response) -> Result<(), RegistryError> {
        let status = res.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(RegistryError::Status(status.as_u16()))
        }
    }
}

#[async_trait]
impl ServiceRegistry for ConsulRegistry {
    async fn list_services(&self) -> Result<Vec<ServiceInstance>, RegistryError> {
        let res = self
            .client
            .get(self.url("/v1/agent/services")?)
            .send()
            .await
            .map_err(|e| self.map_err(e))?;
        Self::check_status(&res)?;

        let services: HashMap<String, AgentService> =
            res.json().await.map_err(|e| self.map_err(e))?;

        Ok(services
            .into_values()
            .map(|s| ServiceInstance {
                service: ServiceName::new(s.service),
                id: s.id,
                address: s.address,
                port: s.port,
            })
            .collect())
    }

    async fn register_service(&self, instance: &ServiceInstance) -> Result<(), RegistryError> {
        let body = Registration {
            name: instance.service.as_str(),
            id: &instance.id,
            address: &instance.address,
            port: instance.port,
        };
        let res = self
            .client
            .put(self.url("/v1/agent/service/register")?)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_err(e))?;
        Self::check_status(&res)?;

        tracing::info!(service = %instance.service, id = %instance.id, "Registered with Consul");
        Ok(())
    }

    async fn deregister_service(&self, instance_id: &str) -> Result<(), RegistryError> {
        let res = self
            .client
            .put(self.url(&format!("/v1/agent/service/deregister/{instance_id}"))?)
            .send()
            .await
            .map_err(|e| self.map_err(e))?;
        if res.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::InstanceNotFound(instance_id.to_string()));
        }
        Self::check_status(&res)?;

        tracing::info!(id = %instance_id, "Deregistered from Consul");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_agent_services() {
        let body = r#"{
            "session_service_1": {"ID": "session_service_1", "Service": "session_service", "Address": "session_service1", "Port": 5001, "Tags": []},
            "auth_service_1": {"ID": "auth_service_1", "Service": "auth_service", "Address": "auth_service", "Port": 5000}
        }"#;
        let parsed: HashMap<String, AgentService> = serde_json::from_str(body).unwrap();
        let session = &parsed["session_service_1"];
        assert_eq!(session.service, "session_service");
        assert_eq!(session.address, "session_service1");
        assert_eq!(session.port, 5001);
    }

    #[test]
    fn test_registration_body_uses_consul_field_names() {
        let body = Registration {
            name: "auth_service",
            id: "auth_service_1",
            address: "auth_service",
            port: 5000,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"Name": "auth_service", "ID": "auth_service_1", "Address": "auth_service", "Port": 5000})
        );
    }

    #[test]
    fn test_rejects_bad_address() {
        assert!(ConsulRegistry::new("not a url", Duration::from_secs(1)).is_err());
    }
}
