//! Gateway error taxonomy.

use std::time::Duration;

use thiserror::Error;

use crate::load_balancer::endpoint::{Endpoint, ServiceName};

/// Errors produced while routing a request to a backend.
///
/// Callers see these only wrapped in a timeout or an `AllInstancesDown`
/// outcome; backend-reported errors are mirrored and never become one.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Registry query failed; the cached snapshot keeps serving.
    #[error("service registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// Registry knows no instance of the service.
    #[error("no instances registered for {0}")]
    NoInstancesRegistered(ServiceName),

    /// Breaker open or liveness probe failed.
    #[error("endpoint {0} is down")]
    EndpointDown(Endpoint),

    /// Call did not complete within its deadline.
    #[error("request to {endpoint} timed out after {}ms", .after.as_millis())]
    Timeout { endpoint: Endpoint, after: Duration },

    /// Connection refused, reset, malformed reply, etc.
    #[error("transport error contacting {endpoint}: {message}")]
    Transport { endpoint: Endpoint, message: String },

    /// Every viable endpoint was tried without success.
    #[error("all instances of {service} are down: {last_error}")]
    AllInstancesDown {
        service: ServiceName,
        last_error: Box<GatewayError>,
    },
}

impl GatewayError {
    /// Endpoint the error is attributed to, if any.
    pub fn endpoint(&self) -> Option<&Endpoint> {
        match self {
            GatewayError::EndpointDown(endpoint)
            | GatewayError::Timeout { endpoint, .. }
            | GatewayError::Transport { endpoint, .. } => Some(endpoint),
            GatewayError::AllInstancesDown { last_error, .. } => last_error.endpoint(),
            GatewayError::RegistryUnavailable(_) | GatewayError::NoInstancesRegistered(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_instances_down_references_last_endpoint() {
        let last = Endpoint::new("session_service3", 5001);
        let err = GatewayError::AllInstancesDown {
            service: "session_service".into(),
            last_error: Box::new(GatewayError::Transport {
                endpoint: last.clone(),
                message: "connection refused".into(),
            }),
        };
        assert_eq!(err.endpoint(), Some(&last));
        assert!(err.to_string().contains("session_service3:5001"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_timeout_message() {
        let err = GatewayError::Timeout {
            endpoint: Endpoint::new("auth_service", 5000),
            after: Duration::from_millis(3000),
        };
        assert_eq!(err.to_string(), "request to auth_service:5000 timed out after 3000ms");
    }
}
