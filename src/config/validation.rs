//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, thresholds in range)
//! - Check the static registry is usable and instance ids are unique
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{GatewayConfig, InstanceConfig, RegistryKind};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("circuit_breaker.error_threshold_percentage must be within 1..=100, got {0}")]
    ThresholdOutOfRange(u8),

    #[error("invalid address for {field}: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("static registry has no services configured")]
    EmptyStaticRegistry,

    #[error("duplicate instance id in {field}: {id}")]
    DuplicateInstanceId { field: &'static str, id: String },

    #[error("instance {id} in {field} has an empty name or address")]
    IncompleteInstance { field: &'static str, id: String },

    #[error("health.path must start with '/', got {0}")]
    RelativeHealthPath(String),
}

/// Validate a parsed configuration, collecting every error found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    let nonzero: [(&'static str, u64); 8] = [
        ("listener.max_body_bytes", config.listener.max_body_bytes as u64),
        ("registry.poll_interval_secs", config.registry.poll_interval_secs),
        ("registry.query_timeout_secs", config.registry.query_timeout_secs),
        ("health.timeout_secs", config.health.timeout_secs),
        ("circuit_breaker.reset_timeout_ms", config.circuit_breaker.reset_timeout_ms),
        ("circuit_breaker.rolling_window_secs", config.circuit_breaker.rolling_window_secs),
        ("forwarding.timeout_ms", config.forwarding.timeout_ms),
        ("retries.max_attempts_per_instance", config.retries.max_attempts_per_instance as u64),
    ];
    for (field, value) in nonzero {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.request_secs" });
    }

    let pct = config.circuit_breaker.error_threshold_percentage;
    if pct == 0 || pct > 100 {
        errors.push(ValidationError::ThresholdOutOfRange(pct));
    }

    if !config.health.path.starts_with('/') {
        errors.push(ValidationError::RelativeHealthPath(config.health.path.clone()));
    }

    match config.registry.kind {
        RegistryKind::Consul => {
            if url::Url::parse(&config.registry.consul_address).is_err() {
                errors.push(ValidationError::InvalidAddress {
                    field: "registry.consul_address",
                    value: config.registry.consul_address.clone(),
                });
            }
        }
        RegistryKind::Static => {
            if config.registry.services.is_empty() {
                errors.push(ValidationError::EmptyStaticRegistry);
            }
        }
    }

    check_instances("registry.services", &config.registry.services, &mut errors);
    check_instances(
        "registry.register_on_startup",
        &config.registry.register_on_startup,
        &mut errors,
    );

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_instances(
    field: &'static str,
    instances: &[InstanceConfig],
    errors: &mut Vec<ValidationError>,
) {
    let mut seen = HashSet::new();
    for instance in instances {
        if !seen.insert(instance.id.as_str()) {
            errors.push(ValidationError::DuplicateInstanceId {
                field,
                id: instance.id.clone(),
            });
        }
        if instance.name.is_empty() || instance.address.is_empty() {
            errors.push(ValidationError::IncompleteInstance {
                field,
                id: instance.id.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(id: &str) -> InstanceConfig {
        InstanceConfig {
            name: "session_service".into(),
            id: id.into(),
            address: "127.0.0.1".into(),
            port: 5001,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GatewayConfig::default();
        config.registry.kind = RegistryKind::Static;
        config.forwarding.timeout_ms = 0;
        config.circuit_breaker.error_threshold_percentage = 150;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::EmptyStaticRegistry));
        assert!(errors.contains(&ValidationError::Zero { field: "forwarding.timeout_ms" }));
        assert!(errors.contains(&ValidationError::ThresholdOutOfRange(150)));
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_duplicate_instance_ids() {
        let mut config = GatewayConfig::default();
        config.registry.kind = RegistryKind::Static;
        config.registry.services = vec![instance("s1"), instance("s1"), instance("s2")];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::DuplicateInstanceId {
                field: "registry.services",
                id: "s1".into()
            }]
        );
    }
}
