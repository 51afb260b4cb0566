//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limits).
    pub listener: ListenerConfig,

    /// Service registry settings.
    pub registry: RegistryConfig,

    /// Logical service names used by the route table.
    pub services: ServicesConfig,

    /// Health probe settings.
    pub health: HealthConfig,

    /// Per-endpoint circuit breaker settings.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Upstream forwarding settings.
    pub forwarding: ForwardingConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Maximum inbound request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Which registry backend to read instances from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryKind {
    /// Consul agent HTTP API.
    Consul,
    /// Fixed list from `registry.services`.
    Static,
}

/// Service registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub kind: RegistryKind,

    /// Base URL of the Consul agent.
    pub consul_address: String,

    /// Interval between background refreshes in seconds.
    pub poll_interval_secs: u64,

    /// Deadline for a single registry query in seconds.
    pub query_timeout_secs: u64,

    /// Instances served by the static registry.
    pub services: Vec<InstanceConfig>,

    /// Instances registered at startup and deregistered at shutdown.
    pub register_on_startup: Vec<InstanceConfig>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            kind: RegistryKind::Consul,
            consul_address: "http://consul:8500".to_string(),
            poll_interval_secs: 10,
            query_timeout_secs: 3,
            services: Vec::new(),
            register_on_startup: Vec::new(),
        }
    }
}

impl RegistryConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

/// One registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InstanceConfig {
    /// Logical service name.
    pub name: String,

    /// Unique instance id.
    pub id: String,

    /// Hostname or IP.
    pub address: String,

    pub port: u16,
}

/// Logical service names.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Single-instance authentication service.
    pub auth: String,

    /// Replicated session service pool.
    pub session: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            auth: "auth_service".to_string(),
            session: "session_service".to_string(),
        }
    }
}

/// Health probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Path to probe on each endpoint.
    pub path: String,

    /// Probe timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            path: "/status".to_string(),
            timeout_secs: 3,
        }
    }
}

impl HealthConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Failure percentage over the rolling window that trips the breaker.
    pub error_threshold_percentage: u8,

    /// Cool-down spent in `open` before a half-open trial, in milliseconds.
    pub reset_timeout_ms: u64,

    /// Length of the rolling window of recorded calls, in seconds.
    pub rolling_window_secs: u64,

    /// Minimum calls in the window before the threshold is evaluated.
    pub volume_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            error_threshold_percentage: 50,
            reset_timeout_ms: 3000,
            rolling_window_secs: 10,
            volume_threshold: 5,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    pub fn rolling_window(&self) -> Duration {
        Duration::from_secs(self.rolling_window_secs)
    }
}

/// Upstream forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Per-call timeout in milliseconds.
    pub timeout_ms: u64,

    /// Largest upstream response body read into memory.
    pub max_response_bytes: usize,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 3000,
            max_response_bytes: 4 * 1024 * 1024,
        }
    }
}

impl ForwardingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts against one instance before failing over to the next.
    pub max_attempts_per_instance: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts_per_instance: 3,
            base_delay_ms: 50,
            max_delay_ms: 500,
        }
    }
}

/// Timeout configuration for the inbound side.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upper bound on handling one inbound request, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
