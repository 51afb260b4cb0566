//! Retry policy.
//!
//! # Responsibilities
//! - Describe how many attempts one instance gets before failover
//! - Decide the order in which a request sweeps the endpoint list
//! - Carry the backoff parameters used between attempts on one instance
//!
//! # Design Decisions
//! - Pure data + pure functions; the selection loop consumes them
//! - Every endpoint is visited at most once per request
//! - Structured upstream errors are never retried (decided by the caller)

use std::time::Duration;

use crate::config::RetryConfig;
use crate::resilience::backoff::calculate_backoff;

/// Where a request's failover sweep starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointOrdering {
    /// Always start at the first registered endpoint.
    RegistryOrder,
    /// Start at the service's round-robin cursor, then continue in registry
    /// order with wraparound.
    RoundRobin,
}

/// Finite retry policy consumed by the instance selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts_per_instance: u32,
    pub ordering: EndpointOrdering,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_attempts_per_instance: u32, ordering: EndpointOrdering) -> Self {
        Self {
            max_attempts_per_instance: max_attempts_per_instance.max(1),
            ordering,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Policy built from the configured backoff, with an explicit attempt cap.
    pub fn from_config(config: &RetryConfig, max_attempts_per_instance: u32, ordering: EndpointOrdering) -> Self {
        Self {
            max_attempts_per_instance: max_attempts_per_instance.max(1),
            ordering,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }

    /// Delay before attempt number `attempts_made + 1` on the same instance.
    pub fn backoff(&self, attempts_made: u32) -> Duration {
        calculate_backoff(attempts_made, self.base_delay_ms, self.max_delay_ms)
    }
}

/// Indices of a `len`-element endpoint list in sweep order.
///
/// `start` is normalized modulo `len`, so a cursor left over from a larger
/// endpoint list is still valid. Each index appears exactly once.
pub fn failover_order(len: usize, start: usize) -> impl Iterator<Item = usize> {
    let start = if len == 0 { 0 } else { start % len };
    (0..len).map(move |offset| (start + offset) % len)
}
