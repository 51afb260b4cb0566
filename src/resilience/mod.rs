//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to an endpoint:
//!     → circuit_breaker.rs (admit, or short-circuit while open)
//!     → timeouts.rs (enforce probe/forward/registry deadline)
//!     → On failure: retries.rs (attempt budget per instance, sweep order)
//!       with backoff.rs between attempts on the same instance
//!     → circuit_breaker.rs (record outcome, trip on failure rate)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Circuit breaker prevents cascading failures
//! - Retry policy is plain data so the selection loop stays testable

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{BreakerPermit, BreakerRegistry, BreakerState, CircuitBreaker, Rejected};
pub use retries::{failover_order, EndpointOrdering, RetryPolicy};
pub use timeouts::{with_timeout, Elapsed};
