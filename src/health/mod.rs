//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Selector asks "is endpoint up?" / status fan-out
//!     → guarded.rs (circuit breaker admits or short-circuits)
//!     → prober.rs (GET health path with timeout)
//!     → outcome recorded on the endpoint's breaker
//! ```
//!
//! # Design Decisions
//! - Probes run on demand, not on a timer
//! - Timeouts, refused connections and non-2xx all mean "down"
//! - An open breaker answers "down" without touching the network

pub mod guarded;
pub mod prober;

pub use guarded::{GuardedProber, Liveness};
pub use prober::{HealthProber, ProbeDetail, ProbeResult};
