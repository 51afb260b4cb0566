//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → logical service identified
//!     → selector.rs (endpoints from the registry cache)
//!     → round_robin.rs (per-service cursor picks the sweep start)
//!     → selector.rs (liveness + breaker gate, bounded retries, failover)
//!     → Return outcome and attempt log
//! ```
//!
//! # Design Decisions
//! - Cursor state is per logical service and shared by all requests
//! - Load spreading (cursor) and failover (ordered sweep) are independent
//! - Down endpoints are skipped, not removed from the snapshot

pub mod endpoint;
pub mod round_robin;
pub mod selector;

pub use endpoint::{Endpoint, ServiceName};
pub use round_robin::{RoundRobin, SelectionCursors};
pub use selector::{InstanceSelector, Selection};
