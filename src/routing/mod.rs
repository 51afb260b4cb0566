//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request matched by the HTTP layer to a RouteSpec
//!     → table.rs (logical service, retry policy, error wording)
//!     → router.rs (request span, selector, forwarder)
//!     → RouteOutcome + RouteReport (metrics, logs)
//! ```
//!
//! # Design Decisions
//! - Route table is static and compiled in
//! - Deterministic: the same route always targets the same service and policy
//! - Router owns the shared context; handlers only borrow it

pub mod router;
pub mod table;

pub use router::{GatewayContext, GatewayRouter, RouteReport};
pub use table::{find_route, RouteMethod, RoutePolicy, RouteSpec, ServiceKind, ROUTES};
