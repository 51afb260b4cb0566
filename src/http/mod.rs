//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, middleware, one handler per route)
//!     → request.rs (request ID, buffer into an OutboundRequest)
//!     → routing layer (selector, forwarder)
//!     → response.rs (mirror backend reply or render gateway error)
//!     → Send to client
//!
//! GET /status
//!     → status.rs (concurrent probe of every registered instance)
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod status;

pub use request::MakeRequestUuid;
pub use server::GatewayServer;
pub use status::{collect_status, StatusReport};
