//! Upstream request forwarding.
//!
//! # Data Flow
//! ```text
//! Selected endpoint + buffered inbound request
//!     → forwarder.rs (build upstream request, timeout, classify)
//!     → Forwarded { Success | UpstreamError | Failed }
//!     → outcome.rs (RouteOutcome for the caller, AttemptRecord for reporting)
//! ```

pub mod forwarder;
pub mod outcome;

pub use forwarder::{Forwarded, OutboundRequest, RequestForwarder, UpstreamClient, UpstreamReply, X_REQUEST_ID};
pub use outcome::{AttemptRecord, AttemptResult, RouteOutcome};
