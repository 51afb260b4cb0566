//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap registry queries, probes and forwarded calls with a deadline
//! - Cancel operations cleanly on timeout
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - Timed-out forwarded requests surface as 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// The wrapped operation did not finish before its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation timed out after {}ms", .after.as_millis())]
pub struct Elapsed {
    pub after: Duration,
}

/// Run `fut` to completion or give up after `after`.
///
/// The future is dropped on timeout, which aborts any in-flight I/O it owns.
pub async fn with_timeout<F>(after: Duration, fut: F) -> Result<F::Output, Elapsed>
where
    F: Future,
{
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| Elapsed { after })
}
