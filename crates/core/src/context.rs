//! Per-request execution context

use crate::errors::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Deadline carried by a single inbound request.
///
/// Every outbound remote call is bounded by it. Dropping the future of an
/// operation cancels it; storage writes only happen after the remote call
/// they depend on has completed, so a cancelled request never leaves local
/// state ahead of the remote service.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
}

impl RequestContext {
    /// Context without a deadline
    #[must_use]
    pub fn new() -> Self {
        Self { deadline: None }
    }

    /// Context whose deadline is `timeout` from now
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Run `fut` under the request deadline.
    ///
    /// Returns `Error::Timeout` naming `operation` if the deadline elapses
    /// first; the inner future is dropped at that point.
    pub async fn bound<F>(&self, operation: &'static str, fut: F) -> Result<F::Output>
    where
        F: Future,
    {
        match self.deadline {
            None => Ok(fut.await),
            Some(deadline) => {
                let budget = deadline.saturating_duration_since(Instant::now());
                tokio::time::timeout_at(deadline, fut)
                    .await
                    .map_err(|_| Error::timeout(operation, budget))
            }
        }
    }
}
