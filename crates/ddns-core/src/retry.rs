//! Retry policy for address discovery
//!
//! Discovery failures are transient by nature (link down, endpoint
//! unreachable), so the default policy retries forever with a fixed short
//! backoff. A bounded policy exists for callers that need a maximum wait.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, error};

use crate::error::{Error, Result};

/// Default backoff between discovery attempts
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Fixed-backoff retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts; `None` retries until success
    max_attempts: Option<usize>,

    /// Sleep between consecutive attempts
    backoff: Duration,
}

impl RetryPolicy {
    /// Retry until success, sleeping `backoff` between attempts
    pub fn unbounded(backoff: Duration) -> Self {
        Self {
            max_attempts: None,
            backoff,
        }
    }

    /// Give up after `max_attempts` attempts (at least one attempt is made)
    pub fn bounded(max_attempts: usize, backoff: Duration) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            backoff,
        }
    }

    /// Maximum number of attempts, `None` if unbounded
    pub fn max_attempts(&self) -> Option<usize> {
        self.max_attempts
    }

    /// Backoff between attempts
    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Run `op` until it succeeds or the attempt budget is spent
    ///
    /// Every failure is logged at error level with `what` as context.
    ///
    /// # Blocking
    ///
    /// With an unbounded policy this only returns on success, which may be
    /// never during a prolonged outage.
    ///
    /// # Errors
    ///
    /// - `Error::RetriesExhausted` when a bounded policy runs out of attempts
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded after {} attempt(s)", what, attempt);
                    }
                    return Ok(value);
                }
                Err(e) => {
                    error!("{} failed (attempt {}): {}", what, attempt, e);

                    if let Some(max) = self.max_attempts
                        && attempt >= max
                    {
                        return Err(Error::RetriesExhausted {
                            attempts: attempt,
                            last_error: e.to_string(),
                        });
                    }

                    tokio::time::sleep(self.backoff).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded(DEFAULT_BACKOFF)
    }
}
