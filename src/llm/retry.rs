use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::Result;
use crate::llm::CompletionPort;

/// Bounded retry policy for transient completion failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Cap on the exponential backoff
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(16),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry `attempt` (1-based), doubling each time
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << (attempt - 1).min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Completion port wrapper retrying transient failures with backoff.
///
/// This is the single retry boundary: callers above it (rubric engine,
/// checker-name resolution) never retry again, and after the attempts are
/// exhausted the last error passes through unchanged.
pub struct RetryingCompletion<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C> RetryingCompletion<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<C: CompletionPort> CompletionPort for RetryingCompletion<C> {
    async fn complete(&self, system: &str, user: &str, json_mode: bool) -> Result<String> {
        let mut attempt = 1;
        loop {
            match self.inner.complete(system, user, json_mode).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        "completion attempt {}/{} failed ({}), retrying in {:?}",
                        attempt, self.policy.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
