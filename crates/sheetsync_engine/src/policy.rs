//! Retry strategy for mirror writes.

use crate::config::RetryConfig;
use crate::error::EngineResult;
use tracing::debug;

/// Decides how often a failed mirror operation is attempted.
pub trait ApplyPolicy: Send {
    /// Runs `op` until it succeeds or the policy gives up.
    fn run(&self, op: &mut dyn FnMut() -> EngineResult<()>) -> EngineResult<()>;
}

/// One attempt, errors returned as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl ApplyPolicy for NoRetry {
    fn run(&self, op: &mut dyn FnMut() -> EngineResult<()>) -> EngineResult<()> {
        op()
    }
}

/// Retries retryable errors with exponential backoff.
///
/// Sleeps on the calling thread between attempts.
#[derive(Debug, Clone)]
pub struct BackoffRetry {
    config: RetryConfig,
}

impl BackoffRetry {
    /// Creates a policy from a retry configuration.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl ApplyPolicy for BackoffRetry {
    fn run(&self, op: &mut dyn FnMut() -> EngineResult<()>) -> EngineResult<()> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match op() {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt + 1 < max_attempts => {
                    attempt += 1;
                    let delay = self.config.delay_for_attempt(attempt);
                    debug!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "Retrying mirror operation");
                    std::thread::sleep(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Picks the policy for a retry configuration.
pub fn policy_for(config: &RetryConfig) -> Box<dyn ApplyPolicy> {
    if config.max_attempts <= 1 {
        Box::new(NoRetry)
    } else {
        Box::new(BackoffRetry::new(config.clone()))
    }
}
