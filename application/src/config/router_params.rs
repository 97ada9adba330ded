//! Model router parameters: breaker thresholds, retry policy, call timeout.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterParams {
    /// Consecutive failures before a backend's breaker opens.
    pub failure_threshold: u32,
    /// How long an open breaker waits before allowing a trial call.
    pub reset_timeout: Duration,
    /// Retries per backend after the first attempt.
    pub max_retries: u32,
    /// Backoff base; attempt `n` waits `base * 2^n` plus jitter.
    pub retry_base_delay: Duration,
    /// Upper bound of the random jitter added to each backoff.
    pub max_jitter: Duration,
    /// Timeout applied to every individual backend call.
    pub call_timeout: Duration,
}

impl Default for RouterParams {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            reset_timeout: Duration::from_secs(60),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
            max_jitter: Duration::from_millis(100),
            call_timeout: Duration::from_secs(60),
        }
    }
}

impl RouterParams {
    /// Backoff before retry number `retry` (0-based), without jitter.
    pub fn backoff(&self, retry: u32) -> Duration {
        self.retry_base_delay
            .saturating_mul(2u32.saturating_pow(retry.min(16)))
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn with_max_jitter(mut self, jitter: Duration) -> Self {
        self.max_jitter = jitter;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}
