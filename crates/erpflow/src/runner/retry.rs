use std::time::Duration;

/// Retry ceiling for faults that escape the workflow.
pub const MAX_JOB_RETRIES: u32 = 3;

const BASE_DELAY: Duration = Duration::from_secs(60);

/// Exponential backoff: the n-th retry waits `base * 2^n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_JOB_RETRIES,
            base_delay: BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let factor = 2u32.checked_pow(retry_count).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}
