use std::time::Duration;

/// Retry configuration for a single step.
///
/// `max_retries` counts attempts after the first one, so a policy with
/// `max_retries = 2` executes a step at most three times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    max_retries: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Run the step once.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
        }
    }

    /// Retry up to `max_retries` times, sleeping `delay` between attempts.
    #[must_use]
    pub const fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    #[must_use]
    pub const fn from_millis(max_retries: u32, delay_ms: u64) -> Self {
        Self::fixed(max_retries, Duration::from_millis(delay_ms))
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        self.delay
    }

    /// Whether another attempt is allowed after `failed_attempts` failures.
    #[must_use]
    pub fn allows_retry(&self, failed_attempts: u32) -> bool {
        failed_attempts <= self.max_retries
    }

    pub(crate) fn wait(&self) {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
    }
}
