//! Retry scheduling for the transport core.
//!
//! `RetryPolicy` decides how many HTTP calls a logical request may make and how
//! long to wait between them. The wait itself goes through a [`Sleeper`], so
//! tests can record delays instead of actually sleeping.

use futures::future::BoxFuture;
use std::time::Duration;

/// Attempt cap and delays for one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total HTTP calls allowed per request, including the first one.
    pub max_attempts: u32,

    /// Delay before the first retry; doubles for every further retry.
    pub base_delay: Duration,

    /// Upper bound for a single backoff delay.
    pub max_delay: Duration,

    /// Longest rate-limit reset wait that is slept through instead of failing.
    pub max_rate_limit_wait: Duration,
}

impl RetryPolicy {
    pub const DEFAULT: Self = Self {
        max_attempts: 3,
        base_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(30),
        max_rate_limit_wait: Duration::from_secs(60),
    };

    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            ..Self::DEFAULT
        }
    }

    /// Never retry: a single HTTP call per request.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::DEFAULT
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_max_rate_limit_wait(mut self, wait: Duration) -> Self {
        self.max_rate_limit_wait = wait;
        self
    }

    /// Backoff before retry number `retry` (1-based): `base * 2^(retry-1)`, capped.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        let delay = self.base_delay.saturating_mul(1u32 << exponent);
        delay.min(self.max_delay)
    }

    /// Whether another call is allowed after `attempts` calls have been made.
    pub fn allows_another_attempt(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Whether a rate-limit reset `wait` is short enough to sleep through.
    pub fn accepts_rate_limit_wait(&self, wait: Duration) -> bool {
        wait <= self.max_rate_limit_wait
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Performs the waits scheduled by the retry loop.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}
