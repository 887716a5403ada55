//! Reconnect policy
//!
//! The first attempt is made immediately. After `k` consecutive failures the
//! next attempt waits `min(base * 2^k, max)`. A successful open resets the
//! count. Once `max_attempts` consecutive attempts have failed, no further
//! attempt is made.

use std::time::Duration;
use tracing::{debug, error};

/// Capped exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay before the retry that follows `failures` consecutive failures.
    ///
    /// `failures` is 1-based; zero failures means no wait.
    pub fn delay_for_retry(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(failures).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn max(&self) -> Duration {
        self.max
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30))
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `delay`, then make attempt number `attempt`
    Retry { attempt: u32, delay: Duration },
    /// Stop; `attempts` consecutive attempts failed
    Exhausted { attempts: u32 },
}

/// Consecutive-failure counter driving reconnects.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    backoff: Backoff,
    max_attempts: u32,
    failures: u32,
}

impl Lifecycle {
    /// `max_attempts` is clamped to at least one.
    pub fn new(backoff: Backoff, max_attempts: u32) -> Self {
        Self { backoff, max_attempts: max_attempts.max(1), failures: 0 }
    }

    /// 1-based number of the attempt about to be made
    pub fn next_attempt(&self) -> u32 {
        self.failures.saturating_add(1)
    }

    /// A connection opened.
    pub fn on_open(&mut self) {
        if self.failures > 0 {
            debug!("Connection opened after {} failed attempts", self.failures);
        }
        self.failures = 0;
    }

    /// An attempt failed or an open connection was lost.
    pub fn on_failure(&mut self) -> RetryDecision {
        self.failures = self.failures.saturating_add(1);

        if self.failures >= self.max_attempts {
            error!(attempts = self.failures, "Giving up reconnecting");
            return RetryDecision::Exhausted { attempts: self.failures };
        }

        RetryDecision::Retry {
            attempt: self.failures + 1,
            delay: self.backoff.delay_for_retry(self.failures),
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}
