//! Bounded exponential backoff between failed sync cycles.

use std::time::Duration;

use tokio::time::Instant;

use crate::{Error, Result};

/// Delay schedule applied after consecutive failed cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    max: Duration,
}

impl BackoffPolicy {
    pub fn new(base: Duration, max: Duration) -> Result<Self> {
        if base.is_zero() {
            return Err(Error::Config("backoff base must be positive".into()));
        }
        if max < base {
            return Err(Error::Config(
                "backoff max must not be smaller than its base".into(),
            ));
        }
        Ok(Self { base, max })
    }

    pub const fn base(&self) -> Duration {
        self.base
    }

    pub const fn max(&self) -> Duration {
        self.max
    }

    /// Wait imposed after `failures` consecutive failures: base, 2x, 4x, ... capped at max.
    pub fn delay_for(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let factor = 1_u32 << (failures - 1).min(31);
        self.base
            .checked_mul(factor)
            .map_or(self.max, |delay| delay.min(self.max))
    }
}

/// Failure bookkeeping kept by the engine between cycles.
#[derive(Debug, Default)]
pub(crate) struct BackoffState {
    failures: u32,
    retry_at: Option<Instant>,
}

impl BackoffState {
    /// Time left before another attempt is allowed, if any.
    pub(crate) fn remaining(&self, now: Instant) -> Option<Duration> {
        self.retry_at
            .and_then(|retry_at| retry_at.checked_duration_since(now))
            .filter(|left| !left.is_zero())
    }

    /// Count a failure; returns the imposed delay (zero when no policy is set).
    pub(crate) fn record_failure(
        &mut self,
        policy: Option<&BackoffPolicy>,
        now: Instant,
    ) -> Duration {
        self.failures = self.failures.saturating_add(1);
        let delay = policy.map_or(Duration::ZERO, |policy| policy.delay_for(self.failures));
        self.retry_at = (!delay.is_zero()).then(|| now + delay);
        delay
    }

    pub(crate) fn record_success(&mut self) {
        self.failures = 0;
        self.retry_at = None;
    }

    pub(crate) const fn failures(&self) -> u32 {
        self.failures
    }
}
