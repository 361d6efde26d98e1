//! Retry delay computation
//!
//! The delay before retrying a page grows with the attempt number and is
//! overridden by the server when it tells us how long to wait.

use crate::config::PaginationConfig;
use crate::invoker::{ErrorKind, InvokeError};
use std::time::Duration;

/// Minimum wait after a rate-limit response that carried no hint
pub const DEFAULT_RATE_LIMIT_DELAY: Duration = Duration::from_secs(1);

/// Largest exponent applied to the base delay
const MAX_EXPONENT: u32 = 16;

/// Computes how long to wait before retrying a failed page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Double the delay on each further attempt
    pub exponential: bool,
}

impl BackoffPolicy {
    /// Create a backoff policy
    pub fn new(base_delay: Duration, exponential: bool) -> Self {
        Self {
            base_delay,
            exponential,
        }
    }

    /// Backoff settings from a pagination config
    pub fn from_config(config: &PaginationConfig) -> Self {
        Self::new(config.base_delay, config.exponential)
    }

    /// Delay from the attempt number alone
    ///
    /// `attempt` is 1-based: the first retry waits `base_delay`.
    pub fn computed_delay(&self, attempt: u32) -> Duration {
        if !self.exponential {
            return self.base_delay;
        }
        let exponent = attempt.saturating_sub(1).min(MAX_EXPONENT);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Delay before retrying after `error` on the given attempt
    ///
    /// On the first retry a server hint is honoured as given; later retries
    /// wait for the longer of the hint and the computed backoff. A rate-limit
    /// failure without a hint waits at least [`DEFAULT_RATE_LIMIT_DELAY`].
    pub fn delay_for(&self, attempt: u32, error: &InvokeError) -> Duration {
        let computed = self.computed_delay(attempt);
        if error.kind() != ErrorKind::RateLimited {
            return computed;
        }
        match error.retry_after_hint() {
            Some(hint) if attempt <= 1 => hint,
            Some(hint) => computed.max(hint),
            None => computed.max(DEFAULT_RATE_LIMIT_DELAY),
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&PaginationConfig::default())
    }
}
