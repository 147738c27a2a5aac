//! Bounded polling.
//!
//! Every wait for remote visibility goes through [`Poll`]: probe, and if the
//! probe comes back empty, sleep a fixed interval and try again until the
//! attempt budget is spent.

use std::thread;
use std::time::Duration;

use cfsync_config::SyncConfig;

/// Fixed-interval poll with a bounded number of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poll {
    /// Delay between consecutive attempts.
    pub interval: Duration,
    /// Maximum number of attempts (at least one is always made).
    pub max_attempts: u32,
}

impl Poll {
    /// Create a poll policy.
    #[must_use]
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Run `probe` until it yields a value, fails, or attempts run out.
    ///
    /// The probe receives the 1-based attempt number. There is no sleep before
    /// the first attempt nor after the last one.
    pub fn until<T, E>(
        &self,
        mut probe: impl FnMut(u32) -> Result<Option<T>, E>,
    ) -> Result<Option<T>, E> {
        let attempts = self.max_attempts.max(1);
        for attempt in 1..=attempts {
            if let Some(value) = probe(attempt)? {
                return Ok(Some(value));
            }
            if attempt < attempts {
                thread::sleep(self.interval);
            }
        }
        Ok(None)
    }
}

/// The two bounded waits of the reconciliation protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait for a just-created page to show up in title lookups.
    pub visibility: Poll,
    /// Retry a create whose parent was only just created.
    pub create: Poll,
}

impl RetryPolicy {
    /// Policy that never sleeps, keeping the attempt budgets.
    #[must_use]
    pub fn without_delay(self) -> Self {
        Self {
            visibility: Poll::new(Duration::ZERO, self.visibility.max_attempts),
            create: Poll::new(Duration::ZERO, self.create.max_attempts),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for RetryPolicy {
    fn from(config: &SyncConfig) -> Self {
        Self {
            visibility: Poll::new(config.visibility_interval(), config.visibility_attempts),
            create: Poll::new(config.retry_delay(), config.create_retries),
        }
    }
}
