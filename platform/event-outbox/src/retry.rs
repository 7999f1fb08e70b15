//! Retry scheduling for failed outbox records

use chrono::{DateTime, Utc};
use std::time::Duration;

/// How failed publishes are rescheduled
///
/// With `max_attempts = 1` (the default) the first failure is terminal: the
/// record keeps its `error` and is never fetched again until an operator
/// clears it. Higher values reschedule the record with exponential backoff
/// until the attempts are used up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total delivery attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt (doubles on each retry)
    pub initial_backoff: Duration,
    /// Cap for the exponential growth
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    pub fn exponential(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            max_backoff,
        }
    }

    /// Delay after the `failed_attempts`-th failure
    pub fn backoff_for(&self, failed_attempts: u32) -> Duration {
        let factor = 2u32.saturating_pow(failed_attempts.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// When to try again after `failed_attempts` failures, or `None` to give up
    pub fn next_attempt_at(&self, failed_attempts: u32, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if failed_attempts >= self.max_attempts {
            return None;
        }
        let delay = chrono::Duration::from_std(self.backoff_for(failed_attempts)).ok()?;
        now.checked_add_signed(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_never_retries() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.next_attempt_at(1, Utc::now()), None);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::exponential(10, Duration::from_millis(100), Duration::from_millis(500));

        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(400));
        assert_eq!(policy.backoff_for(4), Duration::from_millis(500));
        assert_eq!(policy.backoff_for(40), Duration::from_millis(500));
    }

    #[test]
    fn schedules_until_attempts_exhausted() {
        let policy = RetryPolicy::exponential(3, Duration::from_secs(1), Duration::from_secs(60));
        let now = Utc::now();

        assert_eq!(
            policy.next_attempt_at(1, now),
            Some(now + chrono::Duration::seconds(1))
        );
        assert_eq!(
            policy.next_attempt_at(2, now),
            Some(now + chrono::Duration::seconds(2))
        );
        assert_eq!(policy.next_attempt_at(3, now), None);
    }
}
