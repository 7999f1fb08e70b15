use std::env;
use std::time::Duration;

use crate::retry::RetryPolicy;
use crate::{DEFAULT_BATCH_SIZE, DEFAULT_DRAIN_INTERVAL_SECS};

/// Drain loop settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainConfig {
    /// Sleep between drain cycles
    pub interval: Duration,
    /// Maximum records fetched (and flushed) per cycle
    pub batch_size: usize,
    pub retry: RetryPolicy,
    /// Upper bound on a single bus publish; `None` waits indefinitely
    pub publish_timeout: Option<Duration>,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_DRAIN_INTERVAL_SECS),
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetryPolicy::default(),
            publish_timeout: None,
        }
    }
}

impl DrainConfig {
    /// Read overrides from the environment
    ///
    /// - `OUTBOX_DRAIN_INTERVAL_SECS` (default 30)
    /// - `OUTBOX_BATCH_SIZE` (default 100)
    /// - `OUTBOX_MAX_ATTEMPTS` (default 1, no retries)
    /// - `OUTBOX_RETRY_BACKOFF_MS` (default 1000)
    /// - `OUTBOX_MAX_BACKOFF_SECS` (default 300)
    /// - `OUTBOX_PUBLISH_TIMEOUT_SECS` (unset: no timeout)
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let interval_secs = parse_var("OUTBOX_DRAIN_INTERVAL_SECS", DEFAULT_DRAIN_INTERVAL_SECS)?;
        if interval_secs == 0 {
            return Err("OUTBOX_DRAIN_INTERVAL_SECS must be greater than 0".to_string());
        }

        let batch_size = parse_var("OUTBOX_BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        if batch_size == 0 {
            return Err("OUTBOX_BATCH_SIZE must be greater than 0".to_string());
        }

        let max_attempts = parse_var("OUTBOX_MAX_ATTEMPTS", defaults.retry.max_attempts)?;
        if max_attempts == 0 {
            return Err("OUTBOX_MAX_ATTEMPTS must be at least 1".to_string());
        }

        let backoff_ms = parse_var(
            "OUTBOX_RETRY_BACKOFF_MS",
            defaults.retry.initial_backoff.as_millis() as u64,
        )?;
        let max_backoff_secs =
            parse_var("OUTBOX_MAX_BACKOFF_SECS", defaults.retry.max_backoff.as_secs())?;

        let publish_timeout = match env::var("OUTBOX_PUBLISH_TIMEOUT_SECS") {
            Ok(raw) => Some(Duration::from_secs(raw.parse::<u64>().map_err(|_| {
                format!("OUTBOX_PUBLISH_TIMEOUT_SECS must be a number of seconds, got {raw:?}")
            })?)),
            Err(_) => None,
        };

        Ok(Self {
            interval: Duration::from_secs(interval_secs),
            batch_size,
            retry: RetryPolicy::exponential(
                max_attempts,
                Duration::from_millis(backoff_ms),
                Duration::from_secs(max_backoff_secs),
            ),
            publish_timeout,
        })
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = Some(timeout);
        self
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, String> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| format!("{name} must be a valid number, got {raw:?}")),
        Err(_) => Ok(default),
    }
}
