/**
 * Timing configuration for condition polling
 */
use std::time::Duration;

/// Default upper bound on how long a single wait may poll
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default pause between two fetches of the same resource
pub const DEFAULT_RETRY_INTERVAL_MILLIS: u64 = 100;

/// Env var overriding the default timeout, in seconds
pub const TIMEOUT_ENV: &str = "AWAIT_TIMEOUT_SECS";

/// Env var overriding the default interval, in milliseconds
pub const INTERVAL_ENV: &str = "AWAIT_INTERVAL_MILLIS";

/// Interval and deadline for one `wait_for` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_RETRY_INTERVAL_MILLIS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Per-invocation override of a [`PollConfig`] field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOption {
    Timeout(Duration),
    Interval(Duration),
}

impl PollConfig {
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Apply overrides in order; a later option for the same field wins.
    #[must_use]
    pub fn with_retry_options(self, options: &[RetryOption]) -> Self {
        options.iter().fold(self, |config, option| match *option {
            RetryOption::Timeout(timeout) => config.with_timeout(timeout),
            RetryOption::Interval(interval) => config.with_interval(interval),
        })
    }

    /// Defaults overridden by `AWAIT_TIMEOUT_SECS` / `AWAIT_INTERVAL_MILLIS`.
    ///
    /// Unparseable values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(secs) = parse_env(TIMEOUT_ENV) {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(millis) = parse_env(INTERVAL_ENV) {
            config.interval = Duration::from_millis(millis);
        }
        config
    }
}

fn parse_env(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            tracing::warn!("⚠️  Ignoring invalid {}={:?}", name, raw);
            None
        }
    }
}

const _: () = {
    assert!(DEFAULT_TIMEOUT_SECS > 0, "DEFAULT_TIMEOUT_SECS must be greater than 0");
    assert!(
        DEFAULT_RETRY_INTERVAL_MILLIS > 0,
        "DEFAULT_RETRY_INTERVAL_MILLIS must be greater than 0"
    );
    assert!(
        DEFAULT_RETRY_INTERVAL_MILLIS < DEFAULT_TIMEOUT_SECS * 1000,
        "retry interval must be shorter than the timeout"
    );
};
