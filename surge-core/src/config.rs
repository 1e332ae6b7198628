use crate::{DEFAULT_REQUEST_TIMEOUT, DEFAULT_TEST_DURATION, MAX_LOAD, MAX_TEST_DURATION, MIN_LOAD};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSecondsWithFrac};
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;

/// Rejected test parameters. Always raised before anything is dispatched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("concurrency must be between {} and {}, got {}", MIN_LOAD, MAX_LOAD, .0)]
    Concurrency(u64),

    #[error("rate must be between {} and {} requests per second, got {}", MIN_LOAD, MAX_LOAD, .0)]
    Rate(u64),

    #[error("duration must be greater than zero and at most {:?}, got {:?}", MAX_TEST_DURATION, .0)]
    Duration(Duration),

    #[error("a duration only applies to rate mode")]
    DurationWithoutRate,
}

/// How requests are scheduled during a run.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TestMode {
    /// Launch exactly `concurrency` calls at once and wait for all of them.
    Concurrency { concurrency: NonZeroU32 },

    /// Start `rate` calls per second until `duration` has elapsed.
    Rate {
        rate: NonZeroU32,
        #[serde_as(as = "DurationSecondsWithFrac<f64>")]
        duration: Duration,
    },
}

/// A validated test run request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestConfig {
    pub mode: TestMode,
    pub request_timeout: Duration,
}

impl TestConfig {
    /// Fixed-concurrency run with `concurrency` simultaneous calls.
    pub fn concurrency(concurrency: u64) -> Result<Self, ConfigError> {
        let concurrency = bounded_load(concurrency).ok_or(ConfigError::Concurrency(concurrency))?;
        Ok(Self::new(TestMode::Concurrency { concurrency }))
    }

    /// Rate-limited run. Uses [DEFAULT_TEST_DURATION] when no duration is given.
    pub fn rate(rate: u64, duration: Option<Duration>) -> Result<Self, ConfigError> {
        let rate = bounded_load(rate).ok_or(ConfigError::Rate(rate))?;
        let duration = duration.unwrap_or(DEFAULT_TEST_DURATION);
        if duration.is_zero() || duration > MAX_TEST_DURATION {
            return Err(ConfigError::Duration(duration));
        }
        Ok(Self::new(TestMode::Rate { rate, duration }))
    }

    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    fn new(mode: TestMode) -> Self {
        Self {
            mode,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

fn bounded_load(value: u64) -> Option<NonZeroU32> {
    if (MIN_LOAD as u64..=MAX_LOAD as u64).contains(&value) {
        NonZeroU32::new(value as u32)
    } else {
        None
    }
}
