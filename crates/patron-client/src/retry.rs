//! Backoff for transient status check failures.
//!
//! Only errors where [`ClientError::is_retryable`] holds are retried. A
//! `SUBSCRIPTION_REQUIRED` answer or a rejected credential returns at once.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;
use uuid::Uuid;

use crate::{metrics, ClientError, Result};

/// How failed status checks are retried.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the initial check.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles for each one after.
    pub base_delay: Duration,
    /// Upper bound for a single delay, before jitter.
    pub max_delay: Duration,
    /// Spread each delay by up to a quarter so sessions don't retry in step.
    pub add_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            add_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Default retry settings: three retries from 250 ms, capped at 5 s.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how many retries follow the initial check.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the delay before the first retry.
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the cap on any single delay.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Turn jitter on or off. Tests usually want it off.
    #[must_use]
    pub fn with_jitter(mut self, enable: bool) -> Self {
        self.add_jitter = enable;
        self
    }

    /// Delays to wait before each retry, in order.
    #[must_use]
    pub fn schedule(&self) -> Backoff {
        Backoff {
            next: self.base_delay.min(self.max_delay),
            max: self.max_delay,
            jitter: self.add_jitter,
            remaining: self.max_attempts,
        }
    }

    /// Longest time a check can spend backing off, jitter aside.
    #[must_use]
    pub fn max_total_backoff(&self) -> Duration {
        self.clone().with_jitter(false).schedule().sum()
    }
}

/// Doubling delay sequence, one item per permitted retry.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
    jitter: bool,
    remaining: u32,
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let delay = self.next;
        self.next = self.next.saturating_mul(2).min(self.max);

        Some(if self.jitter { spread(delay) } else { delay })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Backoff {}

fn spread(delay: Duration) -> Duration {
    let quarter = delay / 4;
    if quarter.is_zero() {
        return delay;
    }
    let roll = (Uuid::new_v4().as_u128() % 1024) as u32;
    delay + quarter.mul_f64(f64::from(roll) / 1024.0)
}

/// Run `check` until it succeeds, fails for good, or the schedule runs out.
///
/// Each retry is logged and counted under `operation`.
pub async fn retry_check<F, Fut, T>(config: &RetryConfig, operation: &'static str, mut check: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delays = config.schedule();
    let mut retry = 0;

    loop {
        let err: ClientError = match check().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !err.is_retryable() {
            return Err(err);
        }
        let Some(delay) = delays.next() else {
            return Err(err);
        };

        retry += 1;
        warn!(
            operation,
            retry,
            of = config.max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "status check failed, backing off"
        );
        metrics::record_retry(operation, retry);
        sleep(delay).await;
    }
}
