//! Retry with capped exponential backoff
//!
//! Used where a daemon cannot start without a dependency, such as the
//! vault at boot. With `max_retries: None` the operation is retried until
//! it succeeds or the caller drops the future.
//!
//! # Example
//!
//! ```rust,ignore
//! use infrastructure::retry::{RetryConfig, retry};
//!
//! let config = RetryConfig::new(500, 10_000, 20.0, Some(3));
//! let store = retry(&config, || VaultSecretStore::connect(&vault)).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Backoff schedule: `initial * multiplier^attempt`, capped at `max`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Delay before the first retry in milliseconds
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Upper bound for any single delay in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Retries after the first attempt; `None` retries forever
    #[serde(default)]
    pub max_retries: Option<u32>,
}

const fn default_initial_delay() -> u64 {
    500
}

const fn default_max_delay() -> u64 {
    10_000
}

const fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(
            default_initial_delay(),
            default_max_delay(),
            default_multiplier(),
            Some(3),
        )
    }
}

impl RetryConfig {
    #[must_use]
    pub const fn new(
        initial_delay_ms: u64,
        max_delay_ms: u64,
        multiplier: f64,
        max_retries: Option<u32>,
    ) -> Self {
        Self {
            initial_delay_ms,
            max_delay_ms,
            multiplier,
            max_retries,
        }
    }

    /// Delay before retry number `attempt` (0-indexed)
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss,
        clippy::cast_possible_truncation
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(64) as i32;
        let base_delay = (self.initial_delay_ms as f64) * self.multiplier.powi(exponent);
        let capped_delay = base_delay.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped_delay as u64)
    }

    const fn exhausted(&self, retries_done: u32) -> bool {
        match self.max_retries {
            Some(max) => retries_done >= max,
            None => false,
        }
    }
}

/// Errors that can say whether another try could help
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for application::ApplicationError {
    fn is_retryable(&self) -> bool {
        Self::is_retryable(self)
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the retry budget runs out
#[allow(clippy::cast_possible_truncation)]
pub async fn retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let mut attempts = 0u32;

    loop {
        attempts = attempts.saturating_add(1);
        match operation().await {
            Ok(value) => {
                if attempts > 1 {
                    debug!(attempts, "Operation succeeded after retries");
                }
                return Ok(value);
            },
            Err(err) if !err.is_retryable() => {
                debug!(attempts, error = %err, "Operation failed with non-retryable error");
                return Err(err);
            },
            Err(err) => {
                let retries_done = attempts - 1;
                if config.exhausted(retries_done) {
                    warn!(attempts, error = %err, "Operation failed after max retries");
                    return Err(err);
                }

                let delay = config.delay_for_attempt(retries_done);
                warn!(
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
            },
        }
    }
}
