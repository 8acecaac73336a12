//! Generic bounded-attempt retry with linear backoff.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::error::LlmError;

/// Retry policy applied uniformly to every client operation.
///
/// An operation is attempted up to `max_attempts` times. Between attempts the
/// policy sleeps for `base_delay` scaled by the attempt index (1x, 2x, 3x, ...)
/// with +/- 10% jitter. Contract violations are surfaced immediately without
/// further attempts; every other error is considered transient.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Run `operation`, retrying on failure until the attempt budget is spent.
    ///
    /// On exhaustion the final error carries the attempt count and the last
    /// underlying error as its source. No partial result is ever returned.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut last_error: Option<LlmError> = None;

        for attempt in 1..=attempts {
            match operation().await {
                Ok(value) => {
                    debug!(attempt, "operation succeeded");
                    return Ok(value);
                }
                Err(error) if error.is_contract_violation() => {
                    return Err(error);
                }
                Err(error) => {
                    warn!(attempt, max_attempts = attempts, error = %error, "operation failed");
                    last_error = Some(error);
                    if attempt < attempts {
                        tokio::time::sleep(self.backoff_delay(attempt)).await;
                    }
                }
            }
        }

        let source = last_error.unwrap_or_else(|| LlmError::Api {
            message: format!("Operation failed after {attempts} attempts with unknown error"),
            status_code: None,
        });
        Err(LlmError::RetriesExhausted {
            attempts,
            source: Box::new(source),
        })
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as f64 * attempt as f64;

        // +/- 10% jitter (0.9 to 1.1)
        let jitter_factor = rand::random::<f64>() * 0.2 + 0.9;
        Duration::from_millis((base * jitter_factor) as u64)
    }
}
