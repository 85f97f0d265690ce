//! Bounded retry with a fixed backoff for hub overload.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{ClientError, Result};

/// Default maximum send attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default pause after a rate-limited attempt, in milliseconds.
pub const DEFAULT_BACKOFF_MS: u64 = 2_000;

/// Retry parameters for [`send_with_retry`].
///
/// The defaults absorb the cold start of a scale-to-zero hub deployment,
/// which answers with a rate-limit signal until it is warm.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    /// Maximum number of attempts, clamped to at least 1 (default: 5).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Fixed pause after a rate-limited attempt, in milliseconds
    /// (default: 2000). Other failures retry without a pause.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_backoff_ms() -> u64 {
    DEFAULT_BACKOFF_MS
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_ms: DEFAULT_BACKOFF_MS,
        }
    }
}

/// Run `operation` until it succeeds or the attempts are spent.
///
/// A rate-limited attempt logs a warning the first time one is seen and
/// pauses for the configured backoff before the next attempt; other failures
/// retry immediately. When every attempt has failed, the returned error
/// wraps the final attempt's error.
pub async fn send_with_retry<T, F, Fut>(config: &RetryConfig, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut warned = false;
    let mut attempt = 0;

    loop {
        attempt += 1;
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };
        debug!(attempt, error = %error, "hub send attempt failed");

        if attempt >= max_attempts {
            return Err(ClientError::RetriesExhausted {
                attempts: attempt,
                last: Box::new(error),
            });
        }

        if error.is_rate_limit() {
            if !warned {
                warn!(
                    backoff_ms = config.backoff_ms,
                    "hub is overloaded, backing off between attempts"
                );
                warned = true;
            }
            tokio::time::sleep(Duration::from_millis(config.backoff_ms)).await;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
