//! LLM provider implementations.
//!
//! Provides the Anthropic Messages API implementation of `LlmProvider`, the
//! per-model price table, and the bounded retry helper used around completions.

pub mod anthropic;
pub mod models;

use crate::config::LlmSettings;
use crate::error::LlmError;
use std::future::Future;
use std::time::Duration;

pub use anthropic::AnthropicProvider;
pub use models::model_pricing;

/// Execute an async operation, retrying transient errors with exponential backoff.
///
/// Only `LlmError::Connection` and `LlmError::RateLimited` are retried, at most
/// `settings.max_retries` times. Everything else returns immediately.
pub async fn with_retry<F, Fut, T>(settings: &LlmSettings, operation: F) -> Result<T, LlmError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => {
                if !e.is_transient() || attempt >= settings.max_retries {
                    return Err(e);
                }

                let backoff_ms = compute_backoff(settings, attempt, &e);
                tracing::warn!(
                    attempt = attempt + 1,
                    max = settings.max_retries,
                    backoff_ms = backoff_ms,
                    error = %e,
                    "Retrying synthesis completion after transient error"
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                attempt += 1;
            }
        }
    }
}

/// Backoff for the given attempt, capped at `max_backoff_ms`.
///
/// Rate-limit hints from the server raise the delay but never past the cap.
fn compute_backoff(settings: &LlmSettings, attempt: u32, err: &LlmError) -> u64 {
    let exponential = settings
        .retry_backoff_ms
        .saturating_mul(2u64.saturating_pow(attempt));
    let wanted = match err {
        LlmError::RateLimited { retry_after_secs } => {
            exponential.max(retry_after_secs.saturating_mul(1000))
        }
        _ => exponential,
    };
    wanted.min(settings.max_backoff_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_settings(max_retries: u32) -> LlmSettings {
        LlmSettings {
            max_retries,
            retry_backoff_ms: 1,
            max_backoff_ms: 5,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_from_connection_error() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast_settings(2), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(LlmError::Connection {
                    message: "reset".into(),
                })
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_does_not_retry_auth_failure() {
        let calls = AtomicU32::new(0);
        let result: Result<(), LlmError> = with_retry(&fast_settings(3), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LlmError::AuthFailed {
                provider: "Anthropic".into(),
            })
        })
        .await;
        assert!(matches!(result, Err(LlmError::AuthFailed { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max() {
        let calls = AtomicU32::new(0);
        let result: Result<(), LlmError> = with_retry(&fast_settings(1), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LlmError::RateLimited {
                retry_after_secs: 0,
            })
        })
        .await;
        assert!(matches!(result, Err(LlmError::RateLimited { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_backoff_is_capped() {
        let settings = LlmSettings {
            retry_backoff_ms: 500,
            max_backoff_ms: 2000,
            ..Default::default()
        };
        let conn = LlmError::Connection {
            message: "x".into(),
        };
        assert_eq!(compute_backoff(&settings, 0, &conn), 500);
        assert_eq!(compute_backoff(&settings, 1, &conn), 1000);
        assert_eq!(compute_backoff(&settings, 5, &conn), 2000);

        let limited = LlmError::RateLimited {
            retry_after_secs: 30,
        };
        assert_eq!(compute_backoff(&settings, 0, &limited), 2000);
    }
}
