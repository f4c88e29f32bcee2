use std::{fmt::Display, future::Future};

use tokio::time::sleep;
use tracing::warn;

use crate::manifest::stream::RetryConfig;

/// All attempts failed; carries the error of the final one.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Runs `op` up to `max_attempts` times with the same fixed delay between attempts.
///
/// `op` receives the 1-based attempt number. There is no delay after the final attempt.
pub async fn retry_fixed<T, E, F, Fut>(
    config: &RetryConfig,
    label: &str,
    mut op: F,
) -> Result<(T, u32), RetryExhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok((value, attempt)),
            Err(e) => {
                if attempt >= max_attempts {
                    return Err(RetryExhausted { attempts: attempt, last_error: e });
                }

                warn!(
                    "{} attempt {}/{} failed: {} - retrying in {}ms",
                    label, attempt, max_attempts, e, config.delay_ms
                );
                sleep(config.delay()).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicU32, Ordering},
        time::{Duration, Instant},
    };

    use super::*;

    #[tokio::test]
    async fn test_succeeds_on_later_attempt() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig { max_attempts: 3, delay_ms: 20 };
        let started = Instant::now();

        let result = retry_fixed(&config, "test", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(format!("attempt {attempt} failed"))
                } else {
                    Ok("delivered")
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, ("delivered", 3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_exhausts_after_max_attempts_without_trailing_delay() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig { max_attempts: 3, delay_ms: 0 };

        let err = retry_fixed(&config, "test", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err::<(), _>(format!("boom {attempt}")) }
        })
        .await
        .unwrap_err();

        assert_eq!(err.attempts, 3);
        assert_eq!(err.last_error, "boom 3");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let config = RetryConfig { max_attempts: 0, delay_ms: 0 };

        let err = retry_fixed(&config, "test", |_| async { Err::<(), _>("nope") }).await.unwrap_err();

        assert_eq!(err.attempts, 1);
    }
}
