use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// Fixed-budget retry: `attempts` tries separated by a constant `delay`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds, fails with an error `retryable` rejects,
    /// or the attempt budget is spent. The last error is returned.
    pub async fn run<T, E, F, Fut, P>(&self, mut op: F, retryable: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < attempts && retryable(&err) => {
                    debug!("Attempt {attempt}/{attempts} failed: {err}");
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn instant() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = Cell::new(0);
        let result: Result<u32, String> = instant()
            .run(
                || {
                    calls.set(calls.get() + 1);
                    let n = calls.get();
                    async move {
                        if n < 3 {
                            Err("flaky".to_string())
                        } else {
                            Ok(n)
                        }
                    }
                },
                |_| true,
            )
            .await;
        assert_eq!(result, Ok(3));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let calls = Cell::new(0);
        let result: Result<(), String> = instant()
            .run(
                || {
                    calls.set(calls.get() + 1);
                    async { Err("down".to_string()) }
                },
                |_| true,
            )
            .await;
        assert_eq!(result, Err("down".to_string()));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_fatal_error_is_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), String> = instant()
            .run(
                || {
                    calls.set(calls.get() + 1);
                    async { Err("404".to_string()) }
                },
                |e| e != "404",
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }
}
