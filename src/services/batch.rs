//! Batch helpers: chunked concurrency and retry with backoff

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use rand::Rng;

/// Run `task` over `items`, `chunk_size` at a time
///
/// Futures within a chunk run concurrently; chunks run one after another.
/// `on_chunk` receives the number of finished items and the total after each
/// chunk. Results keep the input order.
pub async fn process_in_chunks<T, R, F, Fut>(
    items: Vec<T>,
    chunk_size: usize,
    task: F,
    mut on_chunk: impl FnMut(usize, usize),
) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let total = items.len();
    let chunk_size = chunk_size.max(1);
    let mut results = Vec::with_capacity(total);
    let mut items = items.into_iter().peekable();

    while items.peek().is_some() {
        let chunk: Vec<Fut> = items.by_ref().take(chunk_size).map(&task).collect();
        results.extend(join_all(chunk).await);
        on_chunk(results.len(), total);
    }

    results
}

/// Tunable parameters for retrying with exponential backoff
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

/// Delay before attempt `attempt + 1` (attempts count from 1)
///
/// Exponential in the attempt number, clamped to `max_delay`, plus up to
/// 10% random jitter.
pub fn backoff_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let exponent = attempt.saturating_sub(1) as i32;
    let base_ms = config.initial_delay.as_millis() as f64 * config.multiplier.powi(exponent);
    let base_ms = base_ms.min(config.max_delay.as_millis() as f64);
    let jitter_ms = if base_ms >= 1.0 {
        rand::rng().random_range(0.0..base_ms * 0.1)
    } else {
        0.0
    };
    Duration::from_millis((base_ms + jitter_ms) as u64)
}

/// Retry `operation` until it succeeds or `max_attempts` is reached
///
/// Returns the last error once attempts are exhausted.
pub async fn retry_with_backoff<T, E, F, Fut>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= config.max_attempts.max(1) => return Err(e),
            Err(e) => {
                let delay = backoff_delay(attempt, config);
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
