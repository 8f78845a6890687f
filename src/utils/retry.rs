use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

/// Run `op` up to `attempts` times, sleeping `backoff * attempt` between tries.
pub async fn with_retry<T, E, F, Fut>(attempts: u32, backoff: Duration, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                tracing::warn!(attempt, max_attempts = attempts, error = %e, "Operation failed, retrying");
                tokio::time::sleep(backoff * attempt).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
