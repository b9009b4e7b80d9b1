//! Shared utility functions.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};

use crate::{tflog_warn, Error, Result};

/// Run `fut` on the runtime and wait at most `duration` for it.
///
/// Returns `None` when the deadline passes first. The spawned future is
/// detached rather than aborted and keeps running to completion.
pub async fn spawn_with_timeout<F, T>(duration: Duration, fut: F) -> Option<Result<T>>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    match timeout(duration, tokio::spawn(fut)).await {
        Ok(Ok(inner)) => Some(inner),
        Ok(Err(join_err)) => Some(Err(Error::TaskJoin(join_err.to_string()))),
        Err(_) => None,
    }
}

/// Retry a fallible async operation.
///
/// The operation runs once and then up to `retries` more times, sleeping
/// `delay` before each retry. The last error is returned once retries run out.
pub async fn retry<F, Fut, T>(retries: u32, delay: Duration, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut remaining = retries;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if remaining > 0 => {
                tflog_warn!(
                    "[{}] Retrying after error: {} ({} attempts left)",
                    label,
                    e,
                    remaining
                );
                remaining -= 1;
                sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
