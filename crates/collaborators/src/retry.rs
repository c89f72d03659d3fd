use std::future::Future;
use std::time::Duration;

/// Retries `op` up to `max_retries` additional times with exponential
/// backoff, starting at `base_delay` and doubling each attempt (spec §5:
/// "holding sync default 30s with 3 retries and exponential backoff; price
/// fetch similar"). Returns the last error if every attempt fails.
///
/// This is the one piece of ambient infrastructure every collaborator call
/// shares (`collaborators::http`'s holding-sync and price-fetch paths both
/// wrap their requests in it), mirroring the single `sign_request` helper
/// `api-client::auth` gives every signed Binance call in the teacher repo.
pub async fn with_retry<T, E, F, Fut>(max_retries: u32, base_delay: Duration, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_retries => {
                let delay = base_delay * 2u32.pow(attempt);
                tracing::warn!(attempt, %err, delay_ms = delay.as_millis() as u64, "collaborator call failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = with_retry(3, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err("transient".to_string())
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn returns_last_error_after_exhausting_retries() {
        let result: Result<u32, String> =
            with_retry(2, Duration::from_millis(1), || async { Err("still failing".to_string()) }).await;
        assert_eq!(result, Err("still failing".to_string()));
    }
}
