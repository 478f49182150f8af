use super::ApiError;
use std::future::Future;

/// Run `make_request` and re-run it up to `max_retries` more times while it
/// fails.
///
/// Retries are immediate and sequential: the next attempt starts only after
/// the previous one has failed. The last error is returned once the budget is
/// spent, so `max_retries = 3` means at most 4 requests.
pub async fn retry<T, F, Fut>(
    max_retries: u32,
    call_site: &'static str,
    mut make_request: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut retry_count = 0;

    loop {
        match make_request().await {
            Ok(value) => return Ok(value),
            Err(e) if retry_count < max_retries => {
                retry_count += 1;
                tracing::debug!(
                    call_site,
                    error = %e,
                    retry = retry_count,
                    max_retries,
                    "Request failed, retrying"
                );
            }
            Err(e) => return Err(e),
        }
    }
}

/// Swap a failed result for `fallback`, logging the failure.
///
/// Failures never reach the consumer; they degrade to "no data this round".
pub fn or_fallback<T>(call_site: &'static str, result: Result<T, ApiError>, fallback: T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(call_site, error = %e, "Request failed, using fallback value");
            fallback
        }
    }
}
