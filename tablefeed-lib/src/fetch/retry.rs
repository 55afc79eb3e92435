//! Retrying a fetch attempt.

use super::FetchOperation;
use super::FetchRequest;
use super::FetchResult;
use crate::config::MediatorConfig;
use crate::error::FetchError;

/// Runs `operation` for `request`, retrying failures up to `config.attempts`
/// additional times.
///
/// Intermediate failures are only logged. Malformed results are returned
/// immediately without retrying.
pub(crate) async fn fetch_with_retry<F, O>(
    operation: &dyn FetchOperation<F, O>,
    request: &FetchRequest<F>,
    config: &MediatorConfig,
    label: &str,
) -> Result<FetchResult<O>, FetchError> {
    let mut retries = 0;
    loop {
        let error = match operation.fetch(request).await {
            Ok(result) => return Ok(result),
            Err(error) => error,
        };

        if !error.is_retryable() || retries >= config.attempts {
            return Err(error);
        }

        retries += 1;
        let delay = config.delay_for(retries);
        log::debug!(
            "[{}] fetch failed, retry {}/{} in {:?}: {}",
            label,
            retries,
            config.attempts,
            delay,
            error
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
