//! Recovery from exhausted fetch failures.

use crate::error::FetchError;
use crate::error::MediatorError;
use crate::fetch::FetchResult;

/// Decides what the coordinator shows after a fetch exhausted its retries.
///
/// The error has already been published on the error channel when this runs.
/// Returning `Ok` keeps the pipeline running with the replacement result;
/// returning `Err` stops the pipeline until
/// [`FetchCoordinator::restart`](crate::FetchCoordinator::restart) is called.
pub trait ErrorHandler<O>: Send + Sync {
    fn handle_error(&self, error: &FetchError) -> Result<FetchResult<O>, MediatorError>;
}

/// Default handler: replaces the failed page with no rows and a total of `-1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentinelOnError;

impl<O> ErrorHandler<O> for SentinelOnError {
    fn handle_error(&self, _error: &FetchError) -> Result<FetchResult<O>, MediatorError> {
        Ok(FetchResult::sentinel())
    }
}
