//! Direct passthrough fetch.

use std::future::Future;

use async_trait::async_trait;

use super::FetchOperation;
use super::FetchRequest;
use super::FetchResult;
use crate::error::FetchError;

/// Wraps a function that returns exactly the requested page.
///
/// # Example
///
/// ```
/// use tablefeed_lib::fetch::{BasicFetch, FetchRequest, FetchResult};
/// use tablefeed_lib::error::FetchError;
///
/// let fetch = BasicFetch::new(|request: FetchRequest<String>| async move {
///     let rows = vec![format!("page {}", request.page_index)];
///     Ok::<_, FetchError>(FetchResult::new(rows, 100))
/// });
/// ```
#[derive(Debug, Clone)]
pub struct BasicFetch<Func> {
    func: Func,
}

impl<Func> BasicFetch<Func> {
    pub fn new(func: Func) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F, O, Func, Fut> FetchOperation<F, O> for BasicFetch<Func>
where
    F: Clone + Send + Sync + 'static,
    O: Send + 'static,
    Func: Fn(FetchRequest<F>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<FetchResult<O>, FetchError>> + Send + 'static,
{
    async fn fetch(&self, request: &FetchRequest<F>) -> Result<FetchResult<O>, FetchError> {
        (self.func)(request.clone()).await
    }
}
