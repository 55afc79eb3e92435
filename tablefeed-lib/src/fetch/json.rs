//! Untyped JSON fetch with structural validation.

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::FetchOperation;
use super::FetchRequest;
use super::FetchResult;
use crate::error::FetchError;
use crate::error::MalformedResult;

/// Fields a JSON result must carry.
pub const REQUIRED_FIELDS: [&str; 2] = ["rows", "totalCount"];

impl<O: DeserializeOwned> FetchResult<O> {
    /// Builds a result from untyped JSON.
    ///
    /// A value lacking `rows` or `totalCount` is a [`FetchError::Malformed`]
    /// naming the missing fields; a value with the right shape but wrong
    /// field types is a plain [`FetchError::Failed`].
    pub fn from_json(value: Value) -> Result<Self, FetchError> {
        let missing: Vec<&'static str> = REQUIRED_FIELDS
            .into_iter()
            .filter(|field| value.get(field).is_none())
            .collect();

        if !missing.is_empty() {
            let rendered = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
            return Err(MalformedResult::new(missing, &rendered).into());
        }

        Ok(serde_json::from_value(value)?)
    }
}

/// Wraps a function that returns untyped JSON shaped like
/// `{"rows": [...], "totalCount": n}`.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use tablefeed_lib::fetch::{FetchRequest, JsonFetch};
/// use tablefeed_lib::error::FetchError;
///
/// let fetch = JsonFetch::<_, String>::new(|_request: FetchRequest<()>| async move {
///     Ok::<_, FetchError>(json!({ "rows": ["a", "b"], "totalCount": 2 }))
/// });
/// ```
pub struct JsonFetch<Func, O> {
    func: Func,
    _rows: PhantomData<fn() -> O>,
}

impl<Func, O> JsonFetch<Func, O> {
    pub fn new(func: Func) -> Self {
        Self {
            func,
            _rows: PhantomData,
        }
    }
}

#[async_trait]
impl<F, O, Func, Fut> FetchOperation<F, O> for JsonFetch<Func, O>
where
    F: Clone + Send + Sync + 'static,
    O: DeserializeOwned + Send + 'static,
    Func: Fn(FetchRequest<F>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, FetchError>> + Send + 'static,
{
    async fn fetch(&self, request: &FetchRequest<F>) -> Result<FetchResult<O>, FetchError> {
        let value = (self.func)(request.clone()).await?;
        FetchResult::from_json(value)
    }
}
