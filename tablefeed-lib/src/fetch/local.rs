//! Client-side sorting and slicing.

use std::cmp::Ordering;
use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

use super::FetchOperation;
use super::FetchRequest;
use super::FetchResult;
use crate::controls::PageState;
use crate::controls::SortDirection;
use crate::error::FetchError;

/// Rows that can be compared by a named field.
pub trait Sortable {
    /// Compares `self` with `other` by `field`, ascending.
    fn compare_field(&self, other: &Self, field: &str) -> Ordering;
}

impl Sortable for Value {
    fn compare_field(&self, other: &Self, field: &str) -> Ordering {
        compare_values(self.get(field), other.get(field))
    }
}

/// Orders JSON values: missing/null < booleans < numbers < strings; arrays
/// and objects compare equal to each other.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) | Some(Value::Object(_)) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Sorts `rows` in place by `key` in `direction`.
///
/// Nothing happens without a key or with [`SortDirection::None`]. The sort is
/// stable, so ties keep their source order.
pub fn sort_rows<O: Sortable>(rows: &mut [O], key: Option<&str>, direction: SortDirection) {
    let Some(key) = key else {
        return;
    };
    match direction {
        SortDirection::None => {}
        SortDirection::Ascending => rows.sort_by(|a, b| a.compare_field(b, key)),
        SortDirection::Descending => rows.sort_by(|a, b| b.compare_field(a, key)),
    }
}

/// Returns the rows of `page`, i.e. `[index * size, (index + 1) * size)`.
pub fn slice_page<O>(rows: Vec<O>, page: PageState) -> Vec<O> {
    let range = page.range();
    rows.into_iter()
        .skip(range.start)
        .take(range.end - range.start)
        .collect()
}

/// Wraps a function that returns the entire, unsorted data set.
///
/// Each fetch loads the full set, sorts it by the requested column, and
/// returns the requested page with the unsliced length as the total count.
///
/// # Example
///
/// ```
/// use serde_json::{json, Value};
/// use tablefeed_lib::fetch::{FetchRequest, LocalFetch};
/// use tablefeed_lib::error::FetchError;
///
/// let fetch = LocalFetch::new(|_request: FetchRequest<()>| async move {
///     Ok::<_, FetchError>(vec![json!({ "name": "b" }), json!({ "name": "a" })])
/// });
/// ```
#[derive(Debug, Clone)]
pub struct LocalFetch<Func> {
    func: Func,
}

impl<Func> LocalFetch<Func> {
    pub fn new(func: Func) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F, O, Func, Fut> FetchOperation<F, O> for LocalFetch<Func>
where
    F: Clone + Send + Sync + 'static,
    O: Sortable + Send + 'static,
    Func: Fn(FetchRequest<F>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<O>, FetchError>> + Send + 'static,
{
    async fn fetch(&self, request: &FetchRequest<F>) -> Result<FetchResult<O>, FetchError> {
        let mut rows = (self.func)(request.clone()).await?;
        let total_count = i64::try_from(rows.len()).unwrap_or(i64::MAX);

        sort_rows(&mut rows, request.sort_key.as_deref(), request.sort_direction);
        Ok(FetchResult::new(slice_page(rows, request.page()), total_count))
    }
}
