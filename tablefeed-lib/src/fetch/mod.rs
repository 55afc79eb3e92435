//! Fetch requests, results and operations.
//!
//! A [`FetchOperation`] turns one [`FetchRequest`] into one [`FetchResult`].
//! Three adapters cover the common shapes of caller code:
//!
//! - [`BasicFetch`]: the caller already returns exactly the requested page.
//! - [`LocalFetch`]: the caller returns the whole data set; sorting and
//!   slicing happen in memory.
//! - [`JsonFetch`]: the caller returns untyped JSON that is checked for the
//!   required `rows` / `totalCount` fields before use.

mod basic;
mod json;
mod local;
mod retry;

pub use basic::*;
pub use json::*;
pub use local::*;
pub(crate) use retry::fetch_with_retry;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use crate::controls::PageState;
use crate::controls::SortDirection;
use crate::controls::SortState;
use crate::error::FetchError;

/// Total count reported when a fetch failed after exhausting its retries.
pub const SENTINEL_TOTAL: i64 = -1;

/// Arguments for one fetch attempt, built from the latest trigger payload,
/// sort and page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest<F> {
    /// Latest trigger payload (`None` when the trigger emitted no value).
    pub payload: Option<F>,
    /// Column to sort by.
    pub sort_key: Option<String>,
    /// Sort direction; [`SortDirection::None`] means "do not sort".
    pub sort_direction: SortDirection,
    /// Zero-based page index.
    pub page_index: usize,
    /// Rows per page.
    pub page_size: usize,
}

impl<F> FetchRequest<F> {
    /// Creates a request from its parts.
    pub fn new(payload: Option<F>, sort: SortState, page: PageState) -> Self {
        Self {
            payload,
            sort_key: sort.active,
            sort_direction: sort.direction,
            page_index: page.index,
            page_size: page.size,
        }
    }

    /// The requested sort.
    pub fn sort(&self) -> SortState {
        SortState {
            active: self.sort_key.clone(),
            direction: self.sort_direction,
        }
    }

    /// The requested page.
    pub fn page(&self) -> PageState {
        PageState {
            index: self.page_index,
            size: self.page_size,
        }
    }
}

/// One page of rows plus the total number of rows available.
///
/// `total_count` is authoritative even when `rows` holds fewer entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResult<O> {
    pub rows: Vec<O>,
    pub total_count: i64,
}

impl<O> FetchResult<O> {
    /// Creates a result.
    pub fn new(rows: Vec<O>, total_count: i64) -> Self {
        Self { rows, total_count }
    }

    /// The replacement result used after a fetch exhausted its retries.
    pub fn sentinel() -> Self {
        Self {
            rows: Vec::new(),
            total_count: SENTINEL_TOTAL,
        }
    }

    /// Returns `true` if this is the failure sentinel.
    pub fn is_sentinel(&self) -> bool {
        self.total_count == SENTINEL_TOTAL
    }
}

/// The caller-supplied data source.
///
/// Implementations must treat [`SortDirection::None`] as "do not sort".
/// Returning [`FetchError::Failed`] lets the coordinator retry; returning
/// [`FetchError::Malformed`] stops the coordinator's pipeline.
#[async_trait]
pub trait FetchOperation<F, O>: Send + Sync {
    async fn fetch(&self, request: &FetchRequest<F>) -> Result<FetchResult<O>, FetchError>;
}
