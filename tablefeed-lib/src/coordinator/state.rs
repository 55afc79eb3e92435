//! Coordinator state and output channels.

use chrono::DateTime;
use chrono::Utc;

use crate::channel::Channel;
use crate::config::MediatorConfig;
use crate::error::FetchError;

/// Snapshot of what the coordinator last did.
#[derive(Debug, Clone)]
pub struct CoordinatorState<O> {
    /// `true` between the start of a fetch and the handling of its result.
    pub loading: bool,
    /// The latest exhausted fetch failure. Cleared by the next successful fetch.
    pub last_error: Option<FetchError>,
    /// Rows of the latest result.
    pub rows: Vec<O>,
    /// Total count of the latest result; `None` until the first result.
    pub total: Option<i64>,
    /// When the latest result was handled.
    pub last_result_at: Option<DateTime<Utc>>,
}

impl<O> CoordinatorState<O> {
    pub(crate) fn new(loading: bool) -> Self {
        Self {
            loading,
            last_error: None,
            rows: Vec::new(),
            total: None,
            last_result_at: None,
        }
    }
}

/// The four source channels; the derived notifications filter these.
#[derive(Debug)]
pub(crate) struct Outputs<O> {
    pub rows: Channel<Vec<O>>,
    pub errors: Channel<FetchError>,
    pub loading: Channel<bool>,
    pub total: Channel<i64>,
}

impl<O: Clone + Send + 'static> Outputs<O> {
    pub(crate) fn new(config: &MediatorConfig) -> Self {
        Self {
            rows: Channel::new("rows"),
            errors: Channel::new("errors"),
            loading: Channel::replaying("loading", config.initial_loading),
            total: Channel::new("total_count"),
        }
    }

    /// Closes every channel. Returns the number of channels this call closed.
    pub(crate) fn close(&self) -> usize {
        [
            self.rows.close(),
            self.errors.close(),
            self.loading.close(),
            self.total.close(),
        ]
        .into_iter()
        .filter(|closed| *closed)
        .count()
    }
}
