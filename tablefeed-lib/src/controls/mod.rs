//! Collaborator interfaces.
//!
//! The coordinator talks to three externally-owned collaborators: a sort
//! control, a page control and a display surface. Each is a trait so any
//! widget toolkit can plug in. The sort and page controls are optional; the
//! null objects [`NoSort`] and [`SinglePage`] stand in when they are absent.
//!
//! In-memory implementations ([`SortHandle`], [`Paginator`], [`TableSurface`])
//! are provided for headless use and tests.

mod paginator;
mod sort;
mod surface;

pub use paginator::*;
pub use sort::*;
pub use surface::*;

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::stamp::Stamp;
use crate::stamp::Stamped;

/// A control that emits sort changes and exposes the current sort.
pub trait SortControl: Send + Sync {
    /// Stream of sort changes. Each change carries the sort as it was when the
    /// change was emitted. Each call returns a new subscription.
    fn changes(&self) -> BoxStream<'static, Stamped<SortState>>;

    /// The currently sorted column, if any.
    fn active(&self) -> Option<String>;

    /// The current sort direction.
    fn direction(&self) -> SortDirection;

    /// Snapshot of the current sort.
    fn snapshot(&self) -> SortState {
        SortState {
            active: self.active(),
            direction: self.direction(),
        }
    }
}

/// A control that emits page changes, exposes the current page and accepts
/// feedback from the coordinator.
pub trait PageControl: Send + Sync {
    /// Stream of page changes. Each change carries the page as it was when the
    /// change was emitted. Each call returns a new subscription.
    fn changes(&self) -> BoxStream<'static, Stamped<PageState>>;

    /// Zero-based index of the current page.
    fn index(&self) -> usize;

    /// Number of rows per page.
    fn size(&self) -> usize;

    /// Sets the current page index without emitting a change.
    fn set_index(&self, index: usize);

    /// Sets the total number of rows (`-1` after a failed fetch).
    fn set_length(&self, length: i64);

    /// Resets the index to 0 for a trigger or sort change emitted at `emitted`.
    ///
    /// Controls that stamp their own changes should keep their index when
    /// they changed after `emitted`.
    fn reset_index(&self, emitted: Stamp) {
        let _ = emitted;
        self.set_index(0);
    }

    /// Snapshot of the current page.
    fn snapshot(&self) -> PageState {
        PageState {
            index: self.index(),
            size: self.size(),
        }
    }
}

/// Sort control used when none is supplied: never changes, never sorts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSort;

impl SortControl for NoSort {
    fn changes(&self) -> BoxStream<'static, Stamped<SortState>> {
        futures::stream::empty().boxed()
    }

    fn active(&self) -> Option<String> {
        None
    }

    fn direction(&self) -> SortDirection {
        SortDirection::None
    }
}

/// Page control used when none is supplied: one page holding every row.
#[derive(Debug, Clone, Copy, Default)]
pub struct SinglePage;

impl PageControl for SinglePage {
    fn changes(&self) -> BoxStream<'static, Stamped<PageState>> {
        futures::stream::empty().boxed()
    }

    fn index(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        PageState::ALL.size
    }

    fn set_index(&self, _index: usize) {}

    fn set_length(&self, _length: i64) {}
}

/// Turns a broadcast receiver of stamped changes into a stream.
///
/// A lagging subscriber skips the changes it missed; the newest change is
/// always delivered.
pub(crate) fn change_stream<T: Clone + Send + 'static>(
    mut receiver: broadcast::Receiver<Stamped<T>>,
) -> BoxStream<'static, Stamped<T>> {
    async_stream::stream! {
        loop {
            match receiver.recv().await {
                Ok(change) => yield change,
                Err(RecvError::Lagged(skipped)) => {
                    log::debug!("Control subscriber lagged, skipped {} change(s)", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
    .boxed()
}
