//! Page state and the in-memory page control.

use std::sync::Arc;
use std::sync::RwLock;

use futures::stream::BoxStream;
use tokio::sync::broadcast;

use super::PageControl;
use super::change_stream;
use crate::stamp::Stamp;
use crate::stamp::Stamped;

/// The requested page at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    pub index: usize,
    pub size: usize,
}

impl PageState {
    /// A single page containing every row.
    pub const ALL: PageState = PageState {
        index: 0,
        size: usize::MAX,
    };

    /// Returns the half-open row range `[index * size, (index + 1) * size)`.
    pub fn range(&self) -> std::ops::Range<usize> {
        let start = self.index.saturating_mul(self.size);
        let end = self.index.saturating_add(1).saturating_mul(self.size);
        start..end
    }
}

impl Default for PageState {
    fn default() -> Self {
        Self::ALL
    }
}

#[derive(Debug)]
struct PaginatorInner {
    index: usize,
    size: usize,
    /// Total row count reported by the last fetch.
    length: i64,
    /// Stamp of the latest emitted change.
    last_change: Option<Stamp>,
}

impl PaginatorInner {
    /// Stamps the current page as a change. Called under the write lock so
    /// changes are stamped in the order they apply.
    fn stamp_change(&mut self) -> Stamped<PageState> {
        let change = Stamped::now(PageState {
            index: self.index,
            size: self.size,
        });
        self.last_change = Some(change.stamp);
        change
    }
}

/// In-memory page control.
///
/// Cheap to clone; all clones share the same state and change stream.
/// User-level navigation (`set_page`, `next_page`, ...) emits a change;
/// coordinator feedback (`set_index`, `set_length`) does not.
///
/// # Example
///
/// ```
/// use tablefeed_lib::controls::{PageControl, Paginator};
///
/// let paginator = Paginator::new(10);
/// paginator.set_length(42);
/// assert_eq!(paginator.page_count(), 5);
/// assert!(paginator.next_page());
/// assert_eq!(paginator.index(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Paginator {
    inner: Arc<RwLock<PaginatorInner>>,
    events: broadcast::Sender<Stamped<PageState>>,
}

impl Paginator {
    /// Creates a paginator on the first page with `size` rows per page.
    pub fn new(size: usize) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(RwLock::new(PaginatorInner {
                index: 0,
                size: size.max(1),
                length: 0,
                last_change: None,
            })),
            events,
        }
    }

    fn read<R>(&self, f: impl FnOnce(&PaginatorInner) -> R) -> R {
        match self.inner.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    fn write<R>(&self, f: impl FnOnce(&mut PaginatorInner) -> R) -> R {
        match self.inner.write() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    fn emit(&self, change: Stamped<PageState>) {
        let _ = self.events.send(change);
    }

    /// Total row count last fed back by the coordinator.
    pub fn length(&self) -> i64 {
        self.read(|inner| inner.length)
    }

    /// Number of pages for the current length (0 when the length is unknown or negative).
    pub fn page_count(&self) -> usize {
        self.read(|inner| {
            let length = usize::try_from(inner.length).unwrap_or(0);
            length.div_ceil(inner.size)
        })
    }

    /// Moves to `index` and emits a change if it differs from the current page.
    pub fn set_page(&self, index: usize) -> bool {
        let change = self.write(|inner| {
            if inner.index == index {
                return None;
            }
            inner.index = index;
            Some(inner.stamp_change())
        });
        match change {
            Some(change) => {
                self.emit(change);
                true
            }
            None => false,
        }
    }

    /// Changes the page size and emits a change.
    ///
    /// The index is adjusted so the first row of the current page stays visible.
    pub fn set_page_size(&self, size: usize) {
        let change = self.write(|inner| {
            let size = size.max(1);
            let first_row = inner.index.saturating_mul(inner.size);
            inner.index = first_row / size;
            inner.size = size;
            inner.stamp_change()
        });
        self.emit(change);
    }

    /// Advances one page if there is one. Returns `true` if the page changed.
    pub fn next_page(&self) -> bool {
        let index = self.index();
        if index + 1 < self.page_count() {
            self.set_page(index + 1)
        } else {
            false
        }
    }

    /// Goes back one page if possible. Returns `true` if the page changed.
    pub fn previous_page(&self) -> bool {
        match self.index().checked_sub(1) {
            Some(index) => self.set_page(index),
            None => false,
        }
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PageControl for Paginator {
    fn changes(&self) -> BoxStream<'static, Stamped<PageState>> {
        change_stream(self.events.subscribe())
    }

    fn index(&self) -> usize {
        self.read(|inner| inner.index)
    }

    fn size(&self) -> usize {
        self.read(|inner| inner.size)
    }

    fn set_index(&self, index: usize) {
        self.write(|inner| inner.index = index);
    }

    fn set_length(&self, length: i64) {
        self.write(|inner| inner.length = length);
    }

    fn reset_index(&self, emitted: Stamp) {
        self.write(|inner| {
            if inner.last_change.is_none_or(|change| change < emitted) {
                inner.index = 0;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[test]
    fn test_range() {
        assert_eq!(PageState { index: 2, size: 5 }.range(), 10..15);
        assert_eq!(PageState::ALL.range(), 0..usize::MAX);
    }

    #[test]
    fn test_page_count_ignores_sentinel() {
        let paginator = Paginator::new(4);
        paginator.set_length(-1);
        assert_eq!(paginator.page_count(), 0);
        paginator.set_length(9);
        assert_eq!(paginator.page_count(), 3);
    }

    #[test]
    fn test_set_page_size_keeps_first_row() {
        let paginator = Paginator::new(10);
        paginator.set_page(3);
        paginator.set_page_size(25);
        assert_eq!(paginator.index(), 1);
        assert_eq!(paginator.size(), 25);
    }

    #[tokio::test]
    async fn test_changes_carry_emitted_page() {
        let paginator = Paginator::new(10);
        let mut changes = paginator.changes();
        paginator.set_page(4);
        paginator.set_index(0);

        let change = changes.next().await.unwrap();
        assert_eq!(change.value, PageState { index: 4, size: 10 });
        assert_eq!(paginator.index(), 0);
    }

    #[test]
    fn test_reset_keeps_newer_navigation() {
        let paginator = Paginator::new(10);
        let trigger = Stamp::next();
        paginator.set_page(3);
        paginator.reset_index(trigger);
        assert_eq!(paginator.index(), 3);

        paginator.reset_index(Stamp::next());
        assert_eq!(paginator.index(), 0);
    }

    #[test]
    fn test_navigation_bounds() {
        let paginator = Paginator::new(2);
        paginator.set_length(3);
        assert!(!paginator.previous_page());
        assert!(paginator.next_page());
        assert!(!paginator.next_page());
        assert!(!paginator.set_page(1));
    }
}
