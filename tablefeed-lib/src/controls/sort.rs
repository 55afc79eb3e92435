//! Sort state and the in-memory sort control.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::RwLock;

use futures::stream::BoxStream;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::broadcast;

use super::SortControl;
use super::change_stream;
use crate::stamp::Stamped;

/// Direction of a sort.
///
/// `None` means "do not sort"; fetch operations must leave rows in source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
    #[default]
    None,
}

impl SortDirection {
    /// Returns `true` if rows should be sorted.
    pub fn is_sorted(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Returns the direction that follows this one when a header is clicked
    /// repeatedly: ascending → descending → none → ascending.
    pub fn cycle(&self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::None,
            Self::None => Self::Ascending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
            Self::None => "",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown sort direction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown sort direction: {0}")]
pub struct ParseSortDirectionError(String);

impl FromStr for SortDirection {
    type Err = ParseSortDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            "" | "none" => Ok(Self::None),
            other => Err(ParseSortDirectionError(other.to_string())),
        }
    }
}

/// The sorted column and direction at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortState {
    pub active: Option<String>,
    pub direction: SortDirection,
}

impl SortState {
    /// Creates a sort on `column` in `direction`.
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            active: Some(column.into()),
            direction,
        }
    }
}

/// In-memory sort control.
///
/// Cheap to clone; all clones share the same state and change stream.
///
/// # Example
///
/// ```
/// use tablefeed_lib::controls::{SortControl, SortDirection, SortHandle};
///
/// let sort = SortHandle::new();
/// sort.toggle("name");
/// assert_eq!(sort.active().as_deref(), Some("name"));
/// assert_eq!(sort.direction(), SortDirection::Ascending);
/// ```
#[derive(Debug, Clone)]
pub struct SortHandle {
    state: Arc<RwLock<SortState>>,
    events: broadcast::Sender<Stamped<SortState>>,
}

impl SortHandle {
    /// Creates a control with no active sort.
    pub fn new() -> Self {
        Self::with_state(SortState::default())
    }

    /// Creates a control with an initial sort. No change is emitted.
    pub fn with_state(state: SortState) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: Arc::new(RwLock::new(state)),
            events,
        }
    }

    /// Sets the sort and emits a change.
    pub fn set_sort(&self, column: impl Into<String>, direction: SortDirection) {
        self.replace(SortState::new(column, direction));
    }

    /// Clears the sort and emits a change.
    pub fn clear(&self) {
        self.replace(SortState::default());
    }

    /// Toggles the sort for `column` and emits a change.
    ///
    /// A different column starts ascending; the same column cycles its direction.
    pub fn toggle(&self, column: &str) -> SortState {
        let next = {
            let current = self.get();
            match current.active.as_deref() {
                Some(active) if active == column => SortState::new(column, current.direction.cycle()),
                _ => SortState::new(column, SortDirection::Ascending),
            }
        };
        self.replace(next.clone());
        next
    }

    /// Returns the current sort.
    pub fn get(&self) -> SortState {
        self.read(|state| state.clone())
    }

    fn read<R>(&self, f: impl FnOnce(&SortState) -> R) -> R {
        match self.state.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    fn write<R>(&self, f: impl FnOnce(&mut SortState) -> R) -> R {
        match self.state.write() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    fn replace(&self, next: SortState) {
        // Stamp under the lock so concurrent changes are stamped in the order they apply.
        let change = self.write(|state| {
            *state = next;
            Stamped::now(state.clone())
        });
        let _ = self.events.send(change);
    }
}

impl Default for SortHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SortControl for SortHandle {
    fn changes(&self) -> BoxStream<'static, Stamped<SortState>> {
        change_stream(self.events.subscribe())
    }

    fn active(&self) -> Option<String> {
        self.get().active
    }

    fn direction(&self) -> SortDirection {
        self.get().direction
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[test]
    fn test_parse_direction() {
        assert_eq!("asc".parse::<SortDirection>(), Ok(SortDirection::Ascending));
        assert_eq!("Descending".parse::<SortDirection>(), Ok(SortDirection::Descending));
        assert_eq!("".parse::<SortDirection>(), Ok(SortDirection::None));
        assert!("sideways".parse::<SortDirection>().is_err());
    }

    #[test]
    fn test_toggle_cycles_same_column() {
        let sort = SortHandle::new();
        assert_eq!(sort.toggle("age").direction, SortDirection::Ascending);
        assert_eq!(sort.toggle("age").direction, SortDirection::Descending);
        assert_eq!(sort.toggle("age").direction, SortDirection::None);
        assert_eq!(sort.toggle("name"), SortState::new("name", SortDirection::Ascending));
    }

    #[tokio::test]
    async fn test_changes_emit_on_set() {
        let sort = SortHandle::new();
        let mut changes = sort.changes();
        sort.set_sort("name", SortDirection::Descending);
        sort.clear();

        let first = changes.next().await.unwrap();
        let second = changes.next().await.unwrap();
        assert_eq!(first.value, SortState::new("name", SortDirection::Descending));
        assert_eq!(second.value, SortState::default());
        assert!(first.stamp < second.stamp);
        assert_eq!(sort.snapshot(), SortState::default());
    }

    #[test]
    fn test_poisoned_lock_still_updates() {
        let sort = SortHandle::new();
        let poisoner = sort.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.state.write().unwrap();
            panic!("poison the sort state");
        })
        .join();

        assert!(sort.state.is_poisoned());
        sort.set_sort("name", SortDirection::Ascending);
        assert_eq!(sort.get(), SortState::new("name", SortDirection::Ascending));
    }
}
