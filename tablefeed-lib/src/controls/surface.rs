//! Display surface interface and the in-memory table surface.

use std::fmt;
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

/// Maps a row and its position to a stable key, used by renderers to track rows.
pub type RowIdentity<O> = Arc<dyn Fn(usize, &O) -> u64 + Send + Sync>;

/// The default row identity: the row's position in the current page.
pub fn positional<O>() -> RowIdentity<O> {
    Arc::new(|index: usize, _: &O| index as u64)
}

/// Where fetched rows are displayed.
pub trait DisplaySurface<O>: Send + Sync {
    /// Replaces the displayed rows.
    fn set_rows(&self, rows: Vec<O>);

    /// Returns `true` if a row identity function is already configured.
    fn has_row_identity(&self) -> bool;

    /// Configures the row identity function.
    fn set_row_identity(&self, identity: RowIdentity<O>);
}

struct SurfaceInner<O> {
    rows: Vec<O>,
    identity: Option<RowIdentity<O>>,
}

/// In-memory display surface.
///
/// Cheap to clone; all clones share the same rows. A dirty flag records
/// whether rows changed since the last [`clear_dirty`](Self::clear_dirty).
pub struct TableSurface<O> {
    inner: Arc<RwLock<SurfaceInner<O>>>,
    dirty: Arc<AtomicBool>,
}

impl<O> TableSurface<O> {
    /// Creates an empty surface without a row identity.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(SurfaceInner {
                rows: Vec::new(),
                identity: None,
            })),
            dirty: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates an empty surface with a custom row identity.
    pub fn with_row_identity(identity: impl Fn(usize, &O) -> u64 + Send + Sync + 'static) -> Self {
        let surface = Self::new();
        surface.write(|inner| inner.identity = Some(Arc::new(identity)));
        surface
    }

    fn read<R>(&self, f: impl FnOnce(&SurfaceInner<O>) -> R) -> R {
        match self.inner.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    fn write<R>(&self, f: impl FnOnce(&mut SurfaceInner<O>) -> R) -> R {
        match self.inner.write() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    /// Returns a clone of the displayed rows.
    pub fn rows(&self) -> Vec<O>
    where
        O: Clone,
    {
        self.read(|inner| inner.rows.clone())
    }

    /// Number of displayed rows.
    pub fn len(&self) -> usize {
        self.read(|inner| inner.rows.len())
    }

    /// Returns `true` if no rows are displayed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys of the displayed rows, or `None` if no identity is configured.
    pub fn row_keys(&self) -> Option<Vec<u64>> {
        self.read(|inner| {
            let identity = inner.identity.as_ref()?;
            Some(
                inner
                    .rows
                    .iter()
                    .enumerate()
                    .map(|(index, row)| identity(index, row))
                    .collect(),
            )
        })
    }

    /// Check if rows changed since the last check.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Clear the dirty flag.
    pub fn clear_dirty(&self) {
        self.dirty.store(false, Ordering::SeqCst);
    }
}

impl<O> Clone for TableSurface<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            dirty: Arc::clone(&self.dirty),
        }
    }
}

impl<O> Default for TableSurface<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> fmt::Debug for TableSurface<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableSurface")
            .field("rows", &self.len())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

impl<O: Send + Sync> DisplaySurface<O> for TableSurface<O> {
    fn set_rows(&self, rows: Vec<O>) {
        self.write(|inner| inner.rows = rows);
        self.dirty.store(true, Ordering::SeqCst);
    }

    fn has_row_identity(&self) -> bool {
        self.read(|inner| inner.identity.is_some())
    }

    fn set_row_identity(&self, identity: RowIdentity<O>) {
        self.write(|inner| inner.identity = Some(identity));
    }
}
