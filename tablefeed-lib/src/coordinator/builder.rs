//! Typestate builder for [`FetchCoordinator`].

use std::marker::PhantomData;
use std::sync::Arc;

use futures::Stream;
use futures::StreamExt;
use futures::stream::BoxStream;

use super::ErrorHandler;
use super::FetchCoordinator;
use super::SentinelOnError;
use crate::config::MediatorConfig;
use crate::controls::DisplaySurface;
use crate::controls::NoSort;
use crate::controls::PageControl;
use crate::controls::SinglePage;
use crate::controls::SortControl;
use crate::fetch::FetchOperation;
use crate::stamp::Stamped;

/// Marker type for missing required builder fields.
pub struct Missing;

/// Marker type for set builder fields.
pub struct Set<T>(T);

/// Builder for constructing a [`FetchCoordinator`].
///
/// Uses the typestate pattern to ensure required fields are set at compile time.
///
/// # Required Fields
///
/// - `operation` - The [`FetchOperation`] that loads a page
/// - `trigger` - The stream of trigger payloads
/// - `surface` - The [`DisplaySurface`] that shows the rows
///
/// The sort control and paginator are optional; without them the coordinator
/// requests unsorted data and a single page holding every row.
pub struct FetchCoordinatorBuilder<F, O, Op, Trig, Surf> {
    operation: Op,
    trigger: Trig,
    surface: Surf,
    sort: Option<Arc<dyn SortControl>>,
    page: Option<Arc<dyn PageControl>>,
    error_handler: Option<Arc<dyn ErrorHandler<O>>>,
    config: MediatorConfig,
    _payload: PhantomData<fn() -> F>,
}

impl<F, O> FetchCoordinatorBuilder<F, O, Missing, Missing, Missing> {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            operation: Missing,
            trigger: Missing,
            surface: Missing,
            sort: None,
            page: None,
            error_handler: None,
            config: MediatorConfig::default(),
            _payload: PhantomData,
        }
    }
}

impl<F, O> Default for FetchCoordinatorBuilder<F, O, Missing, Missing, Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F, O, T, S> FetchCoordinatorBuilder<F, O, Missing, T, S> {
    /// Sets the operation that loads a page.
    pub fn operation<Op: FetchOperation<F, O> + 'static>(
        self,
        operation: Op,
    ) -> FetchCoordinatorBuilder<F, O, Set<Arc<dyn FetchOperation<F, O>>>, T, S> {
        FetchCoordinatorBuilder {
            operation: Set(Arc::new(operation) as Arc<dyn FetchOperation<F, O>>),
            trigger: self.trigger,
            surface: self.surface,
            sort: self.sort,
            page: self.page,
            error_handler: self.error_handler,
            config: self.config,
            _payload: PhantomData,
        }
    }
}

impl<F, O, P, S> FetchCoordinatorBuilder<F, O, P, Missing, S> {
    /// Sets the trigger stream.
    ///
    /// Each emitted payload resets the page to 0 and starts a fetch. Use
    /// [`trigger::immediate`](crate::trigger::immediate) to fetch right away,
    /// [`trigger::channel`](crate::trigger::channel) to fetch on demand, or
    /// [`trigger::from_stream`](crate::trigger::from_stream) to adapt another
    /// payload stream.
    pub fn trigger(
        self,
        trigger: impl Stream<Item = Stamped<Option<F>>> + Send + 'static,
    ) -> FetchCoordinatorBuilder<F, O, P, Set<BoxStream<'static, Stamped<Option<F>>>>, S> {
        FetchCoordinatorBuilder {
            operation: self.operation,
            trigger: Set(trigger.boxed()),
            surface: self.surface,
            sort: self.sort,
            page: self.page,
            error_handler: self.error_handler,
            config: self.config,
            _payload: PhantomData,
        }
    }
}

impl<F, O, P, T> FetchCoordinatorBuilder<F, O, P, T, Missing> {
    /// Sets the surface that displays the rows.
    pub fn surface<S: DisplaySurface<O> + 'static>(
        self,
        surface: S,
    ) -> FetchCoordinatorBuilder<F, O, P, T, Set<Arc<dyn DisplaySurface<O>>>> {
        FetchCoordinatorBuilder {
            operation: self.operation,
            trigger: self.trigger,
            surface: Set(Arc::new(surface) as Arc<dyn DisplaySurface<O>>),
            sort: self.sort,
            page: self.page,
            error_handler: self.error_handler,
            config: self.config,
            _payload: PhantomData,
        }
    }
}

impl<F, O, P, T, S> FetchCoordinatorBuilder<F, O, P, T, S> {
    /// Sets the sort control.
    pub fn sort(mut self, sort: impl SortControl + 'static) -> Self {
        self.sort = Some(Arc::new(sort));
        self
    }

    /// Sets the page control.
    pub fn paginator(mut self, paginator: impl PageControl + 'static) -> Self {
        self.page = Some(Arc::new(paginator));
        self
    }

    /// Sets how exhausted fetch failures are recovered.
    ///
    /// Defaults to [`SentinelOnError`].
    pub fn error_handler(mut self, handler: impl ErrorHandler<O> + 'static) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Sets the number of silent retries before a failure is published.
    pub fn attempts(mut self, attempts: u32) -> Self {
        self.config.attempts = attempts;
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: MediatorConfig) -> Self {
        self.config = config;
        self
    }
}

impl<F, O>
    FetchCoordinatorBuilder<
        F,
        O,
        Set<Arc<dyn FetchOperation<F, O>>>,
        Set<BoxStream<'static, Stamped<Option<F>>>>,
        Set<Arc<dyn DisplaySurface<O>>>,
    >
where
    F: Clone + Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
{
    /// Builds the coordinator. Call [`FetchCoordinator::activate`] to start it.
    pub fn build(self) -> FetchCoordinator<F, O> {
        FetchCoordinator::from_parts(
            self.operation.0,
            self.trigger.0,
            self.surface.0,
            self.sort.unwrap_or_else(|| Arc::new(NoSort)),
            self.page.unwrap_or_else(|| Arc::new(SinglePage)),
            self.error_handler
                .unwrap_or_else(|| Arc::new(SentinelOnError)),
            self.config,
        )
    }
}
