//! The fetch coordinator.

mod builder;
mod driver;
mod recovery;
mod state;

pub use builder::*;
pub use recovery::*;
pub use state::CoordinatorState;

use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::RwLock;

use chrono::Utc;
use futures::StreamExt;
use futures::future::ready;
use futures::stream::BoxStream;
use tokio::sync::mpsc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::config::MediatorConfig;
use crate::controls::DisplaySurface;
use crate::controls::PageControl;
use crate::controls::SortControl;
use crate::controls::positional;
use crate::error::FetchError;
use crate::error::MediatorError;
use crate::fetch::FetchOperation;
use crate::fetch::FetchResult;
use crate::lifecycle::Lifecycle;
use crate::stamp::Stamped;

use driver::Command;
use driver::Driver;
use driver::Input;
use state::Outputs;

/// Identifies a coordinator in log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordinatorId(Uuid);

impl CoordinatorId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for CoordinatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let simple = self.0.simple().to_string();
        write!(f, "coordinator-{}", &simple[..8])
    }
}

/// Where the fetch pipeline stands.
#[derive(Debug, Clone)]
pub enum PipelineStatus {
    /// Built but not activated.
    Idle,
    /// Accepting inputs and running fetches.
    Running,
    /// Stopped by a hard failure; see [`FetchCoordinator::restart`].
    Failed(MediatorError),
    /// Torn down.
    Closed,
}

impl PipelineStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// The error that stopped the pipeline, if any.
    pub fn failure(&self) -> Option<&MediatorError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

enum Activation<F> {
    Pending(BoxStream<'static, Stamped<Option<F>>>),
    Active(mpsc::UnboundedSender<Command>),
    Closed,
}

/// State shared between the coordinator handle and its driver task.
pub(crate) struct Shared<F, O> {
    pub(crate) id: CoordinatorId,
    pub(crate) config: MediatorConfig,
    pub(crate) operation: Arc<dyn FetchOperation<F, O>>,
    pub(crate) surface: Arc<dyn DisplaySurface<O>>,
    pub(crate) sort: Arc<dyn SortControl>,
    pub(crate) page: Arc<dyn PageControl>,
    pub(crate) error_handler: Arc<dyn ErrorHandler<O>>,
    pub(crate) outputs: Outputs<O>,
    pub(crate) state: RwLock<CoordinatorState<O>>,
    pub(crate) lifecycle: Lifecycle,
    status: watch::Sender<PipelineStatus>,
    activation: Mutex<Activation<F>>,
}

impl<F, O> Shared<F, O>
where
    O: Clone + Send + Sync + 'static,
{
    fn update_state(&self, f: impl FnOnce(&mut CoordinatorState<O>)) {
        match self.state.write() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    fn read_state<R>(&self, f: impl FnOnce(&CoordinatorState<O>) -> R) -> R {
        match self.state.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    fn activation(&self) -> MutexGuard<'_, Activation<F>> {
        self.activation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Updates the state unless the coordinator is closed. The closed check
    /// runs under the state lock, so it cannot interleave with teardown's reset.
    fn update_open_state(&self, f: impl FnOnce(&mut CoordinatorState<O>)) -> bool {
        let mut applied = false;
        self.update_state(|state| {
            if !self.lifecycle.is_closed() {
                f(state);
                applied = true;
            }
        });
        applied
    }

    pub(crate) fn set_status(&self, status: PipelineStatus) {
        if self.lifecycle.is_closed() && !matches!(status, PipelineStatus::Closed) {
            return;
        }
        self.status.send_replace(status);
    }

    /// Marks a fetch as started.
    pub(crate) fn begin_fetch(&self) {
        if self.update_open_state(|state| state.loading = true) {
            self.outputs.loading.publish(true);
        }
    }

    /// Publishes an exhausted fetch failure and asks the error handler for a
    /// replacement result.
    pub(crate) fn handle_error(&self, error: FetchError) -> Result<FetchResult<O>, MediatorError> {
        log::warn!("[{}] fetch failed after retries: {}", self.id, error);
        if self.update_open_state(|state| state.last_error = Some(error.clone())) {
            self.outputs.errors.publish(error.clone());
        }
        self.error_handler.handle_error(&error)
    }

    /// Feeds a result into the state, the channels, the page control and the
    /// surface. Dropped entirely once the coordinator is closed.
    pub(crate) fn handle_result(&self, result: FetchResult<O>) {
        let FetchResult { rows, total_count } = result;
        let applied = self.update_open_state(|state| {
            if !result_is_sentinel(total_count) {
                state.last_error = None;
            }
            state.rows = rows.clone();
            state.total = Some(total_count);
            state.last_result_at = Some(Utc::now());
            state.loading = false;
        });
        if !applied {
            return;
        }
        log::debug!("[{}] result: {} row(s), total {}", self.id, rows.len(), total_count);

        self.outputs.total.publish(total_count);
        self.outputs.rows.publish(rows.clone());
        self.page.set_length(total_count);
        self.surface.set_rows(rows);
        self.outputs.loading.publish(false);
    }
}

fn result_is_sentinel(total_count: i64) -> bool {
    total_count == crate::fetch::SENTINEL_TOTAL
}

/// Coordinates a paginated, sortable table view against an async data source.
///
/// The coordinator listens to a trigger stream, a sort control and a page
/// control. Whenever one of them changes (and all three have produced at
/// least one value) it fetches the requested page and publishes the rows and
/// total count. A trigger or sort change first resets the page to 0.
///
/// This handle is cheap to clone (uses `Arc` internally). Teardown is not
/// automatic: call [`teardown`](Self::teardown) when the view goes away, or
/// the channels stay open.
///
/// # Example
///
/// ```no_run
/// use tablefeed_lib::FetchCoordinator;
/// use tablefeed_lib::controls::{Paginator, SortHandle, TableSurface};
/// use tablefeed_lib::fetch::{BasicFetch, FetchRequest, FetchResult};
/// use tablefeed_lib::error::FetchError;
/// use tablefeed_lib::trigger;
///
/// # async fn run() -> Result<(), tablefeed_lib::error::MediatorError> {
/// let surface = TableSurface::<String>::new();
/// let (search, trigger_stream) = trigger::channel::<String>();
///
/// let coordinator = FetchCoordinator::builder()
///     .operation(BasicFetch::new(|request: FetchRequest<String>| async move {
///         let query = request.payload.unwrap_or_default();
///         Ok::<_, FetchError>(FetchResult::new(vec![query], 1))
///     }))
///     .trigger(trigger_stream)
///     .surface(surface.clone())
///     .sort(SortHandle::new())
///     .paginator(Paginator::new(25))
///     .attempts(2)
///     .build();
///
/// coordinator.activate()?;
/// search.fire("rust".to_string());
/// // ...
/// coordinator.teardown();
/// # Ok(())
/// # }
/// ```
pub struct FetchCoordinator<F, O> {
    shared: Arc<Shared<F, O>>,
}

impl<F, O> Clone for FetchCoordinator<F, O> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<F, O> FetchCoordinator<F, O>
where
    F: Clone + Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
{
    /// Creates a new builder for constructing a coordinator.
    pub fn builder() -> FetchCoordinatorBuilder<F, O, Missing, Missing, Missing> {
        FetchCoordinatorBuilder::new()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        operation: Arc<dyn FetchOperation<F, O>>,
        trigger: BoxStream<'static, Stamped<Option<F>>>,
        surface: Arc<dyn DisplaySurface<O>>,
        sort: Arc<dyn SortControl>,
        page: Arc<dyn PageControl>,
        error_handler: Arc<dyn ErrorHandler<O>>,
        config: MediatorConfig,
    ) -> Self {
        let (status, _) = watch::channel(PipelineStatus::Idle);
        let shared = Shared {
            id: CoordinatorId::new(),
            outputs: Outputs::new(&config),
            state: RwLock::new(CoordinatorState::new(config.initial_loading)),
            config,
            operation,
            surface,
            sort,
            page,
            error_handler,
            lifecycle: Lifecycle::new(),
            status,
            activation: Mutex::new(Activation::Pending(trigger)),
        };
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Starts listening to the trigger, sort and page inputs.
    ///
    /// Installs the page-reset rule, binds a positional row identity to the
    /// surface if it has none, and spawns the driver on the current Tokio
    /// runtime. Can only be called once.
    pub fn activate(&self) -> Result<(), MediatorError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| MediatorError::NoRuntime)?;

        let (trigger, commands) = {
            let mut activation = self.shared.activation();
            let (sender, receiver) = mpsc::unbounded_channel();
            match std::mem::replace(&mut *activation, Activation::Active(sender)) {
                Activation::Pending(trigger) => (trigger, receiver),
                previous => {
                    let err = match previous {
                        Activation::Active(_) => MediatorError::AlreadyActive,
                        _ => MediatorError::Closed,
                    };
                    *activation = previous;
                    return Err(err);
                }
            }
        };

        if !self.shared.surface.has_row_identity() {
            self.shared.surface.set_row_identity(positional());
        }

        // Sort and page contribute one value up front so only the trigger
        // gates the first fetch.
        let sort = futures::stream::once(ready(Stamped::now(self.shared.sort.snapshot())))
            .chain(self.shared.sort.changes())
            .map(Input::Sort);
        let page = futures::stream::once(ready(Stamped::now(self.shared.page.snapshot())))
            .chain(self.shared.page.changes())
            .map(Input::Page);
        let inputs = futures::stream::select(
            trigger.map(Input::Trigger),
            futures::stream::select(sort, page),
        )
        .boxed();

        log::debug!(
            "[{}] activating (attempts: {})",
            self.shared.id,
            self.shared.config.attempts
        );
        let driver = Driver::new(Arc::clone(&self.shared));
        runtime.spawn(driver.run(inputs, commands));
        Ok(())
    }

    /// Restarts a pipeline stopped by a hard failure.
    ///
    /// The latest trigger payload, sort and page are kept, so a fetch starts
    /// immediately.
    pub fn restart(&self) -> Result<(), MediatorError> {
        if !self.status().is_failed() {
            return Err(match self.status() {
                PipelineStatus::Closed => MediatorError::Closed,
                _ => MediatorError::NotTerminated,
            });
        }
        match &*self.shared.activation() {
            Activation::Active(commands) => commands
                .send(Command::Restart)
                .map_err(|_| MediatorError::Closed),
            Activation::Closed => Err(MediatorError::Closed),
            Activation::Pending(_) => Err(MediatorError::NotTerminated),
        }
    }

    /// Tears the coordinator down.
    ///
    /// Stops consuming inputs, completes every output channel (late
    /// subscribers complete immediately) and drops the combination state.
    /// Fetches already running are not aborted; their results are discarded.
    /// Calling this more than once has no further effect.
    pub fn teardown(&self) {
        if !self.shared.lifecycle.close() {
            return;
        }
        let closed = self.shared.outputs.close();
        *self.shared.activation() = Activation::Closed;
        self.shared.update_state(|state| {
            *state = CoordinatorState::new(false);
        });
        self.shared.set_status(PipelineStatus::Closed);
        log::debug!("[{}] torn down, {} channel(s) completed", self.shared.id, closed);
    }

    /// Returns `true` once [`teardown`](Self::teardown) has run.
    pub fn is_closed(&self) -> bool {
        self.shared.lifecycle.is_closed()
    }

    /// The coordinator's id, as used in log output.
    pub fn id(&self) -> CoordinatorId {
        self.shared.id
    }

    /// The configuration the coordinator was built with.
    pub fn config(&self) -> &MediatorConfig {
        &self.shared.config
    }

    /// The current pipeline status.
    pub fn status(&self) -> PipelineStatus {
        self.shared.status.borrow().clone()
    }

    /// Subscribes to pipeline status changes.
    pub fn watch_status(&self) -> watch::Receiver<PipelineStatus> {
        self.shared.status.subscribe()
    }

    // =========================================================================
    // Output channels
    // =========================================================================

    /// Rows of every handled result (including the empty rows of a failure).
    pub fn rows(&self) -> BoxStream<'static, Vec<O>> {
        self.shared.outputs.rows.subscribe()
    }

    /// Every fetch failure that exhausted its retries.
    ///
    /// Nothing is emitted when a later fetch succeeds.
    pub fn errors(&self) -> BoxStream<'static, FetchError> {
        self.shared.outputs.errors.subscribe()
    }

    /// The loading flag: `true` when a fetch starts, `false` once its result
    /// has been handled. New subscribers first receive the current value.
    pub fn loading(&self) -> BoxStream<'static, bool> {
        self.shared.outputs.loading.subscribe()
    }

    /// Total count of every handled result (`-1` after a failure).
    pub fn total_count(&self) -> BoxStream<'static, i64> {
        self.shared.outputs.total.subscribe()
    }

    /// Total counts greater than zero.
    pub fn has_results(&self) -> BoxStream<'static, i64> {
        self.total_count()
            .filter(|total| ready(*total > 0))
            .boxed()
    }

    /// Emits whenever a result reports no rows at all.
    pub fn no_results(&self) -> BoxStream<'static, ()> {
        self.total_count()
            .filter(|total| ready(*total == 0))
            .map(|_| ())
            .boxed()
    }

    /// Emits whenever a fetch starts. Useful to hide a previous error.
    pub fn fetch_begin(&self) -> BoxStream<'static, ()> {
        self.loading()
            .filter(|loading| ready(*loading))
            .map(|_| ())
            .boxed()
    }

    // =========================================================================
    // State snapshot
    // =========================================================================

    /// Returns `true` while a fetch is outstanding.
    pub fn is_loading(&self) -> bool {
        self.shared.read_state(|state| state.loading)
    }

    /// The latest exhausted fetch failure, cleared by the next success.
    pub fn last_error(&self) -> Option<FetchError> {
        self.shared.read_state(|state| state.last_error.clone())
    }

    /// Rows of the latest result.
    pub fn current_rows(&self) -> Vec<O> {
        self.shared.read_state(|state| state.rows.clone())
    }

    /// Total count of the latest result, `None` before the first one.
    pub fn current_total(&self) -> Option<i64> {
        self.shared.read_state(|state| state.total)
    }

    /// Full snapshot of the coordinator state.
    pub fn snapshot(&self) -> CoordinatorState<O> {
        self.shared.read_state(|state| state.clone())
    }
}

impl<F, O> fmt::Debug for FetchCoordinator<F, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchCoordinator")
            .field("id", &self.shared.id)
            .field("closed", &self.shared.lifecycle.is_closed())
            .finish()
    }
}
