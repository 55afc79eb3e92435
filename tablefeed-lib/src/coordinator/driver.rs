//! The task that combines inputs and runs fetches.
//!
//! Inputs from the trigger, sort control and page control are fanned into a
//! single stream. Each input updates one of three latest-value slots; once all
//! three hold a value, every input produces a recombination: a new
//! [`FetchRequest`] whose fetch runs on its own task.
//!
//! Every input carries the stamp and value it had when it was emitted. The
//! driver takes all inputs that are ready at once and applies them in stamp
//! order, so a page change emitted after a trigger still wins over the
//! trigger's page reset.
//!
//! Outstanding fetches are never cancelled by newer ones. Their results are
//! applied in completion order, so a slow, older request can overwrite the
//! rows of a newer one. Teardown stops the driver but does not abort fetch
//! tasks; their results are dropped.

use std::sync::Arc;

use futures::FutureExt;
use futures::StreamExt;
use futures::stream::BoxStream;
use futures::stream::FuturesUnordered;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::task::JoinHandle;

use super::PipelineStatus;
use super::Shared;
use crate::controls::PageState;
use crate::controls::SortState;
use crate::error::FetchError;
use crate::error::MediatorError;
use crate::fetch::FetchRequest;
use crate::fetch::FetchResult;
use crate::fetch::fetch_with_retry;
use crate::stamp::Stamp;
use crate::stamp::Stamped;

/// One change from a collaborator.
pub(crate) enum Input<F> {
    Trigger(Stamped<Option<F>>),
    Sort(Stamped<SortState>),
    Page(Stamped<PageState>),
}

impl<F> Input<F> {
    fn stamp(&self) -> Stamp {
        match self {
            Self::Trigger(payload) => payload.stamp,
            Self::Sort(sort) => sort.stamp,
            Self::Page(page) => page.stamp,
        }
    }
}

/// Requests from the coordinator handle to its driver.
#[derive(Debug)]
pub(crate) enum Command {
    Restart,
}

type Outcome<O> = Result<FetchResult<O>, FetchError>;

/// A latest-value slot with a version counter.
#[derive(Debug)]
struct Slot<T> {
    value: Option<T>,
    version: u64,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            value: None,
            version: 0,
        }
    }

    fn set(&mut self, value: T) {
        self.value = Some(value);
        self.version += 1;
    }
}

#[derive(Debug)]
struct Slots<F> {
    payload: Slot<Option<F>>,
    sort: Slot<SortState>,
    page: Slot<PageState>,
}

impl<F: Clone> Slots<F> {
    fn new() -> Self {
        Self {
            payload: Slot::new(),
            sort: Slot::new(),
            page: Slot::new(),
        }
    }

    /// The combined request, once every slot holds a value.
    fn combined(&self) -> Option<FetchRequest<F>> {
        Some(FetchRequest::new(
            self.payload.value.clone()?,
            self.sort.value.clone()?,
            self.page.value?,
        ))
    }
}

pub(crate) struct Driver<F, O> {
    shared: Arc<Shared<F, O>>,
    slots: Slots<F>,
    in_flight: FuturesUnordered<JoinHandle<Outcome<O>>>,
    running: bool,
    recombinations: u64,
}

impl<F, O> Driver<F, O>
where
    F: Clone + Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(shared: Arc<Shared<F, O>>) -> Self {
        Self {
            shared,
            slots: Slots::new(),
            in_flight: FuturesUnordered::new(),
            running: true,
            recombinations: 0,
        }
    }

    pub(crate) async fn run(
        mut self,
        mut inputs: BoxStream<'static, Input<F>>,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) {
        let cancel = self.shared.lifecycle.token();
        self.shared.set_status(PipelineStatus::Running);
        log::debug!("[{}] pipeline started", self.shared.id);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(command) = commands.recv() => self.on_command(command),
                Some(input) = inputs.next() => {
                    let mut batch = vec![input];
                    while let Some(Some(input)) = inputs.next().now_or_never() {
                        batch.push(input);
                    }
                    self.on_inputs(batch);
                }
                Some(joined) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    self.on_complete(joined)
                }
                else => break,
            }
        }

        log::debug!(
            "[{}] driver stopped after {} recombination(s), {} fetch(es) detached",
            self.shared.id,
            self.recombinations,
            self.in_flight.len()
        );
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Restart if !self.running => {
                log::debug!("[{}] pipeline restarted", self.shared.id);
                self.running = true;
                self.shared.set_status(PipelineStatus::Running);
                self.recombine();
            }
            Command::Restart => {}
        }
    }

    /// Applies a batch of ready inputs in emission order.
    fn on_inputs(&mut self, mut batch: Vec<Input<F>>) {
        batch.sort_by_key(Input::stamp);
        let last_page = batch
            .iter()
            .rposition(|input| matches!(input, Input::Page(_)));

        for (position, input) in batch.into_iter().enumerate() {
            let page_follows = last_page.is_some_and(|last| last > position);
            self.on_input(input, page_follows);
        }
    }

    fn on_input(&mut self, input: Input<F>, page_follows: bool) {
        // The page reset must land before the recombination for the same input.
        match input {
            Input::Trigger(payload) => {
                self.reset_page(payload.stamp, page_follows);
                self.slots.payload.set(payload.value);
            }
            Input::Sort(sort) => {
                self.reset_page(sort.stamp, page_follows);
                self.slots.sort.set(sort.value);
            }
            Input::Page(page) => {
                self.slots.page.set(page.value);
            }
        }

        if self.running {
            self.recombine();
        }
    }

    /// Zeroes the page slot. The page control is left alone when a newer page
    /// change is already queued behind this input.
    fn reset_page(&mut self, emitted: Stamp, page_follows: bool) {
        if !page_follows {
            self.shared.page.reset_index(emitted);
        }
        if let Some(page) = self.slots.page.value.as_mut() {
            page.index = 0;
        }
    }

    fn recombine(&mut self) {
        let Some(request) = self.slots.combined() else {
            return;
        };
        self.recombinations += 1;
        log::debug!(
            "[{}] recombination #{} (payload v{}, sort v{}, page v{}): sort={:?} {} page={}x{}",
            self.shared.id,
            self.recombinations,
            self.slots.payload.version,
            self.slots.sort.version,
            self.slots.page.version,
            request.sort_key,
            request.sort_direction,
            request.page_index,
            request.page_size,
        );

        self.shared.begin_fetch();

        let operation = Arc::clone(&self.shared.operation);
        let config = self.shared.config.clone();
        let label = self.shared.id.to_string();
        self.in_flight.push(tokio::spawn(async move {
            fetch_with_retry(&*operation, &request, &config, &label).await
        }));
    }

    fn on_complete(&mut self, joined: Result<Outcome<O>, JoinError>) {
        if !self.running {
            return;
        }

        let outcome = joined.unwrap_or_else(|err| {
            Err(FetchError::Panicked {
                message: err.to_string(),
            })
        });

        let result = match outcome {
            Ok(result) => result,
            Err(FetchError::Malformed(malformed)) => {
                self.terminate(MediatorError::MalformedResult(malformed));
                return;
            }
            Err(error) => match self.shared.handle_error(error) {
                Ok(replacement) => replacement,
                Err(err) => {
                    self.terminate(err);
                    return;
                }
            },
        };

        self.shared.handle_result(result);
    }

    /// Stops the pipeline. Inputs are still consumed (so page resets keep
    /// working) but no fetch runs until a restart.
    fn terminate(&mut self, error: MediatorError) {
        log::error!("[{}] pipeline terminated: {}", self.shared.id, error);
        self.running = false;
        self.in_flight.clear();
        self.shared.set_status(PipelineStatus::Failed(error));
    }
}
