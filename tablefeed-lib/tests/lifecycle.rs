//! Activation and teardown.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::Person;
use common::WAIT;
use common::next;
use common::person;
use futures::StreamExt;
use tablefeed_lib::FetchCoordinator;
use tablefeed_lib::PipelineStatus;
use tablefeed_lib::controls::Paginator;
use tablefeed_lib::controls::TableSurface;
use tablefeed_lib::error::FetchError;
use tablefeed_lib::error::MediatorError;
use tablefeed_lib::fetch::BasicFetch;
use tablefeed_lib::fetch::FetchRequest;
use tablefeed_lib::fetch::FetchResult;
use tablefeed_lib::trigger;
use tokio::sync::Notify;

fn coordinator() -> FetchCoordinator<String, Person> {
    FetchCoordinator::builder()
        .operation(common::flaky(0).0)
        .trigger(trigger::immediate())
        .surface(TableSurface::new())
        .build()
}

async fn completes<T>(stream: futures::stream::BoxStream<'static, T>) -> bool {
    let mut stream = stream;
    matches!(tokio::time::timeout(WAIT, stream.next()).await, Ok(None))
}

#[tokio::test]
async fn test_activate_twice_fails() {
    let coordinator = coordinator();
    assert!(matches!(coordinator.status(), PipelineStatus::Idle));

    coordinator.activate().unwrap();
    assert!(matches!(
        coordinator.activate(),
        Err(MediatorError::AlreadyActive)
    ));
    coordinator.teardown();
}

#[test]
fn test_activate_requires_runtime() {
    let coordinator = coordinator();
    assert!(matches!(coordinator.activate(), Err(MediatorError::NoRuntime)));

    // A failed activation leaves the coordinator ready to activate later.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async {
        let mut rows = coordinator.rows();
        coordinator.activate().unwrap();
        assert_eq!(next(&mut rows).await.len(), 3);
        coordinator.teardown();
    });
}

#[tokio::test]
async fn test_teardown_is_idempotent() {
    let coordinator = coordinator();
    let mut rows = coordinator.rows();
    coordinator.activate().unwrap();
    next(&mut rows).await;

    coordinator.teardown();
    coordinator.teardown();

    assert!(coordinator.is_closed());
    assert!(matches!(coordinator.status(), PipelineStatus::Closed));
    assert!(completes(rows).await);
    assert!(matches!(coordinator.activate(), Err(MediatorError::Closed)));
    assert!(matches!(coordinator.restart(), Err(MediatorError::Closed)));
    assert!(coordinator.current_rows().is_empty());
    assert_eq!(coordinator.current_total(), None);
}

#[tokio::test]
async fn test_late_subscribers_complete_immediately() {
    let coordinator = coordinator();
    coordinator.teardown();

    assert!(completes(coordinator.rows()).await);
    assert!(completes(coordinator.errors()).await);
    assert!(completes(coordinator.loading()).await);
    assert!(completes(coordinator.total_count()).await);
    assert!(completes(coordinator.has_results()).await);
    assert!(completes(coordinator.no_results()).await);
    assert!(completes(coordinator.fetch_begin()).await);
}

#[tokio::test]
async fn test_teardown_before_activation() {
    let coordinator = coordinator();
    let loading = coordinator.loading();
    coordinator.teardown();

    // The replayed initial value is still delivered before completion.
    assert_eq!(common::drain(loading).await, vec![false]);
    assert!(matches!(coordinator.activate(), Err(MediatorError::Closed)));
}

#[tokio::test]
async fn test_results_after_teardown_are_dropped() {
    let gate = Arc::new(Notify::new());
    let release = Arc::clone(&gate);
    let surface = TableSurface::new();
    let paginator = Paginator::new(10);

    let coordinator = FetchCoordinator::builder()
        .operation(BasicFetch::new(move |_request: FetchRequest<String>| {
            let gate = Arc::clone(&gate);
            async move {
                gate.notified().await;
                Ok::<_, FetchError>(FetchResult::new(vec![person("late")], 1))
            }
        }))
        .trigger(trigger::immediate())
        .surface(surface.clone())
        .paginator(paginator.clone())
        .build();

    let mut begin = coordinator.fetch_begin();
    let rows = coordinator.rows();
    coordinator.activate().unwrap();
    next(&mut begin).await;

    coordinator.teardown();
    release.notify_one();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(completes(rows).await);
    assert!(surface.is_empty());
    assert_eq!(paginator.length(), 0);
    assert!(matches!(coordinator.status(), PipelineStatus::Closed));
}

#[tokio::test]
async fn test_clones_share_the_pipeline() {
    let coordinator = coordinator();
    let handle = coordinator.clone();
    assert_eq!(handle.id(), coordinator.id());
    assert!(handle.id().to_string().starts_with("coordinator-"));

    handle.teardown();
    assert!(coordinator.is_closed());
}
