//! Retry, error recovery and hard-failure behavior.

mod common;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use common::Person;
use common::WAIT;
use common::drain;
use common::next;
use common::person;
use serde_json::json;
use tablefeed_lib::ErrorHandler;
use tablefeed_lib::FetchCoordinator;
use tablefeed_lib::PipelineStatus;
use tablefeed_lib::controls::Paginator;
use tablefeed_lib::controls::TableSurface;
use tablefeed_lib::error::FetchError;
use tablefeed_lib::error::MediatorError;
use tablefeed_lib::fetch::BasicFetch;
use tablefeed_lib::fetch::FetchRequest;
use tablefeed_lib::fetch::FetchResult;
use tablefeed_lib::fetch::JsonFetch;
use tablefeed_lib::trigger;
use tokio::sync::watch;

async fn wait_for_failure(status: &mut watch::Receiver<PipelineStatus>) -> MediatorError {
    tokio::time::timeout(WAIT, status.wait_for(PipelineStatus::is_failed))
        .await
        .expect("timed out waiting for the pipeline to fail")
        .expect("status channel closed")
        .failure()
        .cloned()
        .expect("failed status carries its error")
}

#[tokio::test]
async fn test_failures_within_budget_are_silent() {
    for attempts in [0, 1, 3] {
        let (fetch, calls) = common::flaky(attempts);
        let coordinator = FetchCoordinator::builder()
            .operation(fetch)
            .trigger(trigger::immediate())
            .surface(TableSurface::new())
            .attempts(attempts)
            .build();

        let mut rows = coordinator.rows();
        let errors = coordinator.errors();
        coordinator.activate().unwrap();

        assert_eq!(next(&mut rows).await.len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), attempts + 1);
        assert!(coordinator.last_error().is_none());

        coordinator.teardown();
        assert!(drain(errors).await.is_empty(), "attempts = {attempts}");
        assert!(drain(rows).await.is_empty());
    }
}

#[tokio::test]
async fn test_exhausted_retries_publish_one_error() {
    for attempts in [0, 2] {
        let (fetch, calls) = common::flaky(attempts + 1);
        let paginator = Paginator::new(10);
        let surface = TableSurface::new();
        let coordinator = FetchCoordinator::builder()
            .operation(fetch)
            .trigger(trigger::immediate())
            .surface(surface.clone())
            .paginator(paginator.clone())
            .attempts(attempts)
            .build();

        let mut errors = coordinator.errors();
        let mut rows = coordinator.rows();
        let mut totals = coordinator.total_count();
        coordinator.activate().unwrap();

        let error = next(&mut errors).await;
        assert!(matches!(error, FetchError::Failed { .. }));
        assert_eq!(next(&mut rows).await, Vec::<Person>::new());
        assert_eq!(next(&mut totals).await, -1);
        assert_eq!(calls.load(Ordering::SeqCst), attempts + 1);

        assert_eq!(paginator.length(), -1);
        assert!(surface.is_empty());
        assert!(coordinator.last_error().is_some());
        assert_eq!(coordinator.current_total(), Some(-1));
        assert!(coordinator.status().is_running());

        coordinator.teardown();
        assert!(drain(errors).await.is_empty());
    }
}

#[tokio::test]
async fn test_idle_subscriber_receives_every_error() {
    const FAILURES: usize = 70;
    let (search, trigger_stream) = trigger::channel();

    let coordinator = FetchCoordinator::builder()
        .operation(BasicFetch::new(|_request: FetchRequest<String>| async move {
            Err::<FetchResult<Person>, _>(FetchError::failed("backend unavailable"))
        }))
        .trigger(trigger_stream)
        .surface(TableSurface::new())
        .build();

    // Not polled until teardown.
    let errors = coordinator.errors();
    let mut totals = coordinator.total_count();
    coordinator.activate().unwrap();

    for _ in 0..FAILURES {
        search.fire_empty();
        assert_eq!(next(&mut totals).await, -1);
    }

    coordinator.teardown();
    assert_eq!(drain(errors).await.len(), FAILURES);
}

#[tokio::test]
async fn test_success_clears_last_error() {
    let fail = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&fail);
    let (search, trigger_stream) = trigger::channel();

    let coordinator = FetchCoordinator::builder()
        .operation(BasicFetch::new(move |_request: FetchRequest<String>| {
            let fail = flag.load(Ordering::SeqCst);
            async move {
                if fail {
                    Err(FetchError::failed("backend unavailable"))
                } else {
                    Ok(FetchResult::new(vec![person("a")], 1))
                }
            }
        }))
        .trigger(trigger_stream)
        .surface(TableSurface::new())
        .build();

    let mut totals = coordinator.total_count();
    coordinator.activate().unwrap();

    search.fire_empty();
    assert_eq!(next(&mut totals).await, -1);
    assert!(coordinator.last_error().is_some());

    fail.store(false, Ordering::SeqCst);
    search.fire_empty();
    assert_eq!(next(&mut totals).await, 1);
    assert!(coordinator.last_error().is_none());

    coordinator.teardown();
}

#[tokio::test]
async fn test_malformed_result_terminates_and_restart_recovers() {
    let valid = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&valid);

    let coordinator = FetchCoordinator::builder()
        .operation(JsonFetch::<_, Person>::new(
            move |_request: FetchRequest<String>| {
                let valid = flag.load(Ordering::SeqCst);
                async move {
                    Ok::<_, FetchError>(if valid {
                        json!({ "rows": [{ "name": "a" }], "totalCount": 1 })
                    } else {
                        json!({ "items": [{ "name": "a" }] })
                    })
                }
            },
        ))
        .trigger(trigger::immediate())
        .surface(TableSurface::new())
        .attempts(3)
        .build();

    let mut status = coordinator.watch_status();
    let mut rows = coordinator.rows();
    let errors = coordinator.errors();
    coordinator.activate().unwrap();

    let failure = wait_for_failure(&mut status).await;
    match &failure {
        MediatorError::MalformedResult(malformed) => {
            assert_eq!(malformed.missing, vec!["rows", "totalCount"]);
            assert!(malformed.preview.contains("items"));
        }
        other => panic!("unexpected failure: {other}"),
    }
    let message = failure.to_string();
    assert!(message.contains("rows"));
    assert!(message.contains("totalCount"));
    assert!(failure.is_terminal());

    valid.store(true, Ordering::SeqCst);
    coordinator.restart().unwrap();

    assert_eq!(next(&mut rows).await, vec![person("a")]);
    assert!(coordinator.status().is_running());
    assert!(matches!(
        coordinator.restart(),
        Err(MediatorError::NotTerminated)
    ));

    coordinator.teardown();
    assert!(drain(errors).await.is_empty());
}

struct Refuse;

impl ErrorHandler<Person> for Refuse {
    fn handle_error(&self, error: &FetchError) -> Result<FetchResult<Person>, MediatorError> {
        Err(MediatorError::recovery(format!("cannot show {error}")))
    }
}

#[tokio::test]
async fn test_failing_error_handler_terminates() {
    let (fetch, _) = common::flaky(u32::MAX);
    let surface = TableSurface::new();

    let coordinator = FetchCoordinator::builder()
        .operation(fetch)
        .trigger(trigger::immediate())
        .surface(surface.clone())
        .error_handler(Refuse)
        .build();

    let mut status = coordinator.watch_status();
    let mut errors = coordinator.errors();
    let totals = coordinator.total_count();
    coordinator.activate().unwrap();

    assert!(matches!(next(&mut errors).await, FetchError::Failed { .. }));
    let failure = wait_for_failure(&mut status).await;
    assert!(matches!(failure, MediatorError::Recovery { .. }));
    assert!(surface.is_empty());

    coordinator.teardown();
    assert!(drain(totals).await.is_empty());
}
