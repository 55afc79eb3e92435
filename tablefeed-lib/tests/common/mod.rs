//! Shared fixtures for coordinator integration tests.

#![allow(dead_code)]

use std::cmp::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering as AtomicOrdering;
use std::time::Duration;

use futures::StreamExt;
use futures::future::Ready;
use futures::stream::BoxStream;
use serde::Deserialize;
use tablefeed_lib::error::FetchError;
use tablefeed_lib::fetch::BasicFetch;
use tablefeed_lib::fetch::FetchRequest;
use tablefeed_lib::fetch::FetchResult;
use tablefeed_lib::fetch::Sortable;

pub const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Person {
    pub name: String,
}

impl Sortable for Person {
    fn compare_field(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "name" => self.name.cmp(&other.name),
            _ => Ordering::Equal,
        }
    }
}

pub fn person(name: &str) -> Person {
    Person {
        name: name.to_string(),
    }
}

/// Waits for the next emission of a subscription.
pub async fn next<T>(stream: &mut BoxStream<'static, T>) -> T {
    tokio::time::timeout(WAIT, stream.next())
        .await
        .expect("timed out waiting for an emission")
        .expect("stream completed unexpectedly")
}

/// Collects the remaining emissions of a subscription that is about to complete.
pub async fn drain<T>(stream: BoxStream<'static, T>) -> Vec<T> {
    tokio::time::timeout(WAIT, stream.collect())
        .await
        .expect("timed out waiting for completion")
}

/// Records every request a fetch operation receives.
#[derive(Debug)]
pub struct Recorder<F> {
    requests: Arc<Mutex<Vec<FetchRequest<F>>>>,
}

impl<F> Clone for Recorder<F> {
    fn clone(&self) -> Self {
        Self {
            requests: Arc::clone(&self.requests),
        }
    }
}

impl<F> Default for Recorder<F> {
    fn default() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<F: Clone> Recorder<F> {
    pub fn record(&self, request: &FetchRequest<F>) {
        self.requests.lock().unwrap().push(request.clone());
    }

    pub fn all(&self) -> Vec<FetchRequest<F>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last(&self) -> FetchRequest<F> {
        self.all().pop().expect("no request recorded")
    }
}

type Flaky = BasicFetch<
    Box<dyn Fn(FetchRequest<String>) -> Ready<Result<FetchResult<Person>, FetchError>> + Send + Sync>,
>;

/// An operation that fails `failures` times, then returns three people.
pub fn flaky(failures: u32) -> (Flaky, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let fetch: Flaky = BasicFetch::new(Box::new(move |_request: FetchRequest<String>| {
        let call = counter.fetch_add(1, AtomicOrdering::SeqCst);
        futures::future::ready(if call < failures {
            Err(FetchError::failed(format!("attempt {} failed", call + 1)))
        } else {
            Ok(FetchResult::new(vec![person("a"), person("b"), person("c")], 3))
        })
    }));
    (fetch, calls)
}
