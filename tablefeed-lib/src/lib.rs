//! Table data coordination library
//!
//! Drives a paginated, sortable table view from an async data source: a
//! [`FetchCoordinator`] combines a trigger payload, the current sort and the
//! current page into fetch requests, retries failures, and republishes
//! results as rows, total count, loading and error channels.

pub mod channel;
pub mod config;
pub mod controls;
pub mod error;
pub mod fetch;
pub mod stamp;
pub mod trigger;

mod coordinator;
mod lifecycle;

pub use coordinator::*;
