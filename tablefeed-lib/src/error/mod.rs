//! Error types

mod fetch;
mod mediator;

pub use fetch::*;
pub use mediator::*;
