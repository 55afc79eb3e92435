//! Coordinator lifecycle.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use tokio_util::sync::CancellationToken;

/// Tracks whether a coordinator has been torn down.
///
/// Every publish checks [`is_closed`](Self::is_closed); the driver task stops
/// when the cancellation token fires.
#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    closed: AtomicBool,
    token: CancellationToken,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Marks the lifecycle closed and cancels the driver.
    ///
    /// Returns `true` only for the call that performed the close.
    pub(crate) fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.token.cancel();
        true
    }

    pub(crate) fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_once() {
        let lifecycle = Lifecycle::new();
        let token = lifecycle.token();
        assert!(!lifecycle.is_closed());
        assert!(lifecycle.close());
        assert!(!lifecycle.close());
        assert!(lifecycle.is_closed());
        assert!(token.is_cancelled());
    }
}
