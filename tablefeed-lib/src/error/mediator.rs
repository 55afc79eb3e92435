//! Coordinator error types

use super::MalformedResult;

/// Errors raised by the coordinator itself.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MediatorError {
    /// `activate` was called more than once.
    #[error("Coordinator is already active")]
    AlreadyActive,

    /// The coordinator has been torn down.
    #[error("Coordinator is closed")]
    Closed,

    /// Activation was attempted outside a Tokio runtime.
    #[error("No Tokio runtime available to drive the coordinator")]
    NoRuntime,

    /// The fetch operation returned a malformed result; the pipeline stopped.
    #[error("Pipeline terminated: {0}")]
    MalformedResult(#[from] MalformedResult),

    /// The error handler could not recover from an exhausted fetch failure.
    #[error("Error handler failed: {message}")]
    Recovery { message: String },

    /// `restart` was called while the pipeline is still running.
    #[error("Pipeline has not terminated")]
    NotTerminated,
}

impl MediatorError {
    /// Creates a recovery error.
    pub fn recovery(message: impl Into<String>) -> Self {
        Self::Recovery {
            message: message.into(),
        }
    }

    /// Returns `true` if this error stops the fetch pipeline.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::MalformedResult(_) | Self::Recovery { .. })
    }
}
