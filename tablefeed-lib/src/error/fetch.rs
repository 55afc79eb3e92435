//! Fetch error types

/// Maximum number of characters of a malformed value kept for diagnostics.
pub const PREVIEW_LIMIT: usize = 100;

/// Errors produced by a [`FetchOperation`](crate::fetch::FetchOperation).
///
/// `Failed` is the ordinary data-fetch failure: it is retried and, once the
/// retry budget is spent, published on the coordinator's error channel.
/// `Malformed` is a contract violation by the operation and is never retried.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// The operation failed to produce data.
    #[error("Fetch failed: {message}")]
    Failed { message: String },

    /// The operation produced a value that is not a valid result.
    #[error(transparent)]
    Malformed(#[from] MalformedResult),

    /// The task running the operation panicked.
    #[error("Fetch task panicked: {message}")]
    Panicked { message: String },
}

impl FetchError {
    /// Creates a new fetch failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Returns `true` if another attempt with the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Returns `true` if this error is a contract violation by the operation.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::failed(err.to_string())
    }
}

/// A fetch result that lacks the required `rows` and/or `totalCount` fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "Missing required field(s) {} in fetch result; return an object with 'rows' and 'totalCount'. \
     Result (first 100 chars):\n{preview}",
    .missing.join(", ")
)]
pub struct MalformedResult {
    /// The required fields that were absent.
    pub missing: Vec<&'static str>,
    /// Truncated rendering of the offending value.
    pub preview: String,
}

impl MalformedResult {
    /// Creates a malformed-result error, truncating `rendered` to [`PREVIEW_LIMIT`] characters.
    pub fn new(missing: Vec<&'static str>, rendered: &str) -> Self {
        Self {
            missing,
            preview: rendered.chars().take(PREVIEW_LIMIT).collect(),
        }
    }
}
