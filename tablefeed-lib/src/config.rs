//! Coordinator configuration.

use std::time::Duration;

/// Configuration for a [`FetchCoordinator`](crate::FetchCoordinator).
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tablefeed_lib::config::MediatorConfig;
///
/// // Default configuration: no retries, loading starts as `false`
/// let config = MediatorConfig::default();
///
/// // Retry twice, waiting 200ms then 400ms between attempts
/// let custom = MediatorConfig::default()
///     .attempts(2)
///     .retry_delay(Duration::from_millis(200));
/// ```
#[derive(Debug, Clone)]
pub struct MediatorConfig {
    /// Number of silent retries before a failure reaches the error channel.
    pub attempts: u32,
    /// Delay before the first retry (doubles each retry). Zero retries immediately.
    pub retry_delay: Duration,
    /// Upper bound for the retry delay.
    pub max_retry_delay: Duration,
    /// Value of the loading flag before the first fetch starts.
    pub initial_loading: bool,
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self {
            attempts: 0,
            retry_delay: Duration::ZERO,
            max_retry_delay: Duration::from_secs(30),
            initial_loading: false,
        }
    }
}

impl MediatorConfig {
    /// Sets the number of silent retries.
    pub fn attempts(mut self, n: u32) -> Self {
        self.attempts = n;
        self
    }

    /// Sets the delay before the first retry.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sets the maximum delay between retries.
    pub fn max_retry_delay(mut self, delay: Duration) -> Self {
        self.max_retry_delay = delay;
        self
    }

    /// Sets the initial loading value.
    ///
    /// Useful when the first fetch is known to start immediately and a
    /// `false` → `true` flicker on the loading channel is undesirable.
    pub fn initial_loading(mut self, loading: bool) -> Self {
        self.initial_loading = loading;
        self
    }

    /// Returns the delay to wait before retry number `retry` (1-based).
    pub(crate) fn delay_for(&self, retry: u32) -> Duration {
        if self.retry_delay.is_zero() {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.retry_delay
            .saturating_mul(factor)
            .min(self.max_retry_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MediatorConfig::default();
        assert_eq!(config.attempts, 0);
        assert!(!config.initial_loading);
        assert_eq!(config.delay_for(1), Duration::ZERO);
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let config = MediatorConfig::default()
            .retry_delay(Duration::from_millis(100))
            .max_retry_delay(Duration::from_millis(350));
        assert_eq!(config.delay_for(1), Duration::from_millis(100));
        assert_eq!(config.delay_for(2), Duration::from_millis(200));
        assert_eq!(config.delay_for(3), Duration::from_millis(350));
        assert_eq!(config.delay_for(40), Duration::from_millis(350));
    }
}
