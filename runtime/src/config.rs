//! Per-stream transaction settings.

/// Attempts made by default before a contended write gives up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Configuration for a [`TransactionalStream`](crate::TransactionalStream).
///
/// The attempt count is the only contention control: there is no delay
/// between attempts, and no wall-clock limit. Callers who want a deadline
/// wrap the whole call in `tokio::time::timeout`.
///
/// # Example
///
/// ```
/// use composable_stream_runtime::StreamConfig;
///
/// let config = StreamConfig::default().with_max_attempts(5);
/// assert_eq!(config.max_attempts(), 5);
///
/// // Zero still runs once.
/// assert_eq!(StreamConfig::new(0).max_attempts(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    max_attempts: u32,
}

impl StreamConfig {
    /// Create a configuration allowing `max_attempts` load-decide-append cycles.
    #[must_use]
    pub const fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Set the attempt limit.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Attempts allowed per operation, never less than one.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        if self.max_attempts == 0 {
            1
        } else {
            self.max_attempts
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_allows_three_attempts() {
        assert_eq!(StreamConfig::default().max_attempts(), 3);
    }

    #[test]
    fn builder_overrides_limit() {
        let config = StreamConfig::default().with_max_attempts(10);
        assert_eq!(config.max_attempts(), 10);
    }

    #[test]
    fn zero_is_clamped_to_one() {
        assert_eq!(StreamConfig::default().with_max_attempts(0).max_attempts(), 1);
    }
}
