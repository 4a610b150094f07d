use std::time::Duration;

/// Configuration for [`crate::MockRados`].
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Number of worker threads completing asynchronous operations.
    pub workers: usize,
    /// Artificial latency before an asynchronous operation completes.
    pub completion_delay: Duration,
    /// Version reported by `version()`.
    pub version: (i32, i32, i32),
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            completion_delay: Duration::ZERO,
            version: (3, 0, 0),
        }
    }
}

impl MockConfig {
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    #[must_use]
    pub fn with_completion_delay(mut self, delay: Duration) -> Self {
        self.completion_delay = delay;
        self
    }
}
