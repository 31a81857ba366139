//! Group service configuration.

use std::time::Duration;

/// Configuration for the group service.
#[derive(Debug, Clone)]
pub struct GroupServiceConfig {
    /// Upper bound on any single persistence call (default: 5 s).
    /// A call that exceeds it surfaces as a retryable infrastructure
    /// error.
    pub store_timeout: Duration,
    /// How many times a mutation is re-applied from a fresh snapshot
    /// when its save loses an optimistic-concurrency race (default: 3).
    pub max_save_attempts: u32,
}

impl Default for GroupServiceConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(5),
            max_save_attempts: 3,
        }
    }
}
