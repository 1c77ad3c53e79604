use std::time::Duration;

use tokio::time::Instant;

/// The only state that outlives a single probe/login attempt.
/// Owned by the orchestrator and mutated from its tick and completion
/// handlers only.
#[derive(Debug, Clone)]
pub struct SessionCounters {
    retry_count: u32,
    retry_limit: u32,
    connection_changed_at: Option<Instant>,
}

impl SessionCounters {
    pub fn new(retry_limit: u32) -> Self {
        Self {
            retry_count: 0,
            retry_limit,
            connection_changed_at: None,
        }
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    pub fn limit_reached(&self) -> bool {
        self.retry_count >= self.retry_limit
    }

    pub fn reset_retries(&mut self) {
        self.retry_count = 0;
    }

    pub fn record_failure(&mut self) {
        self.retry_count = (self.retry_count + 1).min(self.retry_limit);
    }

    /// Stop retrying until someone resets the counter.
    pub fn pin_at_limit(&mut self) {
        self.retry_count = self.retry_limit;
    }

    pub fn connection_changed_at(&self) -> Option<Instant> {
        self.connection_changed_at
    }

    pub fn mark_transition(&mut self, now: Instant) {
        self.connection_changed_at = Some(now);
    }

    pub fn clear_transition(&mut self) {
        self.connection_changed_at = None;
    }

    /// True once the pending transition is older than `window`.
    pub fn transition_expired(&self, now: Instant, window: Duration) -> bool {
        self.connection_changed_at
            .map(|at| now.saturating_duration_since(at) > window)
            .unwrap_or(false)
    }
}
