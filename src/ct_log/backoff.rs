// src/ct_log/backoff.rs
use tracing::{debug, info, warn};

/// Health status of a CT log, from the point of view of its own monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogHealth {
    /// Log is responding normally
    Healthy,
    /// Log has had some failures but is still polled every tick
    Degraded,
    /// Log keeps failing; ticks are being skipped
    Failed,
}

/// Bounded exponential backoff expressed in poll ticks.
///
/// After the n-th consecutive failure the monitor skips
/// `min(2^(n-1) - 1, max_skip_ticks)` ticks, so a single failure is retried
/// on the very next tick.
#[derive(Debug, Clone)]
pub struct PollBackoff {
    max_skip_ticks: u32,
    failure_count: u32,
    skip_remaining: u32,
    last_error: Option<String>,
}

impl PollBackoff {
    /// `max_skip_ticks = 0` retries every tick
    pub fn new(max_skip_ticks: u32) -> Self {
        Self {
            max_skip_ticks,
            failure_count: 0,
            skip_remaining: 0,
            last_error: None,
        }
    }

    pub fn status(&self) -> LogHealth {
        match self.failure_count {
            0 => LogHealth::Healthy,
            _ if self.skip_ticks() == 0 => LogHealth::Degraded,
            _ => LogHealth::Failed,
        }
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Called once per tick. Returns false while the tick should be skipped.
    pub fn should_poll(&mut self) -> bool {
        if self.skip_remaining > 0 {
            self.skip_remaining -= 1;
            false
        } else {
            true
        }
    }

    pub fn record_success(&mut self, log: &str) {
        if self.status() == LogHealth::Failed {
            info!("Log recovered: {} is now healthy (after {} failures)", log, self.failure_count);
        } else if self.failure_count > 0 {
            debug!("Log recovered: {} is now healthy", log);
        }

        self.failure_count = 0;
        self.skip_remaining = 0;
        self.last_error = None;
    }

    pub fn record_failure(&mut self, log: &str, error: String) {
        self.failure_count = self.failure_count.saturating_add(1);
        self.skip_remaining = self.skip_ticks();

        if self.skip_remaining > 0 {
            warn!(
                "{}: {} consecutive failures, skipping {} ticks: {}",
                log, self.failure_count, self.skip_remaining, error
            );
        } else {
            warn!("{}: poll failed, retrying next tick: {}", log, error);
        }

        self.last_error = Some(error);
    }

    fn skip_ticks(&self) -> u32 {
        if self.failure_count == 0 {
            return 0;
        }
        let exponent = (self.failure_count - 1).min(31);
        let ticks = (1u64 << exponent) - 1;
        ticks.min(self.max_skip_ticks as u64) as u32
    }
}

impl Default for PollBackoff {
    fn default() -> Self {
        Self::new(30)
    }
}
