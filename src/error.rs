// src/error.rs
//! Error types for the monitoring core.

/// Startup failures that end one log's monitor without retry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MonitorError {
    #[error("failed to create CT client for {log}: {reason}")]
    ClientInit { log: String, reason: String },

    #[error("failed to get initial tree head for {log}: {reason}")]
    InitialHead { log: String, reason: String },
}

/// Failures of a single poll. The tick is abandoned and the next one retries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    #[error("failed to get current tree head: {0}")]
    TreeHead(String),

    #[error("failed to get entries [{start}, {end}): {reason}")]
    Entries { start: u64, end: u64, reason: String },

    /// The log returned no entries for a range below its own tree size
    #[error("log returned no entries for [{start}, {end})")]
    EmptyBatch { start: u64, end: u64 },

    /// Nothing is consuming records any more
    #[error("record sink closed")]
    SinkClosed,
}

impl PollError {
    /// Transient errors are retried on a later tick; anything else ends the monitor
    pub fn is_transient(&self) -> bool {
        !matches!(self, PollError::SinkClosed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SupervisorError {
    #[error("no CT logs to monitor")]
    NoLogSources,
}
