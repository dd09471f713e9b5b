// src/ct_log/monitor.rs
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::backoff::PollBackoff;
use super::client::{LogClient, LogClientFactory};
use super::types::{CertificateRecord, Cursor, LogSource};
use crate::classifier::classify;
use crate::error::{MonitorError, PollError};

/// Configuration for single log monitor
#[derive(Debug, Clone)]
pub struct LogMonitorConfig {
    pub poll_interval: Duration,
    /// Upper bound on entries requested per get-entries call
    pub batch_size: u64,
    pub max_backoff_ticks: u32,
}

impl Default for LogMonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            batch_size: 256,
            max_backoff_ticks: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Initializing,
    WaitingForTick,
    Fetching,
    Stopped,
}

/// Result of one successful poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Tree size equals the cursor
    UpToDate,
    /// Log reported fewer entries than already processed. Nothing is
    /// fetched and the cursor stays put.
    TreeShrank { reported: u64, cursor: u64 },
    Advanced(EntryStats),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EntryStats {
    pub processed: u64,
    pub emitted: u64,
    pub skipped: u64,
}

/// Why a monitor stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorExit {
    Stopped,
    SinkClosed,
    Failed(MonitorError),
}

#[derive(Debug, Clone)]
pub struct MonitorReport {
    pub source: LogSource,
    pub exit: MonitorExit,
    /// `None` if the monitor never got past initialization
    pub cursor: Option<u64>,
    pub stats: EntryStats,
    /// Polls that had failed in a row when the monitor stopped
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
}

/// Monitors a single CT log for new entries
pub struct LogMonitor {
    source: LogSource,
    client: Box<dyn LogClient>,
    cursor: Cursor,
    config: LogMonitorConfig,
    backoff: PollBackoff,
    state: MonitorState,
    stats: EntryStats,
}

impl LogMonitor {
    /// Connect to the log and take its current size as the starting point
    pub async fn initialize(
        source: LogSource,
        factory: &dyn LogClientFactory,
        config: LogMonitorConfig,
    ) -> Result<Self, MonitorError> {
        let client = factory
            .connect(&source)
            .map_err(|e| MonitorError::ClientInit {
                log: source.name().to_string(),
                reason: format!("{:#}", e),
            })?;

        Self::with_client(source, client, config).await
    }

    pub async fn with_client(
        source: LogSource,
        client: Box<dyn LogClient>,
        config: LogMonitorConfig,
    ) -> Result<Self, MonitorError> {
        let mut monitor = Self {
            backoff: PollBackoff::new(config.max_backoff_ticks),
            source,
            client,
            cursor: Cursor::new(0),
            config,
            state: MonitorState::Initializing,
            stats: EntryStats::default(),
        };

        let head = monitor
            .client
            .get_tree_head()
            .await
            .map_err(|e| MonitorError::InitialHead {
                log: monitor.source.name().to_string(),
                reason: format!("{:#}", e),
            })?;

        monitor.cursor = Cursor::new(head.size);
        info!("Monitoring log: {}", monitor.source.name());
        info!("{}: initial tree size {}", monitor.source.name(), head.size);
        monitor.set_state(MonitorState::WaitingForTick);

        Ok(monitor)
    }

    pub fn cursor(&self) -> u64 {
        self.cursor.next_index()
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn stats(&self) -> EntryStats {
        self.stats
    }

    pub fn source(&self) -> &LogSource {
        &self.source
    }

    fn set_state(&mut self, state: MonitorState) {
        if self.state != state {
            debug!("{}: {:?} -> {:?}", self.source.name(), self.state, state);
            self.state = state;
        }
    }

    /// Main monitoring loop. Returns once shutdown is observed while waiting
    /// for the next tick, or when nobody consumes records any more.
    pub async fn run(
        mut self,
        records: mpsc::Sender<CertificateRecord>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> MonitorReport {
        let poll_interval = self.config.poll_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + poll_interval, poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let exit = loop {
            self.set_state(MonitorState::WaitingForTick);

            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown_rx) => break MonitorExit::Stopped,
                _ = ticker.tick() => {}
            }

            if !self.backoff.should_poll() {
                debug!("{}: Skipping poll (backoff)", self.source.name());
                continue;
            }

            match self.poll_once(&records).await {
                Ok(_) => self.backoff.record_success(self.source.name()),
                Err(e) if e.is_transient() => {
                    self.backoff.record_failure(self.source.name(), e.to_string())
                }
                Err(e) => {
                    warn!("{}: {}, stopping", self.source.name(), e);
                    break MonitorExit::SinkClosed;
                }
            }
        };

        self.set_state(MonitorState::Stopped);
        info!("Stopping monitor for {}", self.source.name());

        MonitorReport {
            consecutive_failures: self.backoff.failure_count(),
            last_error: self.backoff.last_error().map(str::to_string),
            source: self.source,
            exit,
            cursor: Some(self.cursor.next_index()),
            stats: self.stats,
        }
    }

    /// One tick: poll the tree head and process everything up to it.
    ///
    /// The cursor advances before each entry is classified, so an entry is
    /// never handed to the classifier twice whatever the outcome.
    pub async fn poll_once(
        &mut self,
        records: &mpsc::Sender<CertificateRecord>,
    ) -> Result<PollOutcome, PollError> {
        self.set_state(MonitorState::Fetching);

        let head = self
            .client
            .get_tree_head()
            .await
            .map_err(|e| PollError::TreeHead(format!("{:#}", e)))?;

        let first = self.cursor.next_index();

        if head.size == first {
            debug!("{}: Up to date (tree_size={})", self.source.name(), head.size);
            return Ok(PollOutcome::UpToDate);
        }

        if head.size < first {
            warn!(
                "{}: tree size went backwards ({} < cursor {}), ignoring",
                self.source.name(),
                head.size,
                first
            );
            return Ok(PollOutcome::TreeShrank {
                reported: head.size,
                cursor: first,
            });
        }

        let mut tick = EntryStats::default();

        while self.cursor.next_index() < head.size {
            let start = self.cursor.next_index();
            let end = std::cmp::min(start.saturating_add(self.config.batch_size), head.size);

            debug!(
                "{}: Fetching entries [{}, {}) (tree_size={})",
                self.source.name(),
                start,
                end,
                head.size
            );

            let entries = self
                .client
                .get_entries(start, end)
                .await
                .map_err(|e| PollError::Entries {
                    start,
                    end,
                    reason: format!("{:#}", e),
                })?;

            if entries.is_empty() {
                // Nothing at all this tick counts as a failed poll
                if tick.processed == 0 {
                    return Err(PollError::EmptyBatch { start, end });
                }
                warn!(
                    "{}: get-entries [{}, {}) returned nothing, retrying next tick",
                    self.source.name(),
                    start,
                    end
                );
                break;
            }

            let requested = (end - start) as usize;
            if entries.len() > requested {
                warn!(
                    "{}: log returned {} entries for a range of {}, ignoring the excess",
                    self.source.name(),
                    entries.len(),
                    requested
                );
            }

            for entry in entries.into_iter().take(requested) {
                let index = self.cursor.advance();
                tick.processed += 1;
                self.stats.processed += 1;

                match classify(&entry) {
                    Ok(summary) => {
                        let record = CertificateRecord {
                            log_url: self.source.url.clone(),
                            log_description: self.source.description.clone(),
                            index,
                            summary,
                        };
                        records.send(record).await.map_err(|_| PollError::SinkClosed)?;
                        tick.emitted += 1;
                        self.stats.emitted += 1;
                    }
                    Err(reason) => {
                        tick.skipped += 1;
                        self.stats.skipped += 1;
                        let kind = entry.kind();
                        if reason.is_anomaly() {
                            warn!(
                                "{}: Skipping {} entry {}: {}",
                                self.source.name(),
                                kind,
                                index,
                                reason
                            );
                        } else {
                            debug!(
                                "{}: Skipping {} entry {}: {}",
                                self.source.name(),
                                kind,
                                index,
                                reason
                            );
                        }
                    }
                }
            }
        }

        info!(
            "{}: Processed entries {}-{} ({} records, {} skipped)",
            self.source.name(),
            first,
            self.cursor.next_index(),
            tick.emitted,
            tick.skipped
        );

        Ok(PollOutcome::Advanced(tick))
    }
}

/// Resolves once shutdown has been requested or the trigger is gone
async fn wait_for_shutdown(shutdown_rx: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown_rx.borrow_and_update() {
            return;
        }
        if shutdown_rx.changed().await.is_err() {
            return;
        }
    }
}

/// Full lifecycle of one log: initialize, then run until shutdown.
/// Startup failures end this log only.
pub async fn run_log_monitor(
    source: LogSource,
    factory: &dyn LogClientFactory,
    config: LogMonitorConfig,
    records: mpsc::Sender<CertificateRecord>,
    shutdown_rx: watch::Receiver<bool>,
) -> MonitorReport {
    match LogMonitor::initialize(source.clone(), factory, config).await {
        Ok(monitor) => monitor.run(records, shutdown_rx).await,
        Err(e) => {
            error!("{}", e);
            MonitorReport {
                source,
                exit: MonitorExit::Failed(e),
                cursor: None,
                stats: EntryStats::default(),
                consecutive_failures: 0,
                last_error: None,
            }
        }
    }
}
