// src/ct_log/supervisor.rs
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::client::LogClientFactory;
use super::monitor::{run_log_monitor, LogMonitorConfig, MonitorExit, MonitorReport};
use super::types::{CertificateRecord, LogSource};
use crate::error::SupervisorError;
use crate::output::OutputManager;

/// Broadcasts shutdown to every monitor of one supervisor
#[derive(Clone)]
pub struct ShutdownTrigger {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        info!("Signaling shutdown to all monitors");
        // send_replace never fails, even with every monitor already gone
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Outcome of every monitor, in the order the logs were given
#[derive(Debug)]
pub struct SupervisorReport {
    pub monitors: Vec<MonitorReport>,
    /// Tasks that panicked instead of returning a report
    pub panicked: usize,
    pub records_emitted: u64,
}

impl SupervisorReport {
    pub fn started(&self) -> usize {
        self.monitors
            .iter()
            .filter(|r| !matches!(r.exit, MonitorExit::Failed(_)))
            .count()
    }
}

/// Runs one monitor per CT log and feeds their records to the output
pub struct MonitorSupervisor {
    monitors: Vec<JoinHandle<MonitorReport>>,
    record_rx: mpsc::Receiver<CertificateRecord>,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl MonitorSupervisor {
    /// Spawn a monitor task for every source
    pub fn start(
        sources: Vec<LogSource>,
        factory: Arc<dyn LogClientFactory>,
        config: LogMonitorConfig,
        channel_capacity: usize,
    ) -> Result<Self, SupervisorError> {
        if sources.is_empty() {
            return Err(SupervisorError::NoLogSources);
        }

        let (record_tx, record_rx) = mpsc::channel(channel_capacity.max(1));
        let (shutdown_tx, _) = watch::channel(false);

        info!("Starting {} CT log monitors", sources.len());

        let monitors: Vec<JoinHandle<MonitorReport>> = sources
            .into_iter()
            .map(|source| {
                let factory = Arc::clone(&factory);
                let config = config.clone();
                let record_tx = record_tx.clone();
                let shutdown_rx = shutdown_tx.subscribe();

                tokio::spawn(async move {
                    run_log_monitor(source, factory.as_ref(), config, record_tx, shutdown_rx).await
                })
            })
            .collect();

        // Drop original sender so channel closes when all monitors finish
        drop(record_tx);

        info!("Spawned {} monitor tasks", monitors.len());

        Ok(Self {
            monitors,
            record_rx,
            shutdown_tx: Arc::new(shutdown_tx),
        })
    }

    pub fn shutdown_trigger(&self) -> ShutdownTrigger {
        ShutdownTrigger {
            tx: Arc::clone(&self.shutdown_tx),
        }
    }

    /// Emit records until every monitor has stopped, then join them all
    pub async fn run(mut self, output: OutputManager) -> SupervisorReport {
        let mut records_emitted = 0u64;

        while let Some(record) = self.record_rx.recv().await {
            records_emitted += 1;
            if let Err(e) = output.emit(&record).await {
                warn!("Output error: {:#}", e);
            }
        }

        info!("Record channel closed, supervisor shutting down");

        if let Err(e) = output.flush().await {
            warn!("Failed to flush output: {:#}", e);
        }

        let mut monitors = Vec::with_capacity(self.monitors.len());
        let mut panicked = 0;

        for handle in self.monitors {
            match handle.await {
                Ok(report) => monitors.push(report),
                Err(e) => {
                    error!("Monitor task failed: {}", e);
                    panicked += 1;
                }
            }
        }

        info!("All monitor tasks stopped");

        SupervisorReport {
            monitors,
            panicked,
            records_emitted,
        }
    }
}
