// src/ct_log/mod.rs
pub mod backoff;
pub mod client;
pub mod leaf;
pub mod log_list;
pub mod monitor;
pub mod supervisor;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use backoff::{LogHealth, PollBackoff};
pub use client::{CtLogClient, HttpClientFactory, LogClient, LogClientFactory};
pub use log_list::LogListFetcher;
pub use monitor::{LogMonitor, LogMonitorConfig, MonitorExit, MonitorReport, MonitorState, PollOutcome};
pub use supervisor::{MonitorSupervisor, ShutdownTrigger, SupervisorReport};
pub use types::{CertificateRecord, CertificateSummary, Cursor, LogSource, RawEntry, TreeHead};
