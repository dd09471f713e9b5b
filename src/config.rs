// src/config.rs

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::ct_log::monitor::LogMonitorConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
    #[serde(default = "default_max_backoff_ticks")]
    pub max_backoff_ticks: u32,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_poll_interval() -> u64 { 10 }
fn default_batch_size() -> u64 { 256 }
fn default_max_backoff_ticks() -> u32 { 30 }
fn default_request_timeout() -> u64 { 30 }
fn default_channel_capacity() -> usize { 1000 }

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            batch_size: default_batch_size(),
            max_backoff_ticks: default_max_backoff_ticks(),
            request_timeout_secs: default_request_timeout(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl MonitorConfig {
    pub fn monitor_config(&self) -> LogMonitorConfig {
        LogMonitorConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            batch_size: self.batch_size,
            max_backoff_ticks: self.max_backoff_ticks,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// A log given directly in the config instead of coming from the log list
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CustomLog {
    pub url: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogListConfig {
    #[serde(default = "default_log_list_url")]
    pub url: String,
    /// Operator names to take logs from; empty means every operator
    #[serde(default = "default_operators")]
    pub operators: Vec<String>,
    #[serde(default)]
    pub include_readonly: bool,
    #[serde(default)]
    pub include_pending: bool,
    /// Ignore log state entirely
    #[serde(default)]
    pub include_all_states: bool,
    /// Replaces the fetched list when set
    #[serde(default)]
    pub custom_logs: Option<Vec<CustomLog>>,
    #[serde(default = "default_max_logs")]
    pub max_logs: usize,
}

fn default_log_list_url() -> String {
    "https://www.gstatic.com/ct/log_list/v3/log_list.json".to_string()
}
fn default_operators() -> Vec<String> { vec!["Google".to_string()] }
fn default_max_logs() -> usize { 100 }

impl Default for LogListConfig {
    fn default() -> Self {
        Self {
            url: default_log_list_url(),
            operators: default_operators(),
            include_readonly: false,
            include_pending: false,
            include_all_states: false,
            custom_logs: None,
            max_logs: default_max_logs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// One of "human", "json", "csv"
    #[serde(default = "default_output_format")]
    pub format: String,
    /// Write records to this file instead of stdout
    #[serde(default)]
    pub file: Option<String>,
}

fn default_output_format() -> String { "human".to_string() }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_output_format(),
            file: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub log_list: LogListConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.monitor.poll_interval_secs == 0 {
            anyhow::bail!("monitor.poll_interval_secs must be greater than 0");
        }
        if self.monitor.batch_size == 0 {
            anyhow::bail!("monitor.batch_size must be greater than 0");
        }
        if self.monitor.channel_capacity == 0 {
            anyhow::bail!("monitor.channel_capacity must be greater than 0");
        }
        if self.log_list.max_logs == 0 {
            anyhow::bail!("log_list.max_logs must be greater than 0");
        }
        match self.output.format.as_str() {
            "human" | "json" | "csv" => {}
            other => anyhow::bail!(
                "Invalid output.format '{}'. Must be 'human', 'json' or 'csv'",
                other
            ),
        }
        Ok(())
    }
}
