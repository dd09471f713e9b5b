// src/output/mod.rs
//! Output handling for ct-tail
//!
//! Every summarised certificate is handed to each registered handler.
//! Handlers only ever see finished records, so a new format or destination
//! needs nothing from the monitoring core.

use crate::config::OutputConfig;
use crate::ct_log::types::CertificateRecord;
use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;

pub mod csv;
pub mod human;
pub mod json;

/// Trait for output handlers that process certificate records
#[async_trait]
pub trait OutputHandler: Send + Sync {
    async fn emit_record(&self, record: &CertificateRecord) -> anyhow::Result<()>;

    /// Flush any buffered output
    async fn flush(&self) -> anyhow::Result<()>;
}

/// Manager that dispatches output to multiple handlers
pub struct OutputManager {
    handlers: Vec<Arc<dyn OutputHandler>>,
}

impl OutputManager {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Single handler for the configured format, writing to stdout or a file
    pub fn from_config(config: &OutputConfig) -> anyhow::Result<Self> {
        let file = match config.file {
            Some(ref path) => Some(
                std::fs::File::create(path)
                    .with_context(|| format!("Failed to create output file {}", path))?,
            ),
            None => None,
        };

        let handler: Arc<dyn OutputHandler> = match (config.format.as_str(), file) {
            ("human", Some(file)) => Arc::new(human::HumanOutput::to_file(file)),
            ("human", None) => Arc::new(human::HumanOutput::new()),
            ("json", Some(file)) => Arc::new(json::JsonOutput::to_file(file)),
            ("json", None) => Arc::new(json::JsonOutput::new()),
            ("csv", Some(file)) => Arc::new(csv::CsvOutput::to_file(file)),
            ("csv", None) => Arc::new(csv::CsvOutput::new()),
            (other, _) => anyhow::bail!("Unknown output format '{}'", other),
        };

        if let Some(ref path) = config.file {
            tracing::info!("Writing {} output to: {}", config.format, path);
        }

        let mut manager = Self::new();
        manager.add_handler(handler);
        Ok(manager)
    }

    pub fn add_handler(&mut self, handler: Arc<dyn OutputHandler>) {
        self.handlers.push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Emit a record to all handlers
    ///
    /// Errors from individual handlers are logged but don't stop the others.
    pub async fn emit(&self, record: &CertificateRecord) -> anyhow::Result<()> {
        let mut failures = 0;
        let mut last_error = None;

        for handler in &self.handlers {
            if let Err(e) = handler.emit_record(record).await {
                tracing::warn!("Output handler error: {:#}", e);
                failures += 1;
                last_error = Some(e);
            }
        }

        // Return error only if ALL handlers failed
        match last_error {
            Some(err) if failures == self.handlers.len() => Err(err),
            _ => Ok(()),
        }
    }

    pub async fn flush(&self) -> anyhow::Result<()> {
        for handler in &self.handlers {
            handler.flush().await?;
        }
        Ok(())
    }
}

impl Default for OutputManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) fn sample_record() -> CertificateRecord {
    use crate::ct_log::types::CertificateSummary;
    use chrono::TimeZone;

    CertificateRecord {
        log_url: "https://ct.example/log/".to_string(),
        log_description: "Example Log".to_string(),
        index: 123,
        summary: CertificateSummary {
            timestamp: chrono::Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
            issuer: "C=US, O=Example CA, CN=Example R1".to_string(),
            names: "test.com, www.test.com".to_string(),
            fingerprint: "ab".repeat(32),
        },
    }
}
