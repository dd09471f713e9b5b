// src/output/human.rs
//! One line per certificate, colored when stdout is a terminal

use crate::ct_log::types::CertificateRecord;
use crate::output::OutputHandler;
use async_trait::async_trait;
use colored::Colorize;
use std::io::{self, Write};
use std::sync::Mutex;

pub struct HumanOutput {
    writer: Mutex<Box<dyn Write + Send>>,
    use_colors: bool,
}

impl HumanOutput {
    /// Create a new HumanOutput that writes to stdout
    pub fn new() -> Self {
        Self {
            writer: Mutex::new(Box::new(io::stdout())),
            use_colors: is_terminal::is_terminal(std::io::stdout()),
        }
    }

    /// Create a new HumanOutput that writes to a file
    pub fn to_file(file: std::fs::File) -> Self {
        Self {
            writer: Mutex::new(Box::new(file)),
            use_colors: false, // No colors when writing to file
        }
    }

    pub fn format_line(record: &CertificateRecord) -> String {
        format!(
            "Timestamp: {}, Issuer: {}, Names: {}",
            record.summary.timestamp_rfc3339(),
            record.summary.issuer,
            record.summary.names
        )
    }

    fn format_colored(record: &CertificateRecord) -> String {
        format!(
            "{} {} {} {} {} {}",
            "Timestamp:".dimmed(),
            record.summary.timestamp_rfc3339(),
            "Issuer:".dimmed(),
            record.summary.issuer.yellow(),
            "Names:".dimmed(),
            record.summary.names.cyan().bold()
        )
    }
}

impl Default for HumanOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutputHandler for HumanOutput {
    async fn emit_record(&self, record: &CertificateRecord) -> anyhow::Result<()> {
        let line = if self.use_colors {
            Self::format_colored(record)
        } else {
            Self::format_line(record)
        };

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("human output writer poisoned"))?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }

    async fn flush(&self) -> anyhow::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("human output writer poisoned"))?;
        writer.flush()?;
        Ok(())
    }
}
