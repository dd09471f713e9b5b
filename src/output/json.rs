// src/output/json.rs
//! JSON Lines (JSONL) output handler

use crate::ct_log::types::CertificateRecord;
use crate::output::OutputHandler;
use async_trait::async_trait;
use std::io::{self, Write};
use std::sync::Mutex;

/// Outputs one JSON object per line (JSONL/NDJSON format)
pub struct JsonOutput {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonOutput {
    pub fn new() -> Self {
        Self {
            writer: Mutex::new(Box::new(io::stdout())),
        }
    }

    pub fn to_file(file: std::fs::File) -> Self {
        Self {
            writer: Mutex::new(Box::new(file)),
        }
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutputHandler for JsonOutput {
    async fn emit_record(&self, record: &CertificateRecord) -> anyhow::Result<()> {
        let json = serde_json::to_string(record)?;

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("json output writer poisoned"))?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;

        Ok(())
    }

    async fn flush(&self) -> anyhow::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("json output writer poisoned"))?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::sample_record;
    use std::io::{Read, Seek};

    #[tokio::test]
    async fn test_json_lines_are_parseable() {
        let mut file = tempfile::tempfile().unwrap();
        let handler = JsonOutput::to_file(file.try_clone().unwrap());

        handler.emit_record(&sample_record()).await.unwrap();
        handler.flush().await.unwrap();

        let mut contents = String::new();
        file.rewind().unwrap();
        file.read_to_string(&mut contents).unwrap();

        let value: serde_json::Value = serde_json::from_str(contents.trim_end()).unwrap();
        assert_eq!(value["log_description"], "Example Log");
        assert_eq!(value["index"], 123);
        assert_eq!(value["timestamp"], "2024-05-01T12:30:00Z");
        assert_eq!(value["names"], "test.com, www.test.com");
    }
}
