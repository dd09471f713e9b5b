// src/output/csv.rs
//! CSV output handler

use crate::ct_log::types::CertificateRecord;
use crate::output::OutputHandler;
use async_trait::async_trait;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::Mutex;

#[derive(Serialize)]
struct CsvRow<'a> {
    timestamp: String,
    issuer: &'a str,
    names: &'a str,
    index: u64,
    log: &'a str,
    fingerprint: &'a str,
}

impl<'a> From<&'a CertificateRecord> for CsvRow<'a> {
    fn from(record: &'a CertificateRecord) -> Self {
        Self {
            timestamp: record.summary.timestamp_rfc3339(),
            issuer: &record.summary.issuer,
            names: &record.summary.names,
            index: record.index,
            log: &record.log_url,
            fingerprint: &record.summary.fingerprint,
        }
    }
}

/// CSV output handler; the header row is written with the first record
pub struct CsvOutput {
    writer: Mutex<::csv::Writer<Box<dyn Write + Send>>>,
}

impl CsvOutput {
    pub fn new() -> Self {
        Self::from_writer(Box::new(io::stdout()))
    }

    pub fn to_file(file: std::fs::File) -> Self {
        Self::from_writer(Box::new(file))
    }

    fn from_writer(inner: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(::csv::Writer::from_writer(inner)),
        }
    }
}

impl Default for CsvOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutputHandler for CsvOutput {
    async fn emit_record(&self, record: &CertificateRecord) -> anyhow::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("csv output writer poisoned"))?;
        writer.serialize(CsvRow::from(record))?;
        writer.flush()?;
        Ok(())
    }

    async fn flush(&self) -> anyhow::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("csv output writer poisoned"))?;
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
    async fn test_csv_header_once_and_quoting() {
        let mut file = tempfile::tempfile().unwrap();
        let handler = CsvOutput::to_file(file.try_clone().unwrap());

        handler.emit_record(&sample_record()).await.unwrap();
        handler.emit_record(&sample_record()).await.unwrap();
        handler.flush().await.unwrap();

        let mut contents = String::new();
        file.rewind().unwrap();
        file.read_to_string(&mut contents).unwrap();

        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "timestamp,issuer,names,index,log,fingerprint");
        assert!(lines[1].starts_with(
            "2024-05-01T12:30:00Z,\"C=US, O=Example CA, CN=Example R1\",\"test.com, www.test.com\",123,"
        ));
    }
}
