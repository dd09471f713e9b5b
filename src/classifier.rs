// src/classifier.rs
//! Turns fetched leaves into certificate summaries or skip reasons.

use chrono::DateTime;
use std::fmt;

use crate::cert_parser::CertificateParser;
use crate::ct_log::types::{CertificateSummary, RawEntry};

/// Why an entry produced no record. None of these are fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    ParseFailed(String),
    MissingTimestamp,
    /// Leaf timestamp does not fit a calendar date
    InvalidTimestamp(u64),
    Precertificate,
    UnknownType(Option<u16>),
}

impl SkipReason {
    /// Skips that deserve a warning rather than a debug line
    pub fn is_anomaly(&self) -> bool {
        !matches!(self, SkipReason::Precertificate)
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ParseFailed(e) => write!(f, "certificate parse failed: {}", e),
            SkipReason::MissingTimestamp => write!(f, "leaf has no timestamp"),
            SkipReason::InvalidTimestamp(ms) => write!(f, "leaf timestamp {} out of range", ms),
            SkipReason::Precertificate => write!(f, "precertificate"),
            SkipReason::UnknownType(Some(t)) => write!(f, "unknown entry type {}", t),
            SkipReason::UnknownType(None) => write!(f, "undecodable leaf"),
        }
    }
}

pub fn classify(entry: &RawEntry) -> Result<CertificateSummary, SkipReason> {
    match entry {
        RawEntry::X509 {
            cert_der,
            timestamp,
        } => {
            let parsed = CertificateParser::parse_der(cert_der)
                .map_err(|e| SkipReason::ParseFailed(e.to_string()))?;

            let millis = timestamp.ok_or(SkipReason::MissingTimestamp)?;
            let timestamp = i64::try_from(millis)
                .ok()
                .and_then(DateTime::from_timestamp_millis)
                .ok_or(SkipReason::InvalidTimestamp(millis))?;

            Ok(CertificateSummary {
                timestamp,
                names: parsed.display_names(),
                issuer: parsed.issuer,
                fingerprint: parsed.fingerprint,
            })
        }
        RawEntry::Precert { .. } => Err(SkipReason::Precertificate),
        RawEntry::Unknown { entry_type } => Err(SkipReason::UnknownType(*entry_type)),
    }
}
