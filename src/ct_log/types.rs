// src/ct_log/types.rs
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A CT log selected for monitoring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSource {
    pub url: String,
    #[serde(default)]
    pub description: String,
}

impl LogSource {
    pub fn new(url: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            description: description.into(),
        }
    }

    /// Description if the list provided one, otherwise the URL
    pub fn name(&self) -> &str {
        if self.description.is_empty() {
            &self.url
        } else {
            &self.description
        }
    }
}

/// Current size of a log, as reported by one tree-head poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeHead {
    pub size: u64,
    /// Log timestamp in milliseconds, informational only
    pub timestamp: Option<u64>,
}

impl TreeHead {
    pub fn new(size: u64) -> Self {
        Self {
            size,
            timestamp: None,
        }
    }
}

/// A leaf as fetched from a log, before classification.
/// Its index is implied by its position in the fetched range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEntry {
    X509 {
        cert_der: Vec<u8>,
        timestamp: Option<u64>,
    },
    Precert {
        tbs_der: Vec<u8>,
        timestamp: Option<u64>,
    },
    Unknown {
        entry_type: Option<u16>,
    },
}

impl RawEntry {
    pub fn kind(&self) -> &'static str {
        match self {
            RawEntry::X509 { .. } => "x509",
            RawEntry::Precert { .. } => "precert",
            RawEntry::Unknown { .. } => "unknown",
        }
    }
}

/// Next unprocessed entry index of one log
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor {
    next_index: u64,
}

impl Cursor {
    pub fn new(next_index: u64) -> Self {
        Self { next_index }
    }

    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Claim the next index. The cursor only ever moves forward.
    pub fn advance(&mut self) -> u64 {
        let claimed = self.next_index;
        self.next_index += 1;
        claimed
    }
}

/// What gets reported for one successfully classified X509 leaf
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateSummary {
    #[serde(serialize_with = "serialize_rfc3339")]
    pub timestamp: DateTime<Utc>,
    pub issuer: String,
    /// Joined DNS names, or the subject common name when there are none
    pub names: String,
    pub fingerprint: String,
}

impl CertificateSummary {
    pub fn timestamp_rfc3339(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

fn serialize_rfc3339<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// A summary tagged with where it came from; the unit handed to output handlers
#[derive(Debug, Clone, Serialize)]
pub struct CertificateRecord {
    pub log_url: String,
    pub log_description: String,
    pub index: u64,
    #[serde(flatten)]
    pub summary: CertificateSummary,
}

/// Response from CT log's get-sth endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTreeHead {
    pub tree_size: u64,
    pub timestamp: u64,
    #[serde(default)]
    pub sha256_root_hash: String,
    #[serde(default)]
    pub tree_head_signature: String,
}

/// Single entry from CT log's get-entries endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub leaf_input: String, // base64-encoded MerkleTreeLeaf
    #[serde(default)]
    pub extra_data: String, // base64-encoded chain
}

/// Response wrapper for get-entries endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct GetEntriesResponse {
    pub entries: Vec<LogEntry>,
}

/// CT log list V3 format
#[derive(Debug, Serialize, Deserialize)]
pub struct LogListV3 {
    pub operators: Vec<Operator>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Operator {
    pub name: String,
    #[serde(default)]
    pub email: Vec<String>,
    #[serde(default)]
    pub logs: Vec<LogInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogInfo {
    #[serde(default)]
    pub description: String,
    pub log_id: Option<String>,
    #[serde(default)]
    pub url: String,
    pub mmd: Option<u64>,
    #[serde(default)]
    pub state: Option<StateWrapper>,
}

/// State wrapper that can contain different state types
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateWrapper {
    #[serde(default)]
    pub usable: Option<StateTimestamp>,
    #[serde(default)]
    pub readonly: Option<StateTimestamp>,
    #[serde(default)]
    pub retired: Option<StateTimestamp>,
    #[serde(default)]
    pub rejected: Option<StateTimestamp>,
    #[serde(default)]
    pub qualified: Option<StateTimestamp>,
    #[serde(default)]
    pub pending: Option<StateTimestamp>,
}

impl StateWrapper {
    /// Log is actively accepting new entries
    pub fn is_usable(&self) -> bool {
        self.usable.is_some() || self.qualified.is_some()
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly.is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn describe(&self) -> &'static str {
        if self.is_usable() {
            "usable"
        } else if self.is_readonly() {
            "readonly"
        } else if self.is_pending() {
            "pending"
        } else if self.retired.is_some() {
            "retired"
        } else if self.rejected.is_some() {
            "rejected"
        } else {
            "other"
        }
    }

    pub fn is_acceptable(&self, include_readonly: bool, include_pending: bool) -> bool {
        self.is_usable()
            || (include_readonly && self.is_readonly())
            || (include_pending && self.is_pending())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTimestamp {
    pub timestamp: String,
}
