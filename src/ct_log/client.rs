// src/ct_log/client.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::leaf::decode_entry;
use super::types::{GetEntriesResponse, LogSource, RawEntry, SignedTreeHead, TreeHead};

/// What a monitor needs from a CT log
#[async_trait]
pub trait LogClient: Send + Sync {
    async fn get_tree_head(&self) -> Result<TreeHead>;

    /// Fetch the half-open range `[start, end)`. Logs may return fewer
    /// entries than requested.
    async fn get_entries(&self, start: u64, end: u64) -> Result<Vec<RawEntry>>;
}

/// Builds a [`LogClient`] bound to one log endpoint
pub trait LogClientFactory: Send + Sync {
    fn connect(&self, source: &LogSource) -> Result<Box<dyn LogClient>>;
}

/// HTTP client for Certificate Transparency log RFC 6962 API
pub struct CtLogClient {
    base_url: Url,
    http_client: reqwest::Client,
}

impl CtLogClient {
    /// Create a new CT log client. Fails on malformed or non-HTTP URLs.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Invalid endpoint path {}", path))
    }

    /// Get Signed Tree Head (current log size and timestamp)
    /// Endpoint: GET {base_url}/ct/v1/get-sth
    pub async fn get_sth(&self) -> Result<SignedTreeHead> {
        let url = self.endpoint("ct/v1/get-sth")?;

        debug!("Fetching STH from {}", url);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .context("Failed to fetch STH")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "STH request failed with status {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }

        let sth: SignedTreeHead = response
            .json()
            .await
            .context("Failed to parse STH JSON")?;

        debug!(
            "STH received: tree_size={}, timestamp={}",
            sth.tree_size, sth.timestamp
        );

        Ok(sth)
    }

    /// Endpoint: GET {base_url}/ct/v1/get-entries?start={start}&end={end}
    /// (`end` is inclusive on the wire)
    async fn fetch_entries(&self, start: u64, end_inclusive: u64) -> Result<GetEntriesResponse> {
        let mut url = self.endpoint("ct/v1/get-entries")?;
        url.query_pairs_mut()
            .append_pair("start", &start.to_string())
            .append_pair("end", &end_inclusive.to_string());

        debug!("Fetching entries {}-{} from {}", start, end_inclusive, self.base_url);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .context("Failed to fetch entries")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                warn!("Rate limited by CT log: {}", self.base_url);
                anyhow::bail!("Rate limited (429)");
            }

            anyhow::bail!(
                "Get entries request failed with status {}: {}",
                status,
                body
            );
        }

        response
            .json()
            .await
            .context("Failed to parse entries JSON")
    }
}

#[async_trait]
impl LogClient for CtLogClient {
    async fn get_tree_head(&self) -> Result<TreeHead> {
        let sth = self.get_sth().await?;
        Ok(TreeHead {
            size: sth.tree_size,
            timestamp: Some(sth.timestamp),
        })
    }

    async fn get_entries(&self, start: u64, end: u64) -> Result<Vec<RawEntry>> {
        if end <= start {
            return Ok(Vec::new());
        }

        let response = self.fetch_entries(start, end - 1).await?;

        debug!(
            "Received {} entries from {}",
            response.entries.len(),
            self.base_url
        );

        Ok(response.entries.iter().map(decode_entry).collect())
    }
}

/// Builds [`CtLogClient`]s sharing one request timeout
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    timeout: Duration,
}

impl HttpClientFactory {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpClientFactory {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl LogClientFactory for HttpClientFactory {
    fn connect(&self, source: &LogSource) -> Result<Box<dyn LogClient>> {
        let client = CtLogClient::new(&source.url, self.timeout)?;
        Ok(Box::new(client))
    }
}

/// Parse a log URL and give it a trailing slash so relative joins keep the
/// log's path prefix.
fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw).with_context(|| format!("Invalid log URL {:?}", raw))?;

    match url.scheme() {
        "http" | "https" => {}
        other => anyhow::bail!("Unsupported scheme {:?} in log URL {}", other, raw),
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}
