// src/ct_log/log_list.rs
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{debug, info};

use super::types::{LogListV3, LogSource};
use crate::config::LogListConfig;

/// Fetches the public CT log list and picks the logs to monitor
pub struct LogListFetcher {
    http_client: reqwest::Client,
}

impl LogListFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { http_client })
    }

    /// Fetch and decode the v3 log list
    pub async fn fetch(&self, list_url: &str) -> Result<LogListV3> {
        info!("Fetching CT log list from {}", list_url);

        let response = self
            .http_client
            .get(list_url)
            .send()
            .await
            .context("Failed to fetch CT log list")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to fetch log list: HTTP {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse log list JSON")
    }

    /// Logs to monitor: `custom_logs` if configured, otherwise the fetched
    /// list filtered by operator and state. Never returns an empty set.
    pub async fn resolve_sources(&self, config: &LogListConfig) -> Result<Vec<LogSource>> {
        let mut sources = match &config.custom_logs {
            Some(custom) => {
                info!("Using {} custom CT logs (replacing the log list)", custom.len());
                custom
                    .iter()
                    .map(|log| LogSource::new(log.url.clone(), log.description.clone()))
                    .collect()
            }
            None => {
                let list = self.fetch(&config.url).await?;
                select_logs(&list, config)?
            }
        };

        if sources.len() > config.max_logs {
            info!(
                "Monitoring {} of {} CT logs (limited by max_logs)",
                config.max_logs,
                sources.len()
            );
            sources.truncate(config.max_logs);
        }

        if sources.is_empty() {
            anyhow::bail!("No CT logs selected for monitoring");
        }

        Ok(sources)
    }
}

/// Pick logs from a decoded list. An operator named in the config but absent
/// from the list is an error.
pub fn select_logs(list: &LogListV3, config: &LogListConfig) -> Result<Vec<LogSource>> {
    for wanted in &config.operators {
        if !list
            .operators
            .iter()
            .any(|op| op.name.eq_ignore_ascii_case(wanted))
        {
            anyhow::bail!("{} operator not found in the log list", wanted);
        }
    }

    let mut selected = Vec::new();

    for operator in &list.operators {
        let wanted = config.operators.is_empty()
            || config
                .operators
                .iter()
                .any(|name| name.eq_ignore_ascii_case(&operator.name));
        if !wanted {
            continue;
        }

        for log in &operator.logs {
            if log.url.is_empty() {
                continue;
            }

            let acceptable = config.include_all_states
                || log.state.as_ref().is_some_and(|state| {
                    state.is_acceptable(config.include_readonly, config.include_pending)
                });

            let state_desc = log.state.as_ref().map(|s| s.describe()).unwrap_or("no-state");

            if acceptable {
                debug!("Found {} log: {} ({})", state_desc, log.description, log.url);
                if !selected.iter().any(|s: &LogSource| s.url == log.url) {
                    selected.push(LogSource::new(log.url.clone(), log.description.clone()));
                }
            } else {
                debug!("Skipping {} log: {} ({})", state_desc, log.description, log.url);
            }
        }
    }

    info!(
        "Selected {} CT logs (operators={:?}, readonly={}, pending={}, all_states={})",
        selected.len(),
        config.operators,
        config.include_readonly,
        config.include_pending,
        config.include_all_states
    );

    Ok(selected)
}
