// src/ct_log/mock.rs
//! In-memory CT log for unit tests.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use super::client::{LogClient, LogClientFactory};
use super::types::{LogSource, RawEntry, TreeHead};

#[derive(Default)]
struct MockState {
    current_size: u64,
    heads: VecDeque<Result<u64, String>>,
    head_calls: usize,
    overrides: HashMap<u64, RawEntry>,
    max_per_fetch: Option<usize>,
    fail_next: u32,
    fail_on_call: Option<usize>,
    empty_on_calls: HashSet<usize>,
    extra_per_fetch: u64,
    fetches: Vec<(u64, u64)>,
}

/// Scripted log: tree heads are served from a queue (the last size repeats
/// once it is empty) and every index holds a valid X509 leaf unless overridden.
pub(crate) struct MockLog {
    cert_der: Vec<u8>,
    state: Mutex<MockState>,
}

impl MockLog {
    pub(crate) fn new(initial_size: u64) -> Arc<Self> {
        let certified = rcgen::generate_simple_self_signed(vec![
            "a.example".to_string(),
            "b.example".to_string(),
        ])
        .unwrap();

        Arc::new(Self {
            cert_der: certified.cert.der().to_vec(),
            state: Mutex::new(MockState {
                current_size: initial_size,
                ..Default::default()
            }),
        })
    }

    pub(crate) fn client(self: &Arc<Self>) -> Box<dyn LogClient> {
        Box::new(MockClient(Arc::clone(self)))
    }

    pub(crate) fn push_size(&self, size: u64) {
        self.state.lock().unwrap().heads.push_back(Ok(size));
    }

    pub(crate) fn push_head_error(&self, message: &str) {
        self.state
            .lock()
            .unwrap()
            .heads
            .push_back(Err(message.to_string()));
    }

    pub(crate) fn set_entry(&self, index: u64, entry: RawEntry) {
        self.state.lock().unwrap().overrides.insert(index, entry);
    }

    /// Serve at most `n` entries per get-entries call
    pub(crate) fn limit_batch(&self, n: usize) {
        self.state.lock().unwrap().max_per_fetch = Some(n);
    }

    pub(crate) fn fail_next_fetches(&self, n: u32) {
        self.state.lock().unwrap().fail_next = n;
    }

    /// Fail the n-th get-entries call (1-based, counting all calls so far)
    pub(crate) fn fail_fetch_number(&self, n: usize) {
        self.state.lock().unwrap().fail_on_call = Some(n);
    }

    /// Answer the n-th get-entries call (1-based) with no entries at all
    pub(crate) fn empty_fetch_number(&self, n: usize) {
        self.state.lock().unwrap().empty_on_calls.insert(n);
    }

    /// Append `n` entries past the requested end to every response
    pub(crate) fn overfill_batches(&self, n: u64) {
        self.state.lock().unwrap().extra_per_fetch = n;
    }

    pub(crate) fn fetches(&self) -> Vec<(u64, u64)> {
        self.state.lock().unwrap().fetches.clone()
    }

    pub(crate) fn head_calls(&self) -> usize {
        self.state.lock().unwrap().head_calls
    }

    fn entry_at(&self, state: &MockState, index: u64) -> RawEntry {
        state
            .overrides
            .get(&index)
            .cloned()
            .unwrap_or_else(|| RawEntry::X509 {
                cert_der: self.cert_der.clone(),
                timestamp: Some(1_700_000_000_000 + index),
            })
    }
}

struct MockClient(Arc<MockLog>);

#[async_trait]
impl LogClient for MockClient {
    async fn get_tree_head(&self) -> Result<TreeHead> {
        let mut state = self.0.state.lock().unwrap();
        state.head_calls += 1;
        match state.heads.pop_front() {
            Some(Ok(size)) => {
                state.current_size = size;
                Ok(TreeHead::new(size))
            }
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Ok(TreeHead::new(state.current_size)),
        }
    }

    async fn get_entries(&self, start: u64, end: u64) -> Result<Vec<RawEntry>> {
        let mut state = self.0.state.lock().unwrap();
        state.fetches.push((start, end));

        if state.fail_on_call == Some(state.fetches.len()) {
            anyhow::bail!("scripted failure on call {}", state.fetches.len());
        }
        if state.fail_next > 0 {
            state.fail_next -= 1;
            anyhow::bail!("scripted fetch failure");
        }

        if state.empty_on_calls.contains(&state.fetches.len()) {
            return Ok(Vec::new());
        }

        let mut count = end.saturating_sub(start) as usize;
        if let Some(max) = state.max_per_fetch {
            count = count.min(max);
        }
        count += state.extra_per_fetch as usize;

        Ok((start..start + count as u64)
            .map(|index| self.0.entry_at(&state, index))
            .collect())
    }
}

/// Factory that only knows the logs registered with it
#[derive(Default)]
pub(crate) struct MockFactory {
    logs: HashMap<String, Arc<MockLog>>,
}

impl MockFactory {
    pub(crate) fn with_log(mut self, url: &str, log: Arc<MockLog>) -> Self {
        self.logs.insert(url.to_string(), log);
        self
    }
}

impl LogClientFactory for MockFactory {
    fn connect(&self, source: &LogSource) -> Result<Box<dyn LogClient>> {
        match self.logs.get(&source.url) {
            Some(log) => Ok(log.client()),
            None => anyhow::bail!("unreachable log {}", source.url),
        }
    }
}
