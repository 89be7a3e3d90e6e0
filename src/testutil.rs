//! Test and benchmark utilities.
//!
//! This module is only available when the `testutil` feature is enabled.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use crate::backend::{
    BackendKind, BatchWrite, Connector, QueryClass, QueryParams, RecordError, Session,
};
use crate::connection::Sleeper;
use crate::core::BackendError;
use crate::dataset::{REQUIRED_COLUMNS, Record, Sentiment};

/// RNG seed for deterministic data generation.
pub const TEST_RNG_SEED: u64 = 42;

/// Generate `n` deterministic records with ids `1..=n`.
pub fn generate_records(n: usize) -> Vec<Record> {
    let mut rng = StdRng::seed_from_u64(TEST_RNG_SEED);
    (1..=n)
        .map(|i| {
            let positive = rng.gen_bool(0.5);
            let compound: f64 = if positive {
                rng.gen_range(0.05..1.0)
            } else {
                rng.gen_range(-1.0..-0.05)
            };
            let label = if positive {
                Sentiment::Positive
            } else {
                Sentiment::Negative
            };
            Record {
                tweet_id: i as i64,
                target: if positive { 4 } else { 0 },
                date: format!("2009-04-{:02} 22:{:02}:{:02}", 1 + i % 28, i % 60, (i * 7) % 60),
                username: format!("user_{}", i % 97),
                flag: "NO_QUERY".to_string(),
                text: format!("tweet number {i}"),
                cleaned_text: format!("tweet number {i}"),
                original_sentiment: Some(label),
                textblob_sentiment: label,
                vader_sentiment: label,
                textblob_polarity: compound / 2.0,
                vader_compound: compound,
                comparison_textblob: true,
                comparison_vader: true,
            }
        })
        .collect()
}

/// Write records as an annotated-dataset CSV inside a fresh temp dir.
/// The TempDir must be kept alive while the file is used.
pub fn write_dataset(records: &[Record]) -> std::io::Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let path = dir.path().join("dataset.csv");
    write_dataset_to(&path, records)?;
    Ok((dir, path))
}

pub fn write_dataset_to(path: &Path, records: &[Record]) -> std::io::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(REQUIRED_COLUMNS)?;
    for r in records {
        let py_bool = |b: bool| if b { "True" } else { "False" };
        writer.write_record([
            r.tweet_id.to_string(),
            r.target.to_string(),
            r.date.clone(),
            r.flag.clone(),
            r.username.clone(),
            r.text.clone(),
            r.cleaned_text.clone(),
            r.textblob_sentiment.to_string(),
            r.vader_sentiment.to_string(),
            r.textblob_polarity.to_string(),
            r.vader_compound.to_string(),
            r.original_sentiment.map(|s| s.to_string()).unwrap_or_default(),
            py_bool(r.comparison_textblob).to_string(),
            py_bool(r.comparison_vader).to_string(),
        ])?;
    }
    writer.flush()
}

/// Sleeper that records requested waits and returns immediately.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

#[derive(Default)]
struct MemoryState {
    stored: BTreeMap<i64, Record>,
    connect_failures: VecDeque<BackendError>,
    connect_calls: usize,
    open_sessions: usize,
    closed_sessions: usize,
    reset_calls: usize,
    finalize_calls: usize,
    batch_sizes: Vec<usize>,
    reject_ids: HashSet<i64>,
    unreported_ids: HashSet<i64>,
    fail_batch: Option<(usize, BackendError)>,
    query_calls: usize,
    query_log: Vec<(QueryClass, usize)>,
    fail_query: Option<(usize, BackendError)>,
    latency: HashMap<QueryClass, Duration>,
    fail_close: bool,
}

/// In-memory store behaving like a unique-keyed collection, with knobs
/// for injecting faults. Clones share state, so a test can keep one handle
/// for assertions while the harness owns another.
#[derive(Clone)]
pub struct MemoryBackend {
    kind: BackendKind,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            state: Arc::new(Mutex::new(MemoryState::default())),
        }
    }

    pub fn document() -> Self {
        Self::new(BackendKind::Document)
    }

    pub fn relational() -> Self {
        Self::new(BackendKind::Relational)
    }

    /// The next `errors.len()` connect calls fail with these errors, in order.
    pub fn failing_connects(self, errors: impl IntoIterator<Item = BackendError>) -> Self {
        self.state.lock().unwrap().connect_failures.extend(errors);
        self
    }

    /// Records with these ids are rejected by every batch write.
    pub fn rejecting(self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.state.lock().unwrap().reject_ids.extend(ids);
        self
    }

    /// Records with these ids are silently dropped: neither inserted nor
    /// reported as errors.
    pub fn silently_dropping(self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.state.lock().unwrap().unreported_ids.extend(ids);
        self
    }

    /// The `batch`-th write call (1-based) fails as a whole.
    pub fn failing_batch(self, batch: usize, error: BackendError) -> Self {
        self.state.lock().unwrap().fail_batch = Some((batch, error));
        self
    }

    /// The `call`-th query execution (1-based, across all classes) fails.
    pub fn failing_query(self, call: usize, error: BackendError) -> Self {
        self.state.lock().unwrap().fail_query = Some((call, error));
        self
    }

    pub fn with_latency(self, class: QueryClass, latency: Duration) -> Self {
        self.state.lock().unwrap().latency.insert(class, latency);
        self
    }

    pub fn failing_close(self) -> Self {
        self.state.lock().unwrap().fail_close = true;
        self
    }

    pub fn connect_calls(&self) -> usize {
        self.state.lock().unwrap().connect_calls
    }

    pub fn open_sessions(&self) -> usize {
        self.state.lock().unwrap().open_sessions
    }

    pub fn closed_sessions(&self) -> usize {
        self.state.lock().unwrap().closed_sessions
    }

    pub fn reset_calls(&self) -> usize {
        self.state.lock().unwrap().reset_calls
    }

    pub fn finalize_calls(&self) -> usize {
        self.state.lock().unwrap().finalize_calls
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.state.lock().unwrap().batch_sizes.clone()
    }

    pub fn stored_ids(&self) -> Vec<i64> {
        self.state.lock().unwrap().stored.keys().copied().collect()
    }

    pub fn query_calls(&self) -> usize {
        self.state.lock().unwrap().query_calls
    }

    /// Executed queries as (class, number of rows returned), in call order.
    pub fn query_log(&self) -> Vec<(QueryClass, usize)> {
        self.state.lock().unwrap().query_log.clone()
    }
}

#[async_trait]
impl Connector for MemoryBackend {
    type Session = MemorySession;

    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn target(&self) -> String {
        format!("memory://{}", self.kind.display_name().to_lowercase())
    }

    async fn connect(&self) -> Result<MemorySession, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.connect_calls += 1;
        if let Some(err) = state.connect_failures.pop_front() {
            return Err(err);
        }
        state.open_sessions += 1;
        Ok(MemorySession {
            kind: self.kind,
            state: Arc::clone(&self.state),
        })
    }
}

pub struct MemorySession {
    kind: BackendKind,
    state: Arc<Mutex<MemoryState>>,
}

#[async_trait]
impl Session for MemorySession {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn reset(&mut self) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        state.reset_calls += 1;
        state.stored.clear();
        Ok(())
    }

    async fn insert_batch(&mut self, records: &[Record]) -> Result<BatchWrite, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.batch_sizes.push(records.len());
        let call = state.batch_sizes.len();
        if let Some((batch, err)) = &state.fail_batch {
            if *batch == call {
                return Err(err.clone());
            }
        }

        let mut write = BatchWrite::default();
        for (index, record) in records.iter().enumerate() {
            if state.unreported_ids.contains(&record.tweet_id) {
                continue;
            }
            let reason = if state.reject_ids.contains(&record.tweet_id) {
                Some("value rejected".to_string())
            } else if state.stored.contains_key(&record.tweet_id) {
                Some(format!("duplicate key: tweet_id {}", record.tweet_id))
            } else {
                None
            };
            match reason {
                Some(reason) => write.errors.push(RecordError {
                    index,
                    tweet_id: record.tweet_id,
                    reason,
                }),
                None => {
                    state.stored.insert(record.tweet_id, record.clone());
                    write.inserted += 1;
                }
            }
        }
        Ok(write)
    }

    async fn finalize(&mut self) -> Result<(), BackendError> {
        self.state.lock().unwrap().finalize_calls += 1;
        Ok(())
    }

    async fn execute(&mut self, class: QueryClass, params: &QueryParams) -> Result<u64, BackendError> {
        let (latency, rows) = {
            let mut state = self.state.lock().unwrap();
            state.query_calls += 1;
            let call = state.query_calls;
            if let Some((n, err)) = &state.fail_query {
                if *n == call {
                    return Err(err.clone());
                }
            }
            let limit = params.limit.max(0) as usize;
            let rows = match class {
                QueryClass::Simple => state
                    .stored
                    .values()
                    .filter(|r| r.target == params.target)
                    .take(limit)
                    .count(),
                QueryClass::TextSearch => state
                    .stored
                    .values()
                    .filter(|r| r.cleaned_text.contains(&params.search_term))
                    .take(limit)
                    .count(),
                QueryClass::Aggregation => state
                    .stored
                    .values()
                    .map(|r| r.target)
                    .collect::<HashSet<_>>()
                    .len(),
                QueryClass::Join => state.stored.len().min(limit),
            };
            state.query_log.push((class, rows));
            (state.latency.get(&class).copied(), rows)
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(rows as u64)
    }

    async fn count(&mut self) -> Result<u64, BackendError> {
        Ok(self.state.lock().unwrap().stored.len() as u64)
    }

    async fn close(self) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        state.open_sessions -= 1;
        state.closed_sessions += 1;
        if state.fail_close {
            return Err(BackendError::Network("connection reset on close".into()));
        }
        Ok(())
    }
}
