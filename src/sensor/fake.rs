use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::sensor::types::{QueryError, SourceDescriptor};
use crate::sensor::ValueSource;

#[derive(Clone)]
pub struct FakeEntry {
    response: Result<f64, QueryError>,
    delay: Option<Duration>,
}

impl FakeEntry {
    pub fn immediate(response: Result<f64, QueryError>) -> Self {
        Self { response, delay: None }
    }

    pub fn with_delay(response: Result<f64, QueryError>, delay: Duration) -> Self {
        Self { response, delay: Some(delay) }
    }
}

/// Scripted ValueSource used in tests. Each source id replays its queued entries in order;
/// the last entry repeats once the queue is down to one. Unknown ids are unreachable.
#[derive(Default)]
pub struct FakeValueSource {
    scripts: Mutex<HashMap<String, VecDeque<FakeEntry>>>,
    calls: AtomicUsize,
}

impl FakeValueSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(self, id: &str, entry: FakeEntry) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .push_back(entry);
        self
    }

    pub fn with_value(self, id: &str, value: f64) -> Self {
        self.push(id, FakeEntry::immediate(Ok(value)))
    }

    pub fn with_error(self, id: &str, err: QueryError) -> Self {
        self.push(id, FakeEntry::immediate(Err(err)))
    }

    pub fn with_delayed_value(self, id: &str, value: f64, delay: Duration) -> Self {
        self.push(id, FakeEntry::with_delay(Ok(value), delay))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_entry(&self, id: &str) -> Option<FakeEntry> {
        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts.get_mut(id)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl ValueSource for FakeValueSource {
    async fn query(&self, source: &SourceDescriptor) -> Result<f64, QueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let entry = self
            .next_entry(&source.id)
            .ok_or_else(|| QueryError::Unreachable(format!("no script for {}", source.id)))?;

        if let Some(delay) = entry.delay {
            tokio::time::sleep(delay).await;
        }
        entry.response
    }
}
