use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::{RawChild, RemoteError, RemoteSource};

/// In-memory remote database for testing.
///
/// Collections can be replaced between reads; reads can be slowed down or
/// forced to fail, and every read is counted.
pub struct InMemoryRemote {
    label: String,
    collections: Mutex<HashMap<String, Vec<RawChild>>>,
    delay: Option<Duration>,
    fail: bool,
    reads: AtomicUsize,
}

impl InMemoryRemote {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            collections: Mutex::new(HashMap::new()),
            delay: None,
            fail: false,
            reads: AtomicUsize::new(0),
        }
    }

    pub fn with_collection(self, path: &str, children: Vec<RawChild>) -> Self {
        self.replace_collection(path, children);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn replace_collection(&self, path: &str, children: Vec<RawChild>) {
        self.collections
            .lock()
            .unwrap()
            .insert(path.to_owned(), children);
    }

    /// Number of `read` calls made so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RemoteSource for InMemoryRemote {
    fn label(&self) -> &str {
        &self.label
    }

    async fn read(&self, path: &str) -> Result<Vec<RawChild>, RemoteError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail {
            return Err(RemoteError::Network("connection refused".into()));
        }

        Ok(self
            .collections
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_default())
    }
}
