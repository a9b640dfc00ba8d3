use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

/// Remote collection holding vendor records.
pub const VENDORS_PATH: &str = "Stores";
/// Remote collection holding categories.
pub const CATEGORIES_PATH: &str = "Category";
/// Remote collection holding subcategories.
pub const SUBCATEGORIES_PATH: &str = "SubCategory";
/// Remote collection holding dashboard banners.
pub const BANNERS_PATH: &str = "Banners";

/// Bounded wait for the vendor collection.
pub const VENDOR_FETCH_TIMEOUT: Duration = Duration::from_millis(15_000);
/// Bounded wait for the smaller lookup collections.
pub const LOOKUP_FETCH_TIMEOUT: Duration = Duration::from_millis(10_000);

/// One child node of a remote collection, still loosely typed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChild {
    /// Key assigned by the remote database, if any.
    pub key: Option<String>,
    pub value: Value,
}

impl RawChild {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: Some(key.into()),
            value,
        }
    }

    pub fn unkeyed(value: Value) -> Self {
        Self { key: None, value }
    }

    /// The remote key, treating an empty string as absent.
    pub fn remote_key(&self) -> Option<&str> {
        self.key.as_deref().filter(|k| !k.is_empty())
    }
}

/// Errors a remote source can report. They never escape [`fetch_all`].
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Read-only access to a hierarchical key-value database.
#[async_trait::async_trait]
pub trait RemoteSource: Send + Sync {
    /// Human-readable label identifying this source.
    fn label(&self) -> &str;

    /// One-shot read of every child under a top-level collection.
    async fn read(&self, path: &str) -> Result<Vec<RawChild>, RemoteError>;
}

#[async_trait::async_trait]
impl<T: RemoteSource + ?Sized> RemoteSource for Arc<T> {
    fn label(&self) -> &str {
        (**self).label()
    }

    async fn read(&self, path: &str) -> Result<Vec<RawChild>, RemoteError> {
        (**self).read(path).await
    }
}

/// Result of a bounded remote read.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The collection had at least one child.
    Payload(Vec<RawChild>),
    /// The wait exceeded the timeout; a late answer is discarded.
    Timeout,
    /// The collection exists but is empty (or absent).
    Empty,
    /// The read failed before producing a payload.
    Failed(String),
}

/// Read a collection, never waiting longer than `timeout` and never
/// returning an error.
pub async fn fetch_all(source: &dyn RemoteSource, path: &str, timeout: Duration) -> FetchOutcome {
    match tokio::time::timeout(timeout, source.read(path)).await {
        Err(_) => {
            tracing::warn!(
                source = source.label(),
                path,
                timeout_ms = timeout.as_millis() as u64,
                "remote read timed out"
            );
            FetchOutcome::Timeout
        }
        Ok(Err(e)) => {
            tracing::warn!(source = source.label(), path, error = %e, "remote read failed");
            FetchOutcome::Failed(e.to_string())
        }
        Ok(Ok(children)) if children.is_empty() => {
            tracing::warn!(source = source.label(), path, "remote returned no children");
            FetchOutcome::Empty
        }
        Ok(Ok(children)) => FetchOutcome::Payload(children),
    }
}
