use std::fmt;
use std::time::Duration;

/// How long a successful vendor sync keeps the cache fresh.
pub const DEFAULT_CACHE_VALIDITY: Duration = Duration::from_secs(6 * 60 * 60);

/// Logical grouping of cached rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Vendors,
    Categories,
    SubCategories,
    Banners,
}

impl Partition {
    /// Key under which the partition's metadata row is stored.
    pub fn cache_key(&self) -> &'static str {
        match self {
            Self::Vendors => "stores",
            Self::Categories => "categories",
            Self::SubCategories => "subcategories",
            Self::Banners => "banners",
        }
    }

    pub fn all() -> [Partition; 4] {
        [
            Self::Vendors,
            Self::Categories,
            Self::SubCategories,
            Self::Banners,
        ]
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cache_key())
    }
}

/// Bookkeeping row written after every committed sync of a partition.
///
/// Timestamps are milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheMetadata {
    pub key: String,
    pub synced_at: i64,
    pub expires_at: i64,
    pub item_count: u32,
}

impl CacheMetadata {
    /// Build a row whose expiry is always `synced_at + validity`.
    pub fn new(
        key: impl Into<String>,
        synced_at: i64,
        validity: Duration,
        item_count: u32,
    ) -> Self {
        let window = i64::try_from(validity.as_millis()).unwrap_or(i64::MAX);
        Self {
            key: key.into(),
            synced_at,
            expires_at: synced_at.saturating_add(window),
            item_count,
        }
    }

    /// True iff `now` is strictly before the expiry instant.
    pub fn is_valid_at(&self, now: i64) -> bool {
        now < self.expires_at
    }

    /// Whole minutes left before expiry, zero once expired.
    pub fn remaining_minutes(&self, now: i64) -> i64 {
        (self.expires_at - now).max(0) / 60_000
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    let elapsed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    i64::try_from(elapsed).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_timestamp_plus_window() {
        let meta = CacheMetadata::new("stores", 1_000, DEFAULT_CACHE_VALIDITY, 3);
        assert_eq!(meta.expires_at, 1_000 + 6 * 60 * 60 * 1000);
    }

    #[test]
    fn validity_flips_exactly_at_expiry() {
        let meta = CacheMetadata::new("stores", 0, Duration::from_millis(500), 1);
        assert!(meta.is_valid_at(0));
        assert!(meta.is_valid_at(499));
        assert!(!meta.is_valid_at(500));
        assert!(!meta.is_valid_at(10_000));
    }

    #[test]
    fn remaining_minutes_never_negative() {
        let meta = CacheMetadata::new("stores", 0, Duration::from_secs(600), 1);
        assert_eq!(meta.remaining_minutes(0), 10);
        assert_eq!(meta.remaining_minutes(1_000_000), 0);
    }

    #[test]
    fn vendor_partition_uses_stores_key() {
        assert_eq!(Partition::Vendors.cache_key(), "stores");
        assert_eq!(Partition::Vendors.to_string(), "stores");
    }
}
