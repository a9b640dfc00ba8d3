//! Remote → cache synchronization.
//!
//! Every failure is absorbed here and reported as a [`SyncOutcome`]; a bad
//! refresh never overwrites good cached data.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use shaorma::source::{
    BANNERS_PATH, CATEGORIES_PATH, LOOKUP_FETCH_TIMEOUT, SUBCATEGORIES_PATH, VENDOR_FETCH_TIMEOUT,
    VENDORS_PATH,
};
use shaorma::{
    CacheMetadata, DEFAULT_CACHE_VALIDITY, FetchOutcome, InvalidVendor, Partition, RawChild,
    RemoteSource, Resource, VendorKey, VendorRecord, fetch_all, normalize_banner,
    normalize_category, normalize_subcategory, normalize_vendor, now_millis,
};

use crate::store::{CacheStore, StoreError};

/// Where and how long to read, and how long a sync stays fresh.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    pub vendors_path: String,
    pub categories_path: String,
    pub subcategories_path: String,
    pub banners_path: String,
    pub vendor_timeout: Duration,
    pub lookup_timeout: Duration,
    pub cache_validity: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            vendors_path: VENDORS_PATH.to_owned(),
            categories_path: CATEGORIES_PATH.to_owned(),
            subcategories_path: SUBCATEGORIES_PATH.to_owned(),
            banners_path: BANNERS_PATH.to_owned(),
            vendor_timeout: VENDOR_FETCH_TIMEOUT,
            lookup_timeout: LOOKUP_FETCH_TIMEOUT,
            cache_validity: DEFAULT_CACHE_VALIDITY,
        }
    }
}

/// Why a remote vendor child was left out of the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The child was not a key-value map.
    Malformed,
    Invalid(InvalidVendor),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "not a key-value record"),
            Self::Invalid(reason) => write!(f, "{reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub key: String,
    pub reason: RejectReason,
}

/// Tally of one vendor batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub stored: u32,
    pub invalid: u32,
    pub malformed: u32,
    pub rejections: Vec<Rejection>,
}

/// What a vendor refresh ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Cache still valid; nothing fetched.
    Fresh,
    TimedOut,
    /// Remote collection had no children.
    Empty,
    /// Remote read failed.
    Failed(String),
    /// Every child was rejected; cached data left untouched.
    NothingValid(SyncReport),
    /// The write failed; metadata not advanced.
    StorageFailed(String),
    Committed(SyncReport),
}

impl SyncOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }

    /// True when the cache is as current as this attempt could make it.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Fresh | Self::Committed(_))
    }

    /// Success keeps the outcome; anything else collapses to its message.
    pub fn into_resource(self) -> Resource<SyncOutcome> {
        if self.is_success() {
            Resource::Ready(self)
        } else {
            Resource::Failed(self.to_string())
        }
    }

    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            Self::NothingValid(report) | Self::Committed(report) => Some(report),
            _ => None,
        }
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fresh => write!(f, "cache is fresh, sync skipped"),
            Self::TimedOut => write!(f, "remote timed out, using cached data"),
            Self::Empty => write!(f, "remote returned no vendors, keeping cached data"),
            Self::Failed(e) => write!(f, "remote read failed ({e}), using cached data"),
            Self::NothingValid(r) => write!(
                f,
                "no valid vendors ({} invalid, {} malformed), keeping cached data",
                r.invalid, r.malformed
            ),
            Self::StorageFailed(e) => write!(f, "could not write cache: {e}"),
            Self::Committed(r) => write!(
                f,
                "synced {} vendors ({} invalid, {} malformed)",
                r.stored, r.invalid, r.malformed
            ),
        }
    }
}

/// Shape and validate a batch of remote vendor children.
///
/// Later children with the same key replace earlier ones, keeping the
/// position of the first occurrence.
pub fn normalize_vendors(children: &[RawChild]) -> (Vec<VendorRecord>, SyncReport) {
    let mut vendors: Vec<VendorRecord> = Vec::with_capacity(children.len());
    let mut positions: HashMap<VendorKey, usize> = HashMap::new();
    let mut report = SyncReport::default();

    for (index, child) in children.iter().enumerate() {
        let label = child
            .remote_key()
            .map(str::to_owned)
            .unwrap_or_else(|| format!("#{index}"));

        let Some(vendor) = normalize_vendor(child) else {
            tracing::warn!(key = %label, "skipping malformed vendor");
            report.malformed += 1;
            report.rejections.push(Rejection {
                key: label,
                reason: RejectReason::Malformed,
            });
            continue;
        };

        if let Err(reason) = vendor.validate() {
            tracing::warn!(key = %label, name = %vendor.name, %reason, "skipping invalid vendor");
            report.invalid += 1;
            report.rejections.push(Rejection {
                key: label,
                reason: RejectReason::Invalid(reason),
            });
            continue;
        }

        match positions.get(&vendor.key) {
            Some(&at) => vendors[at] = vendor,
            None => {
                positions.insert(vendor.key.clone(), vendors.len());
                vendors.push(vendor);
            }
        }
    }

    report.stored = u32::try_from(vendors.len()).unwrap_or(u32::MAX);
    (vendors, report)
}

/// Refresh the vendor cache unless it is still fresh.
///
/// Database reads and writes run on the blocking pool.
pub async fn refresh_vendors(
    store: &Arc<CacheStore>,
    remote: &dyn RemoteSource,
    settings: &SyncSettings,
    force: bool,
) -> SyncOutcome {
    let key = Partition::Vendors.cache_key();

    if !force && cache_is_valid(store, key).await {
        tracing::info!("using cached vendors");
        return SyncOutcome::Fresh;
    }

    tracing::info!(source = remote.label(), force, "starting vendor sync");

    let children =
        match fetch_all(remote, &settings.vendors_path, settings.vendor_timeout).await {
            FetchOutcome::Payload(children) => children,
            FetchOutcome::Timeout => return SyncOutcome::TimedOut,
            FetchOutcome::Empty => return SyncOutcome::Empty,
            FetchOutcome::Failed(e) => return SyncOutcome::Failed(e),
        };

    let (vendors, report) = normalize_vendors(&children);

    tracing::info!(
        valid = report.stored,
        invalid = report.invalid,
        malformed = report.malformed,
        "vendor batch normalized"
    );

    if vendors.is_empty() {
        return SyncOutcome::NothingValid(report);
    }

    let metadata = CacheMetadata::new(key, now_millis(), settings.cache_validity, report.stored);

    let writer = Arc::clone(store);
    let written =
        tokio::task::spawn_blocking(move || writer.commit_vendor_sync(&vendors, &metadata))
            .await
            .unwrap_or_else(|e| Err(StoreError::Task(e.to_string())));

    match written {
        Ok(()) => {
            tracing::info!(count = report.stored, "vendor cache updated");
            SyncOutcome::Committed(report)
        }
        Err(e) => {
            tracing::error!(error = %e, "could not write vendor cache");
            SyncOutcome::StorageFailed(e.to_string())
        }
    }
}

async fn cache_is_valid(store: &Arc<CacheStore>, key: &'static str) -> bool {
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || store.is_cache_valid(key))
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "freshness check failed");
            false
        })
}

/// Rows written per lookup collection by [`refresh_lookups`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupReport {
    pub categories: usize,
    pub subcategories: usize,
    pub banners: usize,
}

/// Refresh categories, subcategories and banners concurrently.
///
/// Each collection is written only when its fetch yields at least one
/// record; failures leave that collection as it was.
pub async fn refresh_lookups(
    store: &Arc<CacheStore>,
    remote: &dyn RemoteSource,
    settings: &SyncSettings,
) -> LookupReport {
    let timeout = settings.lookup_timeout;

    let (categories, subcategories, banners) = tokio::join!(
        fetch_all(remote, &settings.categories_path, timeout),
        fetch_all(remote, &settings.subcategories_path, timeout),
        fetch_all(remote, &settings.banners_path, timeout),
    );

    let store = Arc::clone(store);
    let validity = settings.cache_validity;

    tokio::task::spawn_blocking(move || {
        let store = store.as_ref();
        LookupReport {
            categories: store_lookup(store, Partition::Categories, categories, validity, |rows| {
                let parsed: Vec<_> = rows.iter().filter_map(normalize_category).collect();
                store.upsert_categories(&parsed).map(|()| parsed.len())
            }),
            subcategories: store_lookup(
                store,
                Partition::SubCategories,
                subcategories,
                validity,
                |rows| {
                    let parsed: Vec<_> = rows.iter().filter_map(normalize_subcategory).collect();
                    store.upsert_subcategories(&parsed).map(|()| parsed.len())
                },
            ),
            banners: store_lookup(store, Partition::Banners, banners, validity, |rows| {
                let parsed: Vec<_> = rows.iter().filter_map(normalize_banner).collect();
                store.upsert_banners(&parsed).map(|()| parsed.len())
            }),
        }
    })
    .await
    .unwrap_or_else(|e| {
        tracing::error!(error = %e, "lookup write task failed");
        LookupReport::default()
    })
}

fn store_lookup(
    store: &CacheStore,
    partition: Partition,
    outcome: FetchOutcome,
    validity: Duration,
    write: impl FnOnce(&[RawChild]) -> Result<usize, StoreError>,
) -> usize {
    let FetchOutcome::Payload(children) = outcome else {
        return 0;
    };

    if children.iter().all(|c| !c.value.is_object()) {
        tracing::warn!(%partition, "no usable records in lookup payload");
        return 0;
    }

    match write(&children) {
        Ok(written) => {
            let count = u32::try_from(written).unwrap_or(u32::MAX);
            let metadata =
                CacheMetadata::new(partition.cache_key(), now_millis(), validity, count);
            if let Err(e) = store.save_metadata(&metadata) {
                tracing::warn!(%partition, error = %e, "could not record lookup sync");
            }
            tracing::info!(%partition, count = written, "lookup cache updated");
            written
        }
        Err(e) => {
            tracing::error!(%partition, error = %e, "could not write lookup cache");
            0
        }
    }
}
