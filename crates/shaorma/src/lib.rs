pub mod dashboard;
pub mod geo;
pub mod metadata;
pub mod normalize;
pub mod resource;
pub mod source;
pub mod vendor;
pub mod views;

pub use dashboard::{DEFAULT_NEAREST_LIMIT, Dashboard, DashboardView};
pub use geo::GeoPoint;
pub use metadata::{CacheMetadata, DEFAULT_CACHE_VALIDITY, Partition, now_millis};
pub use normalize::{normalize_banner, normalize_category, normalize_subcategory, normalize_vendor};
pub use resource::Resource;
pub use source::{FetchOutcome, RawChild, RemoteError, RemoteSource, fetch_all};
pub use vendor::{
    BannerRecord, CategoryRecord, InvalidVendor, SubCategoryRecord, VendorKey, VendorRecord,
};
pub use views::{CategoryFilter, NearbyVendor};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
