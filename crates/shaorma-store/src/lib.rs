pub mod prefs;
pub mod schema;
pub mod session;
pub mod store;
pub mod sync;

pub use prefs::{DEFAULT_USER_NAME, PROFILE_IMAGE_FILE, PreferenceStore, Profile};
pub use session::Session;
pub use store::{CacheStore, Snapshot, StoreError};
pub use sync::{
    LookupReport, RejectReason, Rejection, SyncOutcome, SyncReport, SyncSettings,
    normalize_vendors, refresh_lookups, refresh_vendors,
};
