use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use shaorma::{
    BannerRecord, CategoryFilter, CategoryRecord, Dashboard, DashboardView, GeoPoint,
    NearbyVendor, Partition, RemoteSource, Resource, SubCategoryRecord, VendorKey, VendorRecord,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::prefs::{DEFAULT_USER_NAME, PreferenceStore, Profile};
use crate::store::{CacheStore, Snapshot};
use crate::sync::{self, LookupReport, SyncOutcome, SyncSettings};

type SharedSync = Shared<BoxFuture<'static, SyncOutcome>>;

/// The vendor sync currently running, if any.
#[derive(Default)]
struct InFlight {
    next_id: u64,
    current: Option<Flight>,
}

struct Flight {
    id: u64,
    force: bool,
    run: SharedSync,
}

/// Controller tying the cache, the preferences and the remote together.
///
/// Owns the derived dashboard: a background task re-derives it whenever the
/// vendor snapshot, the location, or the favorite keys change. Vendor sync
/// is single-flight; overlapping refresh calls share one run.
///
/// Must be created inside a tokio runtime. Every public method returns a
/// displayable value; failures are logged and absorbed.
pub struct Session {
    inner: Arc<Inner>,
    deriver: JoinHandle<()>,
}

struct Inner {
    store: Arc<CacheStore>,
    prefs: Arc<PreferenceStore>,
    remote: Arc<dyn RemoteSource>,
    settings: SyncSettings,
    location: watch::Sender<Option<GeoPoint>>,
    favorites: watch::Sender<BTreeSet<VendorKey>>,
    view: watch::Sender<Arc<DashboardView>>,
    loaded: watch::Sender<bool>,
    last_sync: Mutex<Resource<SyncOutcome>>,
    inflight: Mutex<InFlight>,
}

impl Session {
    pub fn new(
        store: Arc<CacheStore>,
        prefs: Arc<PreferenceStore>,
        remote: Arc<dyn RemoteSource>,
        settings: SyncSettings,
        nearest_limit: usize,
    ) -> Self {
        let favorite_keys = prefs.favorites().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not read favorites");
            BTreeSet::new()
        });

        let (location, locations) = watch::channel(None);
        let (favorites, favorite_rx) = watch::channel(favorite_keys.clone());
        let mut snapshots = store.observe_vendors();

        let initial: Snapshot<VendorRecord> = Arc::clone(&snapshots.borrow_and_update());
        let mut dashboard = Dashboard::new(nearest_limit);
        dashboard.on_favorites(favorite_keys);
        let view = dashboard.on_snapshot(initial.to_vec());

        let inner = Arc::new(Inner {
            store,
            prefs,
            remote,
            settings,
            location,
            favorites,
            view: watch::Sender::new(view),
            loaded: watch::Sender::new(!initial.is_empty()),
            last_sync: Mutex::new(Resource::Loading),
            inflight: Mutex::new(InFlight::default()),
        });

        let deriver = tokio::spawn(run_deriver(
            Arc::clone(&inner),
            dashboard,
            snapshots,
            locations,
            favorite_rx,
        ));

        Self { inner, deriver }
    }

    /// Create a session and kick off the initial, non-forced sync.
    pub fn start(
        store: Arc<CacheStore>,
        prefs: Arc<PreferenceStore>,
        remote: Arc<dyn RemoteSource>,
        settings: SyncSettings,
        nearest_limit: usize,
    ) -> Self {
        let session = Self::new(store, prefs, remote, settings, nearest_limit);
        session.trigger_refresh(false);
        session
    }

    /// Sync vendors and wait for the result. Joins a sync already running,
    /// unless this call is forced and the running one is not; then the forced
    /// run starts once the running one ends.
    pub async fn refresh(&self, force: bool) -> SyncOutcome {
        self.flight(force).await
    }

    /// Start (or join) a sync without waiting for it.
    pub fn trigger_refresh(&self, force: bool) {
        drop(self.flight(force));
    }

    fn flight(&self, force: bool) -> SharedSync {
        let mut slot = self
            .inner
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let previous = match slot.current.as_ref() {
            Some(running) if running.force || !force => {
                tracing::debug!("sync already running, joining it");
                return running.run.clone();
            }
            Some(running) => Some(running.run.clone()),
            None => None,
        };

        slot.next_id += 1;
        let id = slot.next_id;
        *self.inner.last_sync.lock().unwrap_or_else(PoisonError::into_inner) = Resource::Loading;

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            if let Some(previous) = previous {
                tracing::debug!("forced sync queued behind the running one");
                previous.await;
            }
            let outcome = inner.sync_vendors(force).await;
            inner.finish_flight(id);
            outcome
        });

        let run = async move {
            task.await
                .unwrap_or_else(|e| SyncOutcome::Failed(format!("sync task failed: {e}")))
        }
        .boxed()
        .shared();

        slot.current = Some(Flight {
            id,
            force,
            run: run.clone(),
        });
        run
    }

    /// Refresh categories, subcategories and banners.
    pub async fn refresh_lookups(&self) -> LookupReport {
        sync::refresh_lookups(&self.inner.store, self.inner.remote.as_ref(), &self.inner.settings)
            .await
    }

    /// Live dashboard; a new value is published after every re-derivation.
    pub fn views(&self) -> watch::Receiver<Arc<DashboardView>> {
        self.inner.view.subscribe()
    }

    pub fn view(&self) -> Arc<DashboardView> {
        Arc::clone(&self.inner.view.borrow())
    }

    /// Becomes true once cached vendors exist or a sync attempt has finished.
    pub fn loaded(&self) -> watch::Receiver<bool> {
        self.inner.loaded.subscribe()
    }

    pub fn is_data_loaded(&self) -> bool {
        *self.inner.loaded.borrow()
    }

    /// The dashboard, or `Loading` until the first sync attempt completes.
    pub fn status(&self) -> Resource<Arc<DashboardView>> {
        if self.is_data_loaded() {
            Resource::Ready(self.view())
        } else {
            Resource::Loading
        }
    }

    pub fn last_sync(&self) -> Resource<SyncOutcome> {
        self.inner
            .last_sync
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Feed a new location fix; the latest fix wins.
    pub fn update_location(&self, location: GeoPoint) {
        self.inner.location.send_replace(Some(location));
    }

    pub fn location(&self) -> Option<GeoPoint> {
        *self.inner.location.borrow()
    }

    /// Flip a vendor's favorite state and return the new state. On a write
    /// failure the state is left as it was.
    pub fn toggle_favorite(&self, key: &VendorKey) -> bool {
        match self.inner.prefs.toggle_favorite(key) {
            Ok(now) => {
                self.inner.favorites.send_modify(|keys| {
                    if now {
                        keys.insert(key.clone());
                    } else {
                        keys.remove(key);
                    }
                });
                now
            }
            Err(e) => {
                tracing::warn!(%key, error = %e, "could not update favorite");
                self.is_favorite(key)
            }
        }
    }

    pub fn is_favorite(&self, key: &VendorKey) -> bool {
        self.inner.favorites.borrow().contains(key)
    }

    pub fn favorite_keys(&self) -> BTreeSet<VendorKey> {
        self.inner.favorites.borrow().clone()
    }

    pub fn nearest(&self) -> Vec<NearbyVendor> {
        self.view().nearest.clone()
    }

    pub fn popular(&self) -> Vec<NearbyVendor> {
        self.view().popular.clone()
    }

    pub fn favorites(&self) -> Vec<NearbyVendor> {
        self.view().favorites.clone()
    }

    pub fn category(&self, filter: &CategoryFilter) -> Vec<NearbyVendor> {
        self.view().category(filter)
    }

    pub fn search(&self, query: &str) -> Vec<NearbyVendor> {
        self.view().search(query)
    }

    pub fn vendor(&self, key: &VendorKey) -> Option<NearbyVendor> {
        self.view().find(key).cloned()
    }

    pub fn categories(&self) -> Vec<CategoryRecord> {
        self.inner.store.categories().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not read categories");
            Vec::new()
        })
    }

    pub fn subcategories(&self, category_id: &str) -> Vec<SubCategoryRecord> {
        self.inner
            .store
            .subcategories_for(category_id)
            .unwrap_or_else(|e| {
                tracing::warn!(category_id, error = %e, "could not read subcategories");
                Vec::new()
            })
    }

    pub fn banners(&self) -> Vec<BannerRecord> {
        self.inner.store.banners().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not read banners");
            Vec::new()
        })
    }

    pub fn has_cached_data(&self) -> bool {
        self.inner.store.has_cached_data(Partition::Vendors)
    }

    /// Drop cached vendors so the next sync refetches. Favorites and the
    /// profile are untouched.
    pub fn clear_cache(&self) -> bool {
        match self.inner.store.clear_vendors() {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "could not clear vendor cache");
                false
            }
        }
    }

    pub fn profile(&self) -> Profile {
        self.inner.prefs.profile().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not read profile");
            Profile {
                name: DEFAULT_USER_NAME.to_owned(),
                image_path: None,
            }
        })
    }

    pub fn set_user_name(&self, name: &str) -> bool {
        match self.inner.prefs.set_user_name(name) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "could not save user name");
                false
            }
        }
    }

    pub fn import_profile_image(&self, source: &Path, data_dir: &Path) -> Option<PathBuf> {
        match self.inner.prefs.import_profile_image(source, data_dir) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(error = %e, "could not import profile image");
                None
            }
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.inner.store
    }

    pub fn prefs(&self) -> &PreferenceStore {
        &self.inner.prefs
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.deriver.abort();
    }
}

impl Inner {
    /// Clear the in-flight slot, unless a newer run has already taken it.
    fn finish_flight(&self, id: u64) {
        let mut slot = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.current.as_ref().is_some_and(|f| f.id == id) {
            slot.current = None;
        }
    }

    async fn sync_vendors(&self, force: bool) -> SyncOutcome {
        let outcome =
            sync::refresh_vendors(&self.store, self.remote.as_ref(), &self.settings, force).await;

        if outcome.is_success() {
            tracing::info!(%outcome, "vendor sync finished");
        } else {
            tracing::warn!(%outcome, "vendor sync finished");
        }

        *self.last_sync.lock().unwrap_or_else(PoisonError::into_inner) =
            outcome.clone().into_resource();
        self.loaded.send_replace(true);
        outcome
    }
}

async fn run_deriver(
    inner: Arc<Inner>,
    mut dashboard: Dashboard,
    mut snapshots: watch::Receiver<Snapshot<VendorRecord>>,
    mut locations: watch::Receiver<Option<GeoPoint>>,
    mut favorites: watch::Receiver<BTreeSet<VendorKey>>,
) {
    loop {
        let view = tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = Arc::clone(&snapshots.borrow_and_update());
                if !snapshot.is_empty() {
                    inner.loaded.send_replace(true);
                }
                dashboard.on_snapshot(snapshot.to_vec())
            }
            changed = locations.changed() => {
                if changed.is_err() {
                    break;
                }
                let location = *locations.borrow_and_update();
                let Some(location) = location else {
                    continue;
                };
                dashboard.on_location(location)
            }
            changed = favorites.changed() => {
                if changed.is_err() {
                    break;
                }
                let keys = favorites.borrow_and_update().clone();
                dashboard.on_favorites(keys)
            }
        };

        inner.view.send_replace(view);
    }
}
