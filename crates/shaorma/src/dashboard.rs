use std::collections::BTreeSet;
use std::sync::Arc;

use crate::geo::GeoPoint;
use crate::vendor::{VendorKey, VendorRecord};
use crate::views::{self, CategoryFilter, NearbyVendor};

/// Size of the compact "nearest" list on the dashboard.
pub const DEFAULT_NEAREST_LIMIT: usize = 5;

/// Every projection derived from one set of inputs.
///
/// Views are never persisted; they are rebuilt whenever the snapshot, the
/// location, or the favorite keys change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardView {
    pub location: Option<GeoPoint>,
    /// Every cached vendor, nearest first.
    pub all: Vec<NearbyVendor>,
    pub nearest: Vec<NearbyVendor>,
    pub popular: Vec<NearbyVendor>,
    pub favorites: Vec<NearbyVendor>,
    pub favorite_keys: BTreeSet<VendorKey>,
}

impl DashboardView {
    pub fn derive(
        records: &[VendorRecord],
        location: Option<GeoPoint>,
        favorite_keys: &BTreeSet<VendorKey>,
        nearest_limit: usize,
    ) -> Self {
        let mut all = views::annotate(records, location);
        views::sort_by_distance(&mut all);

        Self {
            location,
            nearest: views::nearest(&all, nearest_limit),
            popular: views::popular(&all),
            favorites: views::favorites(&all, favorite_keys),
            favorite_keys: favorite_keys.clone(),
            all,
        }
    }

    pub fn category(&self, filter: &CategoryFilter) -> Vec<NearbyVendor> {
        views::by_category(&self.all, filter)
    }

    /// Searches every vendor, ignoring any category or tag selection.
    pub fn search(&self, query: &str) -> Vec<NearbyVendor> {
        views::search(&self.all, query)
    }

    pub fn is_favorite(&self, key: &VendorKey) -> bool {
        self.favorite_keys.contains(key)
    }

    pub fn find(&self, key: &VendorKey) -> Option<&NearbyVendor> {
        self.all.iter().find(|n| &n.vendor.key == key)
    }
}

/// Single-owner state container behind the dashboard.
///
/// Accepts three input events and funnels all of them through
/// [`DashboardView::derive`], so the published view always reflects the
/// latest inputs of each kind.
#[derive(Debug)]
pub struct Dashboard {
    records: Vec<VendorRecord>,
    location: Option<GeoPoint>,
    favorites: BTreeSet<VendorKey>,
    nearest_limit: usize,
    view: Arc<DashboardView>,
}

impl Dashboard {
    pub fn new(nearest_limit: usize) -> Self {
        Self {
            records: Vec::new(),
            location: None,
            favorites: BTreeSet::new(),
            nearest_limit,
            view: Arc::new(DashboardView::default()),
        }
    }

    /// A new committed store snapshot replaces the record set wholesale.
    pub fn on_snapshot(&mut self, records: Vec<VendorRecord>) -> Arc<DashboardView> {
        self.records = records;
        self.rederive()
    }

    pub fn on_location(&mut self, location: GeoPoint) -> Arc<DashboardView> {
        self.location = Some(location);
        self.rederive()
    }

    pub fn on_favorites(&mut self, favorites: BTreeSet<VendorKey>) -> Arc<DashboardView> {
        self.favorites = favorites;
        self.rederive()
    }

    pub fn view(&self) -> Arc<DashboardView> {
        Arc::clone(&self.view)
    }

    pub fn records(&self) -> &[VendorRecord] {
        &self.records
    }

    fn rederive(&mut self) -> Arc<DashboardView> {
        self.view = Arc::new(DashboardView::derive(
            &self.records,
            self.location,
            &self.favorites,
            self.nearest_limit,
        ));
        tracing::debug!(
            vendors = self.records.len(),
            located = self.location.is_some(),
            favorites = self.view.favorites.len(),
            "dashboard rederived"
        );
        self.view()
    }
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new(DEFAULT_NEAREST_LIMIT)
    }
}
