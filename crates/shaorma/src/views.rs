use std::collections::BTreeSet;

use serde::Serialize;

use crate::geo::GeoPoint;
use crate::vendor::{VendorKey, VendorRecord};

/// A vendor paired with its distance from the current user location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyVendor {
    pub vendor: VendorRecord,
    /// Meters from the user; `None` until a location fix is known.
    pub distance_m: Option<f64>,
}

impl NearbyVendor {
    /// Unknown distances sort as +infinity.
    fn sort_key(&self) -> f64 {
        self.distance_m.unwrap_or(f64::INFINITY)
    }
}

/// Selection for a per-category view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryFilter {
    pub category_id: String,
    /// Subcategory or tag name; matched against activity and tags.
    pub tag: Option<String>,
}

impl CategoryFilter {
    pub fn new(category_id: impl Into<String>) -> Self {
        Self {
            category_id: category_id.into(),
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn matches(&self, vendor: &VendorRecord) -> bool {
        vendor.in_category(&self.category_id)
            && self
                .tag
                .as_deref()
                .filter(|t| !t.is_empty())
                .is_none_or(|t| vendor.matches_tag(t))
    }
}

/// Pair every record with its distance from `location`.
pub fn annotate(records: &[VendorRecord], location: Option<GeoPoint>) -> Vec<NearbyVendor> {
    records
        .iter()
        .map(|vendor| {
            let position = GeoPoint::new(vendor.latitude, vendor.longitude);
            NearbyVendor {
                distance_m: location.map(|here| here.distance_to(&position)),
                vendor: vendor.clone(),
            }
        })
        .collect()
}

/// Stable ascending sort; unknown distances go last.
pub fn sort_by_distance(list: &mut [NearbyVendor]) {
    list.sort_by(|a, b| a.sort_key().total_cmp(&b.sort_key()));
}

fn sorted(mut list: Vec<NearbyVendor>) -> Vec<NearbyVendor> {
    sort_by_distance(&mut list);
    list
}

pub fn nearest(all: &[NearbyVendor], limit: usize) -> Vec<NearbyVendor> {
    sorted(all.to_vec()).into_iter().take(limit).collect()
}

/// Popular vendors, in the order of the global distance sort.
pub fn popular(all: &[NearbyVendor]) -> Vec<NearbyVendor> {
    sorted(all.iter().filter(|n| n.vendor.is_popular).cloned().collect())
}

pub fn by_category(all: &[NearbyVendor], filter: &CategoryFilter) -> Vec<NearbyVendor> {
    sorted(all.iter().filter(|n| filter.matches(&n.vendor)).cloned().collect())
}

/// Vendors whose key is in `keys`. Keys with no matching vendor are ignored.
pub fn favorites(all: &[NearbyVendor], keys: &BTreeSet<VendorKey>) -> Vec<NearbyVendor> {
    sorted(
        all.iter()
            .filter(|n| keys.contains(&n.vendor.key))
            .cloned()
            .collect(),
    )
}

/// Free-text search over the whole set. An empty query matches nothing.
pub fn search(all: &[NearbyVendor], query: &str) -> Vec<NearbyVendor> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    sorted(
        all.iter()
            .filter(|n| n.vendor.matches_query(&needle))
            .cloned()
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vendor(key: &str, lat: f64, lon: f64) -> VendorRecord {
        VendorRecord {
            key: VendorKey::new(key),
            id: 0,
            name: format!("Vendor {key}"),
            category_ids: vec!["1".to_owned()],
            subcategory_ids: vec![],
            latitude: lat,
            longitude: lon,
            address: format!("Strada {key}"),
            short_address: String::new(),
            phone: String::new(),
            hours: String::new(),
            activity: String::new(),
            image_path: String::new(),
            is_popular: false,
            tags: vec![],
        }
    }

    fn keys(list: &[NearbyVendor]) -> Vec<&str> {
        list.iter().map(|n| n.vendor.key.as_str()).collect()
    }

    fn here() -> GeoPoint {
        GeoPoint::new(44.4268, 26.1025)
    }

    fn sample() -> Vec<VendorRecord> {
        vec![
            vendor("far", 44.50, 26.20),
            vendor("near", 44.427, 26.103),
            vendor("mid", 44.44, 26.11),
        ]
    }

    #[test]
    fn annotate_without_location_leaves_distance_unknown() {
        let all = annotate(&sample(), None);
        assert!(all.iter().all(|n| n.distance_m.is_none()));
    }

    #[test]
    fn sort_orders_by_distance() {
        let mut all = annotate(&sample(), Some(here()));
        sort_by_distance(&mut all);
        assert_eq!(keys(&all), vec!["near", "mid", "far"]);
    }

    #[test]
    fn unknown_distances_sort_last() {
        let mut all = annotate(&sample(), Some(here()));
        all[1].distance_m = None;
        sort_by_distance(&mut all);
        assert_eq!(keys(&all), vec!["mid", "far", "near"]);
    }

    #[test]
    fn nearest_is_prefix_of_full_sort() {
        let all = annotate(&sample(), Some(here()));
        let full = nearest(&all, usize::MAX);
        let top = nearest(&all, 2);
        assert_eq!(top.as_slice(), &full[..2]);
    }

    #[test]
    fn popular_keeps_distance_order() {
        let mut records = sample();
        records[0].is_popular = true;
        records[1].is_popular = true;

        let all = annotate(&records, Some(here()));
        assert_eq!(keys(&popular(&all)), vec!["near", "far"]);
    }

    #[test]
    fn category_filter_checks_membership() {
        let mut records = sample();
        records[0].category_ids = vec!["2".to_owned(), "3".to_owned()];
        records[2].category_ids = vec!["3".to_owned()];

        let all = annotate(&records, Some(here()));
        assert_eq!(keys(&by_category(&all, &CategoryFilter::new("3"))), vec!["mid", "far"]);
        assert_eq!(keys(&by_category(&all, &CategoryFilter::new("1"))), vec!["near"]);
        assert!(by_category(&all, &CategoryFilter::new("9")).is_empty());
    }

    #[test]
    fn category_id_is_not_substring_matched() {
        let mut records = sample();
        records[0].category_ids = vec!["12".to_owned()];
        let all = annotate(&records, None);
        assert!(!keys(&by_category(&all, &CategoryFilter::new("2"))).contains(&"far"));
    }

    #[test]
    fn category_tag_matches_activity_or_tags() {
        let mut records = sample();
        records[0].activity = "Burger".to_owned();
        records[1].tags = vec!["burger".to_owned()];

        let all = annotate(&records, Some(here()));
        let filter = CategoryFilter::new("1").with_tag("BURGER");
        assert_eq!(keys(&by_category(&all, &filter)), vec!["near", "far"]);
    }

    #[test]
    fn empty_tag_means_no_tag_filter() {
        let all = annotate(&sample(), None);
        let filter = CategoryFilter::new("1").with_tag("");
        assert_eq!(by_category(&all, &filter).len(), 3);
    }

    #[test]
    fn favorites_ignore_missing_keys() {
        let all = annotate(&sample(), Some(here()));
        let keys_set = BTreeSet::from([VendorKey::new("far"), VendorKey::new("gone")]);
        assert_eq!(keys(&favorites(&all, &keys_set)), vec!["far"]);
    }

    #[test]
    fn search_matches_name_address_and_tags() {
        let mut records = sample();
        records[2].tags = vec!["Falafel".to_owned()];
        let all = annotate(&records, Some(here()));

        assert_eq!(keys(&search(&all, "VENDOR")), vec!["near", "mid", "far"]);
        assert_eq!(keys(&search(&all, "strada far")), vec!["far"]);
        assert_eq!(keys(&search(&all, "lafe")), vec!["mid"]);
    }

    #[test]
    fn empty_search_returns_nothing() {
        let all = annotate(&sample(), None);
        assert!(search(&all, "").is_empty());
        assert!(search(&all, "   ").is_empty());
    }
}
