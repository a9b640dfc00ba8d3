use std::fmt;

use serde::Serialize;

/// Stable identity of a vendor.
/// Normally the key the remote database assigned to the record; when that is
/// missing it is synthesized from the first category and the numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct VendorKey(String);

impl VendorKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Deterministic fallback key: `{category}_{id}`, with `unknown` standing
    /// in for a record that has no category at all.
    pub fn synthesize(category: Option<&str>, id: i32) -> Self {
        Self(format!("{}_{id}", category.unwrap_or("unknown")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VendorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VendorKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// A storefront as cached on the device.
///
/// Distance to the user is deliberately absent: it is viewer-relative and
/// lives on [`crate::NearbyVendor`] instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorRecord {
    pub key: VendorKey,
    pub id: i32,
    pub name: String,
    pub category_ids: Vec<String>,
    pub subcategory_ids: Vec<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub short_address: String,
    pub phone: String,
    pub hours: String,
    pub activity: String,
    pub image_path: String,
    pub is_popular: bool,
    pub tags: Vec<String>,
}

/// Why a vendor record was rejected before reaching the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidVendor {
    #[error("missing name")]
    MissingName,

    #[error("missing address")]
    MissingAddress,

    #[error("no category associations")]
    NoCategory,

    #[error("zero coordinate")]
    ZeroCoordinate,
}

impl VendorRecord {
    /// Check the invariant every cached vendor satisfies.
    pub fn validate(&self) -> Result<(), InvalidVendor> {
        if self.name.trim().is_empty() {
            return Err(InvalidVendor::MissingName);
        }
        if self.address.trim().is_empty() {
            return Err(InvalidVendor::MissingAddress);
        }
        if !self.category_ids.iter().any(|c| !c.trim().is_empty()) {
            return Err(InvalidVendor::NoCategory);
        }
        if self.latitude == 0.0 || self.longitude == 0.0 {
            return Err(InvalidVendor::ZeroCoordinate);
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn in_category(&self, category_id: &str) -> bool {
        self.category_ids.iter().any(|c| c == category_id)
    }

    /// Case-insensitive exact match against the activity field or any tag.
    pub fn matches_tag(&self, tag: &str) -> bool {
        eq_ignore_case(&self.activity, tag) || self.tags.iter().any(|t| eq_ignore_case(t, tag))
    }

    /// Case-insensitive substring match against name, address and tags.
    /// `needle` must already be lowercased.
    pub(crate) fn matches_query(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.address.to_lowercase().contains(needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Top-level vendor category (e.g. "Shaorma", "Pizza").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRecord {
    pub id: i32,
    pub image_path: String,
    pub name: String,
}

/// Refinement of one or more categories, used as a tag filter in category views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubCategoryRecord {
    pub id: i32,
    pub category_ids: Vec<String>,
    pub image_path: String,
    pub name: String,
}

impl SubCategoryRecord {
    pub fn belongs_to(&self, category_id: &str) -> bool {
        self.category_ids.iter().any(|c| c == category_id)
    }
}

/// Promotional image shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BannerRecord {
    pub key: String,
    pub image: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vendor() -> VendorRecord {
        VendorRecord {
            key: VendorKey::new("-Nabc"),
            id: 1,
            name: "Dristor Kebab".to_owned(),
            category_ids: vec!["1".to_owned()],
            subcategory_ids: vec![],
            latitude: 44.42,
            longitude: 26.14,
            address: "Sos. Mihai Bravu 1".to_owned(),
            short_address: "Dristor".to_owned(),
            phone: String::new(),
            hours: String::new(),
            activity: "Shaorma".to_owned(),
            image_path: String::new(),
            is_popular: false,
            tags: vec!["Late Night".to_owned()],
        }
    }

    #[test]
    fn synthesized_key_uses_category_and_id() {
        assert_eq!(VendorKey::synthesize(Some("2"), 14).as_str(), "2_14");
        assert_eq!(VendorKey::synthesize(None, 3).as_str(), "unknown_3");
    }

    #[test]
    fn complete_record_is_valid() {
        assert!(vendor().is_valid());
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut v = vendor();
        v.name = "   ".to_owned();
        assert_eq!(v.validate(), Err(InvalidVendor::MissingName));
    }

    #[test]
    fn empty_address_is_rejected() {
        let mut v = vendor();
        v.address.clear();
        assert_eq!(v.validate(), Err(InvalidVendor::MissingAddress));
    }

    #[test]
    fn blank_categories_are_rejected() {
        let mut v = vendor();
        v.category_ids = vec![String::new()];
        assert_eq!(v.validate(), Err(InvalidVendor::NoCategory));
    }

    #[test]
    fn zero_coordinates_are_rejected() {
        let mut v = vendor();
        v.longitude = 0.0;
        assert_eq!(v.validate(), Err(InvalidVendor::ZeroCoordinate));

        let mut v = vendor();
        v.latitude = 0.0;
        assert_eq!(v.validate(), Err(InvalidVendor::ZeroCoordinate));
    }

    #[test]
    fn tag_match_covers_activity_and_tags() {
        let v = vendor();
        assert!(v.matches_tag("shaorma"));
        assert!(v.matches_tag("LATE NIGHT"));
        assert!(!v.matches_tag("late"));
    }

    #[test]
    fn query_match_is_substring() {
        let v = vendor();
        assert!(v.matches_query("kebab"));
        assert!(v.matches_query("bravu"));
        assert!(v.matches_query("night"));
        assert!(!v.matches_query("pizza"));
    }
}
