//! Conversion of loosely-typed remote children into cached records.
//!
//! Remote documents are edited by hand, so a field may arrive as a string,
//! a number, a list, or not at all. Every field goes through [`Field`] and
//! falls back to its type's zero value instead of failing the record. Only a
//! child that is not a key-value map at all is rejected.

use serde_json::{Map, Number, Value};

use crate::source::RawChild;
use crate::vendor::{BannerRecord, CategoryRecord, SubCategoryRecord, VendorKey, VendorRecord};

/// The shape a single remote field arrived in.
#[derive(Debug, Clone, Copy)]
enum Field<'a> {
    Absent,
    Text(&'a str),
    Number(&'a Number),
    Flag(bool),
    List(&'a [Value]),
    Other,
}

impl<'a> Field<'a> {
    fn of(map: &'a Map<String, Value>, name: &str) -> Self {
        match map.get(name) {
            None | Some(Value::Null) => Self::Absent,
            Some(Value::String(s)) => Self::Text(s),
            Some(Value::Number(n)) => Self::Number(n),
            Some(Value::Bool(b)) => Self::Flag(*b),
            Some(Value::Array(items)) => Self::List(items),
            Some(Value::Object(_)) => Self::Other,
        }
    }

    /// First present field among `names`, so a renamed field can still be
    /// read under its legacy name.
    fn first_of(map: &'a Map<String, Value>, names: &[&str]) -> Self {
        names
            .iter()
            .map(|name| Self::of(map, name))
            .find(|field| !matches!(field, Self::Absent))
            .unwrap_or(Self::Absent)
    }

    /// list → element-wise strings; scalar → singleton; anything else → empty.
    fn string_list(self) -> Vec<String> {
        match self {
            Self::List(items) => items.iter().filter_map(scalar_to_string).collect(),
            Self::Text(s) => vec![s.to_owned()],
            Self::Number(n) => vec![n.to_string()],
            Self::Absent | Self::Flag(_) | Self::Other => Vec::new(),
        }
    }

    fn text(self) -> String {
        match self {
            Self::Text(s) => s.to_owned(),
            Self::Number(n) => n.to_string(),
            _ => String::new(),
        }
    }

    fn float(self) -> f64 {
        match self {
            Self::Number(n) => n.as_f64().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// Remote ids arrive as 64-bit integers; anything outside `i32` is zero.
    fn int(self) -> i32 {
        match self {
            Self::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()).unwrap_or(0),
            _ => 0,
        }
    }

    fn flag(self) -> bool {
        matches!(self, Self::Flag(true))
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Shape a remote vendor child. Returns `None` only when the child is not a
/// map; validity is checked separately with [`VendorRecord::validate`].
pub fn normalize_vendor(child: &RawChild) -> Option<VendorRecord> {
    let map = child.value.as_object()?;

    let id = Field::of(map, "Id").int();
    let category_ids = Field::first_of(map, &["CategoryIds", "CategoryId"]).string_list();

    let key = match child.remote_key() {
        Some(k) => VendorKey::new(k),
        None => VendorKey::synthesize(category_ids.first().map(String::as_str), id),
    };

    Some(VendorRecord {
        key,
        id,
        name: Field::of(map, "Title").text(),
        subcategory_ids: Field::first_of(map, &["SubCategoryIds", "SubCategoryId"])
            .string_list(),
        category_ids,
        latitude: Field::of(map, "Latitude").float(),
        longitude: Field::of(map, "Longitude").float(),
        address: Field::of(map, "Address").text(),
        short_address: Field::of(map, "ShortAddress").text(),
        phone: Field::of(map, "Call").text(),
        hours: Field::of(map, "Hours").text(),
        activity: Field::of(map, "Activity").text(),
        image_path: Field::of(map, "ImagePath").text(),
        is_popular: Field::of(map, "IsPopular").flag(),
        tags: Field::of(map, "Tags").string_list(),
    })
}

pub fn normalize_category(child: &RawChild) -> Option<CategoryRecord> {
    let map = child.value.as_object()?;

    Some(CategoryRecord {
        id: Field::of(map, "Id").int(),
        image_path: Field::of(map, "ImagePath").text(),
        name: Field::of(map, "Name").text(),
    })
}

pub fn normalize_subcategory(child: &RawChild) -> Option<SubCategoryRecord> {
    let map = child.value.as_object()?;

    Some(SubCategoryRecord {
        id: Field::of(map, "Id").int(),
        category_ids: Field::first_of(map, &["CategoryIds", "CategoryId"]).string_list(),
        image_path: Field::of(map, "ImagePath").text(),
        name: Field::of(map, "Name").text(),
    })
}

/// Banners without a remote key are keyed by their image reference.
pub fn normalize_banner(child: &RawChild) -> Option<BannerRecord> {
    let map = child.value.as_object()?;
    let image = Field::of(map, "image").text();

    let key = child
        .remote_key()
        .map(str::to_owned)
        .unwrap_or_else(|| image.clone());

    Some(BannerRecord { key, image })
}
