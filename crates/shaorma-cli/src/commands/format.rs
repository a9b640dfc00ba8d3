use std::collections::BTreeSet;

use shaorma::{NearbyVendor, VendorKey};

const MAX_NAME_WIDTH: usize = 30;
const MAX_KEY_WIDTH: usize = 22;
const DISTANCE_WIDTH: usize = 8;
const LINE_BUDGET: usize = 110;

pub fn print_vendor_table(title: &str, vendors: &[NearbyVendor], favorites: &BTreeSet<VendorKey>) {
    println!("{title} ({})", vendors.len());

    if vendors.is_empty() {
        println!("  nothing to show");
        return;
    }

    let names = vendors.iter().map(|n| n.vendor.name.as_str());
    let name_width = column_width(names, MAX_NAME_WIDTH);
    let keys = vendors.iter().map(|n| n.vendor.key.as_str());
    let key_width = column_width(keys, MAX_KEY_WIDTH);
    let distance_width = DISTANCE_WIDTH;
    let address_budget =
        LINE_BUDGET.saturating_sub(4 + name_width + 2 + distance_width + 2 + key_width + 2);

    for entry in vendors {
        let vendor = &entry.vendor;
        let marker = if favorites.contains(&vendor.key) { '*' } else { ' ' };
        let address = if vendor.short_address.is_empty() {
            &vendor.address
        } else {
            &vendor.short_address
        };

        println!(
            "  {marker} {:<name_width$}  {:>distance_width$}  {:<key_width$}  {}",
            truncate(&vendor.name, name_width),
            format_distance(entry.distance_m),
            truncate(vendor.key.as_str(), key_width),
            truncate(address, address_budget),
        );
    }
}

/// Meters below one kilometer, kilometers with one decimal above.
pub fn format_distance(distance_m: Option<f64>) -> String {
    match distance_m {
        None => "-".to_owned(),
        Some(m) if m < 1000.0 => format!("{m:.0} m"),
        Some(m) => format!("{:.1} km", m / 1000.0),
    }
}

fn column_width<'a>(values: impl Iterator<Item = &'a str>, max: usize) -> usize {
    values.map(|v| v.chars().count()).max().unwrap_or(0).min(max)
}

pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_owned()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{truncated}…")
    }
}
