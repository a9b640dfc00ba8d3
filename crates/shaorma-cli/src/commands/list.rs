use anyhow::{Context, Result};
use shaorma::{CategoryFilter, DashboardView, GeoPoint, NearbyVendor};
use shaorma_store::Session;

use super::format;

/// Which dashboard projection to print.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Nearest,
    Popular,
    Favorites,
    Category(CategoryFilter),
    Search(String),
}

impl Projection {
    fn title(&self) -> String {
        match self {
            Self::Nearest => "Nearest".to_owned(),
            Self::Popular => "Popular".to_owned(),
            Self::Favorites => "Favorites".to_owned(),
            Self::Category(filter) => match filter.tag.as_deref() {
                Some(tag) => format!("Category {} / {tag}", filter.category_id),
                None => format!("Category {}", filter.category_id),
            },
            Self::Search(query) => format!("Search {query:?}"),
        }
    }

    fn select(&self, view: &DashboardView) -> Vec<NearbyVendor> {
        match self {
            Self::Nearest => view.nearest.clone(),
            Self::Popular => view.popular.clone(),
            Self::Favorites => view.favorites.clone(),
            Self::Category(filter) => view.category(filter),
            Self::Search(query) => view.search(query),
        }
    }
}

/// Derive the dashboard from what is cached right now.
pub fn current_view(
    session: &Session,
    near: Option<GeoPoint>,
    nearest_limit: usize,
) -> Result<DashboardView> {
    let records = session
        .store()
        .vendors()
        .context("failed to read cached vendors")?;

    Ok(DashboardView::derive(
        &records,
        near,
        &session.favorite_keys(),
        nearest_limit,
    ))
}

pub fn run(
    session: &Session,
    projection: &Projection,
    near: Option<GeoPoint>,
    nearest_limit: usize,
    json: bool,
) -> Result<()> {
    let view = current_view(session, near, nearest_limit)?;
    let vendors = projection.select(&view);

    if json {
        println!("{}", serde_json::to_string_pretty(&vendors)?);
        return Ok(());
    }

    if view.all.is_empty() {
        eprintln!("No cached vendors yet. Run `shaorma sync` once you are online.");
    } else if near.is_none() {
        eprintln!("No location given; pass --near LAT,LON to sort by distance.");
    }

    format::print_vendor_table(&projection.title(), &vendors, &view.favorite_keys);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_name_the_selection() {
        assert_eq!(Projection::Nearest.title(), "Nearest");
        assert_eq!(
            Projection::Category(CategoryFilter::new("1").with_tag("Shaorma")).title(),
            "Category 1 / Shaorma"
        );
        assert_eq!(Projection::Search("dristor".into()).title(), "Search \"dristor\"");
    }

    #[test]
    fn empty_view_selects_nothing() {
        let view = DashboardView::default();
        assert!(Projection::Popular.select(&view).is_empty());
        assert!(Projection::Search("x".into()).select(&view).is_empty());
    }
}
