use anyhow::Result;
use shaorma::Partition;
use shaorma_store::Session;

/// Refresh lookup collections when their cache has expired.
pub async fn ensure_fresh(session: &Session) {
    if session.store().is_cache_valid(Partition::Categories.cache_key()) {
        return;
    }

    let report = session.refresh_lookups().await;
    tracing::debug!(?report, "lookups refreshed");
}

pub fn categories(session: &Session, json: bool) -> Result<()> {
    let categories = session.categories();

    if json {
        println!("{}", serde_json::to_string_pretty(&categories)?);
        return Ok(());
    }

    println!("Categories ({})", categories.len());
    for c in &categories {
        println!("  {:>4}  {}", c.id, c.name);
    }
    Ok(())
}

pub fn subcategories(session: &Session, category_id: &str, json: bool) -> Result<()> {
    let subcategories = session.subcategories(category_id);

    if json {
        println!("{}", serde_json::to_string_pretty(&subcategories)?);
        return Ok(());
    }

    println!("Subcategories of {category_id} ({})", subcategories.len());
    for s in &subcategories {
        println!("  {:>4}  {}", s.id, s.name);
    }
    Ok(())
}

pub fn banners(session: &Session, json: bool) -> Result<()> {
    let banners = session.banners();

    if json {
        println!("{}", serde_json::to_string_pretty(&banners)?);
        return Ok(());
    }

    println!("Banners ({})", banners.len());
    for b in &banners {
        println!("  {}", b.image);
    }
    Ok(())
}
