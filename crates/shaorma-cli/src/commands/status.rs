use std::path::Path;

use anyhow::Result;
use shaorma::{CacheMetadata, Partition, now_millis};
use shaorma_store::Session;

use crate::config::AppConfig;

/// Freshness of one cache partition, as printed.
fn describe(meta: Option<&CacheMetadata>, now: i64) -> String {
    let Some(meta) = meta else {
        return "never synced".to_owned();
    };

    let age = (now - meta.synced_at).max(0) / 60_000;
    if meta.is_valid_at(now) {
        format!(
            "synced {age} min ago, fresh for {} more min",
            meta.remaining_minutes(now)
        )
    } else {
        format!("synced {age} min ago, expired")
    }
}

pub fn run(session: &Session, config: &AppConfig, data_dir: &Path, json: bool) -> Result<()> {
    let now = now_millis();
    let store = session.store();

    let mut rows = Vec::new();
    for partition in Partition::all() {
        let count = store.count(partition)?;
        let meta = store.metadata(partition.cache_key())?;
        rows.push((partition, count, meta));
    }

    let favorites = session.favorite_keys().len();
    let profile = session.profile();

    if json {
        let partitions: Vec<_> = rows
            .iter()
            .map(|(partition, count, meta)| {
                serde_json::json!({
                    "partition": partition.cache_key(),
                    "count": count,
                    "synced_at": meta.as_ref().map(|m| m.synced_at),
                    "expires_at": meta.as_ref().map(|m| m.expires_at),
                    "valid": meta.as_ref().is_some_and(|m| m.is_valid_at(now)),
                })
            })
            .collect();
        let value = serde_json::json!({
            "database_url": config.database_url,
            "data_dir": data_dir,
            "partitions": partitions,
            "favorites": favorites,
            "user": profile.name,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let url = if config.database_url.is_empty() {
        "(not configured)"
    } else {
        config.database_url.as_str()
    };
    println!("Database:  {url}");
    println!("Data dir:  {}", data_dir.display());
    println!();
    for (partition, count, meta) in &rows {
        println!(
            "  {:<14} {:>5}  {}",
            partition.to_string(),
            count,
            describe(meta.as_ref(), now)
        );
    }
    println!();
    println!("Favorites: {favorites}");
    println!("User:      {}", profile.name);

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn describe_reports_missing_metadata() {
        assert_eq!(describe(None, 0), "never synced");
    }

    #[test]
    fn describe_fresh_and_expired() {
        let meta = CacheMetadata::new("stores", 0, Duration::from_secs(3600), 3);

        assert_eq!(
            describe(Some(&meta), 10 * 60_000),
            "synced 10 min ago, fresh for 50 more min"
        );
        assert_eq!(
            describe(Some(&meta), 61 * 60_000),
            "synced 61 min ago, expired"
        );
    }
}
