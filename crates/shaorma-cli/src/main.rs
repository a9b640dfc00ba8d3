mod commands;
mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shaorma::{CategoryFilter, GeoPoint, VendorKey};
use shaorma_firebase::{FirebaseConfig, FirebaseSource};
use shaorma_store::{CacheStore, PreferenceStore, Session};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::commands::consent::ConsentAction;
use crate::commands::list::Projection;
use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "shaorma")]
#[command(about = "Find shaorma vendors nearby, from a local cache of the vendor database")]
struct Cli {
    /// Current location as LAT,LON
    #[arg(long, global = true, value_name = "LAT,LON", allow_hyphen_values = true)]
    near: Option<GeoPoint>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sync vendors from the remote database into the local cache
    Sync {
        /// Sync even if the cache is still fresh
        #[arg(long)]
        force: bool,
        /// Also sync categories, subcategories and banners
        #[arg(long)]
        lookups: bool,
    },
    /// Closest vendors
    Nearest,
    /// Featured vendors, nearest first
    Popular,
    /// Vendors in a category
    Category {
        /// Category id
        id: String,
        /// Only vendors whose activity or tags match
        #[arg(long)]
        tag: Option<String>,
    },
    /// Search vendors by name, address or tag
    Search {
        /// Search query
        query: String,
    },
    /// List categories
    Categories,
    /// List the subcategories of a category
    Subcategories {
        /// Owning category id
        category_id: String,
    },
    /// List dashboard banners
    Banners,
    /// Favorite vendors, or toggle one
    Favorites {
        #[command(subcommand)]
        action: Option<FavoriteAction>,
    },
    /// Show or edit the profile
    Profile {
        /// New display name
        #[arg(long)]
        name: Option<String>,
        /// Image to copy in as the profile picture
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Show or change network-use consent
    Consent {
        #[arg(value_enum, default_value = "status")]
        action: ConsentAction,
    },
    /// Show cache freshness and local state
    Status,
    /// Drop cached vendors so the next sync refetches them
    ClearCache,
}

#[derive(Subcommand)]
enum FavoriteAction {
    /// Add or remove a vendor by key
    Toggle {
        /// Vendor key, as shown in listings
        key: String,
    },
}

fn data_dir() -> Result<PathBuf> {
    let base = dirs::data_dir().context("could not determine data directory")?;
    let dir = base.join("shaorma");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create data directory: {}", dir.display()))?;
    Ok(dir)
}

fn init_logging(config: &AppConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn build_session(config: &AppConfig, dir: &std::path::Path) -> Result<Session> {
    let cache_path = dir.join("cache.db");
    let store = CacheStore::open(&cache_path)
        .with_context(|| format!("failed to open cache at {}", cache_path.display()))?;

    let prefs_path = dir.join("preferences.db");
    let prefs = PreferenceStore::open(&prefs_path)
        .with_context(|| format!("failed to open preferences at {}", prefs_path.display()))?;

    if config.database_url.is_empty() {
        tracing::warn!("no database_url configured; set SHAORMA_DATABASE_URL to sync");
    }

    let remote = FirebaseSource::new(FirebaseConfig {
        database_url: config.database_url.clone(),
        auth_token: config.auth_token.clone(),
    });

    Ok(Session::new(
        Arc::new(store),
        Arc::new(prefs),
        Arc::new(remote),
        config.sync_settings(),
        config.nearest_limit,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config();
    init_logging(&config);

    let dir = data_dir()?;
    let session = build_session(&config, &dir)?;
    let limit = config.nearest_limit;

    let projection = match cli.command {
        Command::Sync { force, lookups } => {
            return commands::sync::run(&session, force, lookups).await;
        }
        Command::Categories => {
            commands::lookups::ensure_fresh(&session).await;
            return commands::lookups::categories(&session, cli.json);
        }
        Command::Subcategories { category_id } => {
            commands::lookups::ensure_fresh(&session).await;
            return commands::lookups::subcategories(&session, &category_id, cli.json);
        }
        Command::Banners => {
            commands::lookups::ensure_fresh(&session).await;
            return commands::lookups::banners(&session, cli.json);
        }
        Command::Favorites {
            action: Some(FavoriteAction::Toggle { key }),
        } => {
            let key = VendorKey::new(key);
            if session.toggle_favorite(&key) {
                println!("{key} added to favorites");
            } else {
                println!("{key} removed from favorites");
            }
            return Ok(());
        }
        Command::Profile { name, image } => {
            return commands::profile::run(
                &session,
                &dir,
                name.as_deref(),
                image.as_deref(),
                cli.json,
            );
        }
        Command::Consent { action } => {
            return commands::consent::run(session.prefs(), action, cli.json);
        }
        Command::Status => {
            return commands::status::run(&session, &config, &dir, cli.json);
        }
        Command::ClearCache => {
            if !session.clear_cache() {
                anyhow::bail!("could not clear the vendor cache");
            }
            println!("Vendor cache cleared. Favorites and profile were kept.");
            return Ok(());
        }
        Command::Favorites { action: None } => Projection::Favorites,
        Command::Nearest => Projection::Nearest,
        Command::Popular => Projection::Popular,
        Command::Category { id, tag } => {
            let filter = CategoryFilter::new(id);
            Projection::Category(match tag {
                Some(tag) => filter.with_tag(tag),
                None => filter,
            })
        }
        Command::Search { query } => Projection::Search(query),
    };

    commands::sync::ensure_synced(&session).await;
    commands::list::run(&session, &projection, cli.near, limit, cli.json)
}
