use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shaorma::DEFAULT_NEAREST_LIMIT;
use shaorma::source::{BANNERS_PATH, CATEGORIES_PATH, SUBCATEGORIES_PATH, VENDORS_PATH};
use shaorma_store::SyncSettings;

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Realtime database base URL.
    pub database_url: String,
    pub auth_token: Option<String>,
    pub vendors_path: String,
    pub categories_path: String,
    pub subcategories_path: String,
    pub banners_path: String,
    pub vendor_timeout_ms: u64,
    pub lookup_timeout_ms: u64,
    pub cache_validity_hours: u64,
    pub nearest_limit: usize,
    /// Used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            auth_token: None,
            vendors_path: VENDORS_PATH.into(),
            categories_path: CATEGORIES_PATH.into(),
            subcategories_path: SUBCATEGORIES_PATH.into(),
            banners_path: BANNERS_PATH.into(),
            vendor_timeout_ms: 15_000,
            lookup_timeout_ms: 10_000,
            cache_validity_hours: 6,
            nearest_limit: DEFAULT_NEAREST_LIMIT,
            log_level: "info".into(),
        }
    }
}

impl AppConfig {
    /// Apply `SHAORMA_DATABASE_URL` and `SHAORMA_AUTH_TOKEN`. Empty values
    /// are ignored.
    pub fn with_env(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = var("SHAORMA_DATABASE_URL").filter(|v| !v.trim().is_empty()) {
            self.database_url = url;
        }
        if let Some(token) = var("SHAORMA_AUTH_TOKEN").filter(|v| !v.trim().is_empty()) {
            self.auth_token = Some(token);
        }
        self
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            vendors_path: self.vendors_path.clone(),
            categories_path: self.categories_path.clone(),
            subcategories_path: self.subcategories_path.clone(),
            banners_path: self.banners_path.clone(),
            vendor_timeout: Duration::from_millis(self.vendor_timeout_ms),
            lookup_timeout: Duration::from_millis(self.lookup_timeout_ms),
            cache_validity: Duration::from_secs(self.cache_validity_hours.saturating_mul(3600)),
        }
    }
}

/// Config file path: `~/.config/shaorma/config.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("shaorma").join("config.toml"))
}

/// Load config from file and environment, falling back to defaults if the
/// file is missing or unparsable.
pub fn load_config() -> AppConfig {
    let from_file = config_path()
        .map(|path| load_from(&path))
        .unwrap_or_default();
    from_file.with_env(|name| std::env::var(name).ok())
}

/// Runs before logging is set up, so problems go straight to stderr.
fn load_from(path: &Path) -> AppConfig {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return AppConfig::default();
    };

    match toml::from_str::<AppConfig>(&contents) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "warning: failed to parse config at {}, using defaults: {e}",
                path.display()
            );
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_remote_layout() {
        let config = AppConfig::default();
        assert_eq!(config.vendors_path, "Stores");
        assert_eq!(config.categories_path, "Category");
        assert_eq!(config.subcategories_path, "SubCategory");
        assert_eq!(config.banners_path, "Banners");
        assert_eq!(config.nearest_limit, 5);
    }

    #[test]
    fn default_settings_use_standard_timeouts() {
        let settings = AppConfig::default().sync_settings();
        assert_eq!(settings, SyncSettings::default());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let toml_str = r#"
database_url = "https://example-rtdb.firebaseio.com"
vendor_timeout_ms = 3000
cache_validity_hours = 1
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.database_url, "https://example-rtdb.firebaseio.com");
        assert_eq!(config.lookup_timeout_ms, 10_000);

        let settings = config.sync_settings();
        assert_eq!(settings.vendor_timeout, Duration::from_secs(3));
        assert_eq!(settings.cache_validity, Duration::from_secs(3600));
    }

    #[test]
    fn env_overrides_file_values() {
        let config = AppConfig {
            database_url: "https://file".into(),
            ..AppConfig::default()
        }
        .with_env(|name| match name {
            "SHAORMA_DATABASE_URL" => Some("https://env".into()),
            "SHAORMA_AUTH_TOKEN" => Some("secret".into()),
            _ => None,
        });

        assert_eq!(config.database_url, "https://env");
        assert_eq!(config.auth_token.as_deref(), Some("secret"));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let config = AppConfig {
            database_url: "https://file".into(),
            ..AppConfig::default()
        }
        .with_env(|_| Some("  ".into()));

        assert_eq!(config.database_url, "https://file");
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn unparsable_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "nearest_limit = \"many\"").unwrap();

        assert_eq!(load_from(&path), AppConfig::default());
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_from(&dir.path().join("absent.toml")), AppConfig::default());
    }
}
