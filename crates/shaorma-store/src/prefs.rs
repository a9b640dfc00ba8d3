use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use shaorma::{VendorKey, now_millis};

use crate::schema;
use crate::store::StoreError;

/// Display name used until the user picks one.
pub const DEFAULT_USER_NAME: &str = "Guest";

/// File name a picked profile image is copied to.
pub const PROFILE_IMAGE_FILE: &str = "profile_picture.jpg";

const KEY_USER_NAME: &str = "profile.name";
const KEY_IMAGE_PATH: &str = "profile.image_path";
const KEY_CONSENT_GIVEN: &str = "consent.given";
const KEY_CONSENT_ASKED: &str = "consent.asked";
const KEY_CONSENT_TIMESTAMP: &str = "consent.timestamp";

/// User-owned settings: favorite vendors, profile, one-time consent flags.
///
/// Lives in its own database so clearing or rebuilding the vendor cache
/// never touches it.
pub struct PreferenceStore {
    conn: Mutex<rusqlite::Connection>,
}

/// Name and picture shown on the profile screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub image_path: Option<PathBuf>,
}

impl PreferenceStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = rusqlite::Connection::open(path)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Self::init(conn)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Self::init(conn)
    }

    fn init(mut conn: rusqlite::Connection) -> Result<Self, StoreError> {
        schema::preference_migrations()
            .to_latest(&mut conn)
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, rusqlite::Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".into()))
    }

    // Favorites

    pub fn favorites(&self) -> Result<BTreeSet<VendorKey>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT vendor_key FROM favorites")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .map(|k| k.map(VendorKey::new))
            .collect::<rusqlite::Result<BTreeSet<_>>>()?;
        Ok(keys)
    }

    pub fn add_favorite(&self, key: &VendorKey) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR IGNORE INTO favorites (vendor_key, added_at) VALUES (?1, ?2)",
            rusqlite::params![key.as_str(), now_millis()],
        )?;
        tracing::debug!(%key, "favorite added");
        Ok(())
    }

    pub fn remove_favorite(&self, key: &VendorKey) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM favorites WHERE vendor_key = ?1", [key.as_str()])?;
        tracing::debug!(%key, "favorite removed");
        Ok(())
    }

    pub fn is_favorite(&self, key: &VendorKey) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let found: i64 = conn.query_row(
            "SELECT COUNT(*) FROM favorites WHERE vendor_key = ?1",
            [key.as_str()],
            |row| row.get(0),
        )?;
        Ok(found > 0)
    }

    /// Flip membership and return the new state.
    pub fn toggle_favorite(&self, key: &VendorKey) -> Result<bool, StoreError> {
        if self.is_favorite(key)? {
            self.remove_favorite(key)?;
            Ok(false)
        } else {
            self.add_favorite(key)?;
            Ok(true)
        }
    }

    // Profile

    pub fn user_name(&self) -> Result<String, StoreError> {
        Ok(self
            .setting(KEY_USER_NAME)?
            .unwrap_or_else(|| DEFAULT_USER_NAME.to_owned()))
    }

    pub fn set_user_name(&self, name: &str) -> Result<(), StoreError> {
        self.put_setting(KEY_USER_NAME, name.trim())
    }

    pub fn image_path(&self) -> Result<Option<PathBuf>, StoreError> {
        Ok(self.setting(KEY_IMAGE_PATH)?.map(PathBuf::from))
    }

    pub fn set_image_path(&self, path: &Path) -> Result<(), StoreError> {
        self.put_setting(KEY_IMAGE_PATH, &path.to_string_lossy())
    }

    pub fn profile(&self) -> Result<Profile, StoreError> {
        Ok(Profile {
            name: self.user_name()?,
            image_path: self.image_path()?,
        })
    }

    /// Copy a picked image into `data_dir` and remember the copy's path.
    pub fn import_profile_image(
        &self,
        source: &Path,
        data_dir: &Path,
    ) -> Result<PathBuf, StoreError> {
        std::fs::create_dir_all(data_dir).map_err(|e| StoreError::Io(e.to_string()))?;
        let target = data_dir.join(PROFILE_IMAGE_FILE);
        std::fs::copy(source, &target).map_err(|e| {
            StoreError::Io(format!("failed to copy {}: {e}", source.display()))
        })?;
        self.set_image_path(&target)?;
        Ok(target)
    }

    // Consent

    pub fn has_consent(&self) -> Result<bool, StoreError> {
        self.flag(KEY_CONSENT_GIVEN)
    }

    pub fn has_asked_for_consent(&self) -> Result<bool, StoreError> {
        self.flag(KEY_CONSENT_ASKED)
    }

    pub fn mark_consent_asked(&self) -> Result<(), StoreError> {
        self.put_setting(KEY_CONSENT_ASKED, "true")
    }

    /// Record consent at `now` (epoch millis); also marks the prompt as asked.
    pub fn grant_consent(&self, now: i64) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for (key, value) in [
            (KEY_CONSENT_GIVEN, "true".to_owned()),
            (KEY_CONSENT_TIMESTAMP, now.to_string()),
            (KEY_CONSENT_ASKED, "true".to_owned()),
        ] {
            tx.execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
                rusqlite::params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Withdraw consent; the prompt stays marked as asked.
    pub fn revoke_consent(&self) -> Result<(), StoreError> {
        self.put_setting(KEY_CONSENT_GIVEN, "false")
    }

    /// Forget every consent flag so the prompt is shown again.
    pub fn reset_consent(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM settings WHERE key IN (?1, ?2, ?3)",
            rusqlite::params![KEY_CONSENT_GIVEN, KEY_CONSENT_TIMESTAMP, KEY_CONSENT_ASKED],
        )?;
        Ok(())
    }

    pub fn consent_timestamp(&self) -> Result<Option<i64>, StoreError> {
        Ok(self
            .setting(KEY_CONSENT_TIMESTAMP)?
            .and_then(|v| v.parse().ok()))
    }

    fn flag(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.setting(key)?.as_deref() == Some("true"))
    }

    fn setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        let result = conn.query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
            row.get(0)
        });
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }
}
