use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use shaorma::{
    BannerRecord, CacheMetadata, CategoryRecord, Partition, SubCategoryRecord, VendorKey,
    VendorRecord, now_millis,
};
use tokio::sync::watch;

use crate::schema;

/// Full snapshot of a cached table, shared with observers.
pub type Snapshot<T> = Arc<Vec<T>>;

/// SQLite-backed cache of everything mirrored from the remote database.
///
/// Every committed write republishes the complete table on that table's
/// watch channel, so observers always see the last committed state.
pub struct CacheStore {
    conn: Mutex<rusqlite::Connection>,
    vendors: watch::Sender<Snapshot<VendorRecord>>,
    categories: watch::Sender<Snapshot<CategoryRecord>>,
    subcategories: watch::Sender<Snapshot<SubCategoryRecord>>,
    banners: watch::Sender<Snapshot<BannerRecord>>,
}

impl CacheStore {
    /// Open a store backed by a file on disk.
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
        migrate(&mut conn)?;

        let vendors = read_vendors(&conn)?;
        let categories = read_categories(&conn)?;
        let subcategories = read_subcategories(&conn)?;
        let banners = read_banners(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            vendors: watch::Sender::new(Arc::new(vendors)),
            categories: watch::Sender::new(Arc::new(categories)),
            subcategories: watch::Sender::new(Arc::new(subcategories)),
            banners: watch::Sender::new(Arc::new(banners)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, rusqlite::Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".into()))
    }

    /// Insert or replace vendors by key in a single transaction.
    pub fn upsert_vendors(&self, vendors: &[VendorRecord]) -> Result<(), StoreError> {
        {
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            insert_vendors(&tx, vendors)?;
            tx.commit()?;
            self.publish(&conn, Partition::Vendors);
        }
        Ok(())
    }

    /// Write a synced vendor batch and its metadata row atomically.
    pub fn commit_vendor_sync(
        &self,
        vendors: &[VendorRecord],
        metadata: &CacheMetadata,
    ) -> Result<(), StoreError> {
        {
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            insert_vendors(&tx, vendors)?;
            write_metadata(&tx, metadata)?;
            tx.commit()?;
            self.publish(&conn, Partition::Vendors);
        }
        Ok(())
    }

    pub fn upsert_categories(&self, categories: &[CategoryRecord]) -> Result<(), StoreError> {
        {
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR REPLACE INTO categories (id, image_path, name) VALUES (?1, ?2, ?3)",
                )?;
                for c in categories {
                    stmt.execute(rusqlite::params![c.id, c.image_path, c.name])?;
                }
            }
            tx.commit()?;
            self.publish(&conn, Partition::Categories);
        }
        Ok(())
    }

    pub fn upsert_subcategories(
        &self,
        subcategories: &[SubCategoryRecord],
    ) -> Result<(), StoreError> {
        {
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR REPLACE INTO subcategories (id, category_ids_json, image_path, name)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for s in subcategories {
                    stmt.execute(rusqlite::params![
                        s.id,
                        serde_json::to_string(&s.category_ids)?,
                        s.image_path,
                        s.name,
                    ])?;
                }
            }
            tx.commit()?;
            self.publish(&conn, Partition::SubCategories);
        }
        Ok(())
    }

    pub fn upsert_banners(&self, banners: &[BannerRecord]) -> Result<(), StoreError> {
        {
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            {
                let mut stmt =
                    tx.prepare("INSERT OR REPLACE INTO banners (key, image) VALUES (?1, ?2)")?;
                for b in banners {
                    stmt.execute(rusqlite::params![b.key, b.image])?;
                }
            }
            tx.commit()?;
            self.publish(&conn, Partition::Banners);
        }
        Ok(())
    }

    /// Remove every row of a partition. Metadata rows are left alone.
    pub fn delete_all(&self, partition: Partition) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(&format!("DELETE FROM {}", table_name(partition)), [])?;
        self.publish(&conn, partition);
        Ok(())
    }

    /// Drop cached vendors together with their freshness row, forcing the
    /// next sync to hit the network.
    pub fn clear_vendors(&self) -> Result<(), StoreError> {
        {
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM vendors", [])?;
            tx.execute(
                "DELETE FROM cache_metadata WHERE key = ?1",
                [Partition::Vendors.cache_key()],
            )?;
            tx.commit()?;
            self.publish(&conn, Partition::Vendors);
        }
        tracing::info!("vendor cache cleared");
        Ok(())
    }

    pub fn count(&self, partition: Partition) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table_name(partition)),
            [],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Whether anything is cached for the partition. Read errors count as no.
    pub fn has_cached_data(&self, partition: Partition) -> bool {
        match self.count(partition) {
            Ok(n) => n > 0,
            Err(e) => {
                tracing::warn!(%partition, error = %e, "could not count cached rows");
                false
            }
        }
    }

    pub fn vendors(&self) -> Result<Vec<VendorRecord>, StoreError> {
        read_vendors(&*self.lock()?)
    }

    pub fn vendor(&self, key: &VendorKey) -> Result<Option<VendorRecord>, StoreError> {
        let conn = self.lock()?;
        let result = conn.query_row(
            &format!("{VENDOR_COLUMNS} WHERE key = ?1"),
            [key.as_str()],
            row_to_vendor,
        );
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn categories(&self) -> Result<Vec<CategoryRecord>, StoreError> {
        read_categories(&*self.lock()?)
    }

    pub fn subcategories(&self) -> Result<Vec<SubCategoryRecord>, StoreError> {
        read_subcategories(&*self.lock()?)
    }

    /// Subcategories owned by `category_id`, exact id match.
    pub fn subcategories_for(
        &self,
        category_id: &str,
    ) -> Result<Vec<SubCategoryRecord>, StoreError> {
        Ok(self
            .subcategories()?
            .into_iter()
            .filter(|s| s.belongs_to(category_id))
            .collect())
    }

    pub fn banners(&self) -> Result<Vec<BannerRecord>, StoreError> {
        read_banners(&*self.lock()?)
    }

    pub fn observe_vendors(&self) -> watch::Receiver<Snapshot<VendorRecord>> {
        self.vendors.subscribe()
    }

    pub fn observe_categories(&self) -> watch::Receiver<Snapshot<CategoryRecord>> {
        self.categories.subscribe()
    }

    pub fn observe_subcategories(&self) -> watch::Receiver<Snapshot<SubCategoryRecord>> {
        self.subcategories.subscribe()
    }

    pub fn observe_banners(&self) -> watch::Receiver<Snapshot<BannerRecord>> {
        self.banners.subscribe()
    }

    pub fn metadata(&self, key: &str) -> Result<Option<CacheMetadata>, StoreError> {
        let conn = self.lock()?;
        let result = conn.query_row(
            "SELECT key, synced_at, expires_at, item_count FROM cache_metadata WHERE key = ?1",
            [key],
            |row| {
                Ok(CacheMetadata {
                    key: row.get(0)?,
                    synced_at: row.get(1)?,
                    expires_at: row.get(2)?,
                    item_count: row.get(3)?,
                })
            },
        );
        match result {
            Ok(meta) => Ok(Some(meta)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save_metadata(&self, metadata: &CacheMetadata) -> Result<(), StoreError> {
        write_metadata(&*self.lock()?, metadata)
    }

    pub fn delete_metadata(&self, key: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM cache_metadata WHERE key = ?1", [key])?;
        Ok(())
    }

    /// Whether the cache for `key` may be used without a refresh.
    pub fn is_cache_valid(&self, key: &str) -> bool {
        self.is_cache_valid_at(key, now_millis())
    }

    /// Freshness check against an explicit clock reading. Missing rows and
    /// read errors both answer `false`.
    pub fn is_cache_valid_at(&self, key: &str, now: i64) -> bool {
        match self.metadata(key) {
            Ok(Some(meta)) => {
                let valid = meta.is_valid_at(now);
                if valid {
                    tracing::debug!(
                        key,
                        remaining_minutes = meta.remaining_minutes(now),
                        "cache still valid"
                    );
                } else {
                    tracing::debug!(key, "cache expired");
                }
                valid
            }
            Ok(None) => {
                tracing::debug!(key, "no cache metadata");
                false
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "could not read cache metadata");
                false
            }
        }
    }

    /// Re-read a table and push the snapshot to its observers. Called with
    /// the connection lock held so snapshots go out in commit order.
    fn publish(&self, conn: &rusqlite::Connection, partition: Partition) {
        let result = match partition {
            Partition::Vendors => read_vendors(conn).map(|v| {
                self.vendors.send_replace(Arc::new(v));
            }),
            Partition::Categories => read_categories(conn).map(|c| {
                self.categories.send_replace(Arc::new(c));
            }),
            Partition::SubCategories => read_subcategories(conn).map(|s| {
                self.subcategories.send_replace(Arc::new(s));
            }),
            Partition::Banners => read_banners(conn).map(|b| {
                self.banners.send_replace(Arc::new(b));
            }),
        };

        if let Err(e) = result {
            tracing::warn!(%partition, error = %e, "could not publish snapshot");
        }
    }
}

/// Migrate the cache schema, rebuilding it from scratch when the on-disk
/// version cannot be migrated (for example one written by a newer build).
fn migrate(conn: &mut rusqlite::Connection) -> Result<(), StoreError> {
    if let Err(e) = schema::cache_migrations().to_latest(conn) {
        tracing::warn!(error = %e, "cache schema cannot be migrated, rebuilding cache tables");
        schema::drop_cache_tables(conn)?;
        schema::cache_migrations()
            .to_latest(conn)
            .map_err(|e| StoreError::Migration(e.to_string()))?;
    }
    Ok(())
}

fn table_name(partition: Partition) -> &'static str {
    match partition {
        Partition::Vendors => "vendors",
        Partition::Categories => "categories",
        Partition::SubCategories => "subcategories",
        Partition::Banners => "banners",
    }
}

const VENDOR_COLUMNS: &str = "SELECT key, id, name, category_ids_json, subcategory_ids_json,
            latitude, longitude, address, short_address, phone, hours, activity,
            image_path, is_popular, tags_json
     FROM vendors";

fn insert_vendors(conn: &rusqlite::Connection, vendors: &[VendorRecord]) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "INSERT OR REPLACE INTO vendors
            (key, id, name, category_ids_json, subcategory_ids_json, latitude, longitude,
             address, short_address, phone, hours, activity, image_path, is_popular, tags_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
    )?;

    for v in vendors {
        stmt.execute(rusqlite::params![
            v.key.as_str(),
            v.id,
            v.name,
            serde_json::to_string(&v.category_ids)?,
            serde_json::to_string(&v.subcategory_ids)?,
            v.latitude,
            v.longitude,
            v.address,
            v.short_address,
            v.phone,
            v.hours,
            v.activity,
            v.image_path,
            v.is_popular,
            serde_json::to_string(&v.tags)?,
        ])?;
    }

    Ok(())
}

fn write_metadata(conn: &rusqlite::Connection, metadata: &CacheMetadata) -> Result<(), StoreError> {
    conn.execute(
        "INSERT OR REPLACE INTO cache_metadata (key, synced_at, expires_at, item_count)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            metadata.key,
            metadata.synced_at,
            metadata.expires_at,
            metadata.item_count,
        ],
    )?;
    Ok(())
}

fn json_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn row_to_vendor(row: &rusqlite::Row) -> rusqlite::Result<VendorRecord> {
    let key: String = row.get(0)?;
    let category_ids: String = row.get(3)?;
    let subcategory_ids: String = row.get(4)?;
    let tags: String = row.get(14)?;

    Ok(VendorRecord {
        key: VendorKey::new(key),
        id: row.get(1)?,
        name: row.get(2)?,
        category_ids: json_list(&category_ids),
        subcategory_ids: json_list(&subcategory_ids),
        latitude: row.get(5)?,
        longitude: row.get(6)?,
        address: row.get(7)?,
        short_address: row.get(8)?,
        phone: row.get(9)?,
        hours: row.get(10)?,
        activity: row.get(11)?,
        image_path: row.get(12)?,
        is_popular: row.get(13)?,
        tags: json_list(&tags),
    })
}

fn read_vendors(conn: &rusqlite::Connection) -> Result<Vec<VendorRecord>, StoreError> {
    let mut stmt = conn.prepare(&format!("{VENDOR_COLUMNS} ORDER BY key"))?;
    let vendors = stmt
        .query_map([], row_to_vendor)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(vendors)
}

fn read_categories(conn: &rusqlite::Connection) -> Result<Vec<CategoryRecord>, StoreError> {
    let mut stmt = conn.prepare("SELECT id, image_path, name FROM categories ORDER BY id")?;
    let categories = stmt
        .query_map([], |row| {
            Ok(CategoryRecord {
                id: row.get(0)?,
                image_path: row.get(1)?,
                name: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(categories)
}

fn read_subcategories(conn: &rusqlite::Connection) -> Result<Vec<SubCategoryRecord>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, category_ids_json, image_path, name FROM subcategories ORDER BY id",
    )?;
    let subcategories = stmt
        .query_map([], |row| {
            let category_ids: String = row.get(1)?;
            Ok(SubCategoryRecord {
                id: row.get(0)?,
                category_ids: json_list(&category_ids),
                image_path: row.get(2)?,
                name: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(subcategories)
}

fn read_banners(conn: &rusqlite::Connection) -> Result<Vec<BannerRecord>, StoreError> {
    let mut stmt = conn.prepare("SELECT key, image FROM banners ORDER BY key")?;
    let banners = stmt
        .query_map([], |row| {
            Ok(BannerRecord {
                key: row.get(0)?,
                image: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(banners)
}

/// Errors specific to store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("background task failed: {0}")]
    Task(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
