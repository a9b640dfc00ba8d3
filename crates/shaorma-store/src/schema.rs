use rusqlite_migration::{M, Migrations};

/// Tables holding data mirrored from the remote database.
///
/// Everything here can be rebuilt by a sync, so a schema that cannot be
/// migrated is dropped and recreated (see [`drop_cache_tables`]).
pub fn cache_migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(
        "CREATE TABLE vendors (
            key                  TEXT PRIMARY KEY,
            id                   INTEGER NOT NULL DEFAULT 0,
            name                 TEXT NOT NULL,
            category_ids_json    TEXT NOT NULL DEFAULT '[]',
            subcategory_ids_json TEXT NOT NULL DEFAULT '[]',
            latitude             REAL NOT NULL,
            longitude            REAL NOT NULL,
            address              TEXT NOT NULL,
            short_address        TEXT NOT NULL DEFAULT '',
            phone                TEXT NOT NULL DEFAULT '',
            hours                TEXT NOT NULL DEFAULT '',
            activity             TEXT NOT NULL DEFAULT '',
            image_path           TEXT NOT NULL DEFAULT '',
            is_popular           INTEGER NOT NULL DEFAULT 0,
            tags_json            TEXT NOT NULL DEFAULT '[]'
        );

        CREATE TABLE categories (
            id          INTEGER PRIMARY KEY,
            image_path  TEXT NOT NULL DEFAULT '',
            name        TEXT NOT NULL
        );

        CREATE TABLE subcategories (
            id                 INTEGER PRIMARY KEY,
            category_ids_json  TEXT NOT NULL DEFAULT '[]',
            image_path         TEXT NOT NULL DEFAULT '',
            name               TEXT NOT NULL
        );

        CREATE TABLE banners (
            key    TEXT PRIMARY KEY,
            image  TEXT NOT NULL
        );

        CREATE TABLE cache_metadata (
            key         TEXT PRIMARY KEY,
            synced_at   INTEGER NOT NULL,
            expires_at  INTEGER NOT NULL,
            item_count  INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX idx_vendors_popular ON vendors(is_popular);",
    )])
}

/// Drop every cache table and reset the schema version.
pub fn drop_cache_tables(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS vendors;
         DROP TABLE IF EXISTS categories;
         DROP TABLE IF EXISTS subcategories;
         DROP TABLE IF EXISTS banners;
         DROP TABLE IF EXISTS cache_metadata;
         PRAGMA user_version = 0;",
    )
}

/// User-owned data. Migrations here are strictly additive and there is no
/// destructive fallback.
pub fn preference_migrations() -> Migrations<'static> {
    Migrations::new(vec![
        M::up(
            "CREATE TABLE favorites (
                vendor_key  TEXT PRIMARY KEY,
                added_at    INTEGER NOT NULL
            );",
        ),
        M::up(
            "CREATE TABLE settings (
                key    TEXT PRIMARY KEY,
                value  TEXT NOT NULL
            );",
        ),
    ])
}
