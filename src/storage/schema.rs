//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Estate-Crawler
//! database.

/// SQL schema for the database
///
/// List-valued listing fields are stored as JSON text. `photos_urls` is SQL
/// NULL when photos were never looked at and the JSON text `null` when the
/// page asserted that there are none.
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    listings_saved INTEGER
);

-- One row per listing, keyed by the id from its URL
CREATE TABLE IF NOT EXISTS listings (
    id INTEGER PRIMARY KEY,
    property_type TEXT NOT NULL,
    is_new INTEGER NOT NULL DEFAULT 0,
    url TEXT NOT NULL,
    relevant INTEGER,
    title TEXT,
    description TEXT,
    area INTEGER,
    floor INTEGER,
    rooms_number INTEGER,
    age INTEGER,
    price REAL,
    price_per_day REAL,
    from_price REAL,
    rent_price REAL,
    request_price INTEGER NOT NULL DEFAULT 0,
    currency TEXT,
    district TEXT,
    region TEXT,
    publish_date TEXT,
    phone_numbers TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    ad_features TEXT NOT NULL DEFAULT '[]',
    elevator INTEGER NOT NULL DEFAULT 0,
    location TEXT,
    photos_urls TEXT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_listings_property_type ON listings(property_type);
CREATE INDEX IF NOT EXISTS idx_listings_relevant ON listings(relevant);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
