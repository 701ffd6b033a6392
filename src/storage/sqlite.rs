//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::listing::{Listing, PhotoUrls, PropertyType};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const LISTING_COLUMNS: &str = "id, property_type, is_new, url, relevant, title, description, \
     area, floor, rooms_number, age, price, price_per_day, from_price, rent_price, \
     request_price, currency, district, region, publish_date, phone_numbers, tags, \
     ad_features, elevator, location, photos_urls";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn read_run(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Running),
        listings_saved: row.get(5)?,
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> StorageResult<String> {
    Ok(serde_json::to_string(value)?)
}

fn upsert_listing(conn: &Connection, run_id: i64, listing: &Listing) -> StorageResult<()> {
    let phone_numbers = listing.phone_numbers.as_ref().map(to_json).transpose()?;
    let location = listing.location.as_ref().map(to_json).transpose()?;
    let photos_urls = match &listing.photos_urls {
        PhotoUrls::NotAttempted => None,
        other => Some(to_json(other)?),
    };

    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO listings ({}, run_id, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                     ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28)",
            LISTING_COLUMNS
        ),
        params![
            listing.id,
            listing.property_type.as_str(),
            listing.is_new,
            listing.url,
            listing.relevant,
            listing.title,
            listing.description,
            listing.area,
            listing.floor,
            listing.rooms_number,
            listing.age,
            listing.price,
            listing.price_per_day,
            listing.from_price,
            listing.rent_price,
            listing.request_price,
            listing.currency,
            listing.district,
            listing.region,
            listing.publish_date,
            phone_numbers,
            to_json(&listing.tags)?,
            to_json(&listing.ad_features)?,
            listing.elevator,
            location,
            photos_urls,
            run_id,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Raw column values of a listing row, decoded after the query returns
struct ListingRow {
    listing: Listing,
    property_type: String,
    phone_numbers: Option<String>,
    tags: String,
    ad_features: String,
    location: Option<String>,
    photos_urls: Option<String>,
}

fn read_listing_row(row: &Row<'_>) -> rusqlite::Result<ListingRow> {
    let id: i64 = row.get(0)?;
    let url: String = row.get(3)?;
    let publish_date: Option<String> = row.get(19)?;

    // Property type is patched in by `decode_listing`
    let mut listing = Listing::stub(id, PropertyType::Other, url, publish_date);
    listing.is_new = row.get(2)?;
    listing.relevant = row.get(4)?;
    listing.title = row.get(5)?;
    listing.description = row.get(6)?;
    listing.area = row.get(7)?;
    listing.floor = row.get(8)?;
    listing.rooms_number = row.get(9)?;
    listing.age = row.get(10)?;
    listing.price = row.get(11)?;
    listing.price_per_day = row.get(12)?;
    listing.from_price = row.get(13)?;
    listing.rent_price = row.get(14)?;
    listing.request_price = row.get(15)?;
    listing.currency = row.get(16)?;
    listing.district = row.get(17)?;
    listing.region = row.get(18)?;
    listing.elevator = row.get(23)?;

    Ok(ListingRow {
        listing,
        property_type: row.get(1)?,
        phone_numbers: row.get(20)?,
        tags: row.get(21)?,
        ad_features: row.get(22)?,
        location: row.get(24)?,
        photos_urls: row.get(25)?,
    })
}

fn decode_listing(raw: ListingRow) -> StorageResult<Listing> {
    let mut listing = raw.listing;

    listing.property_type =
        PropertyType::from_db_string(&raw.property_type).ok_or_else(|| StorageError::CorruptRow {
            id: listing.id,
            reason: format!("unknown property type {:?}", raw.property_type),
        })?;
    listing.phone_numbers = raw
        .phone_numbers
        .map(|s| serde_json::from_str(&s))
        .transpose()?;
    listing.tags = serde_json::from_str(&raw.tags)?;
    listing.ad_features = serde_json::from_str(&raw.ad_features)?;
    listing.location = raw.location.map(|s| serde_json::from_str(&s)).transpose()?;
    listing.photos_urls = match raw.photos_urls {
        None => PhotoUrls::NotAttempted,
        Some(s) => serde_json::from_str(&s)?,
    };

    Ok(listing)
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, listings_saved FROM runs WHERE id = ?1",
                params![run_id],
                read_run,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, listings_saved FROM runs ORDER BY id DESC LIMIT 1",
                [],
                read_run,
            )
            .optional()?;

        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs
             SET status = ?1,
                 finished_at = ?2,
                 listings_saved = (SELECT COUNT(*) FROM listings WHERE run_id = ?3)
             WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Listings =====

    fn save_listing(&mut self, run_id: i64, listing: &Listing) -> StorageResult<()> {
        upsert_listing(&self.conn, run_id, listing)
    }

    fn save_listings(&mut self, run_id: i64, listings: &[Listing]) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        for listing in listings {
            upsert_listing(&tx, run_id, listing)?;
        }
        tx.commit()?;
        Ok(listings.len())
    }

    fn get_listing(&self, id: i64) -> StorageResult<Option<Listing>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {} FROM listings WHERE id = ?1", LISTING_COLUMNS),
                params![id],
                read_listing_row,
            )
            .optional()?;

        raw.map(decode_listing).transpose()
    }

    fn get_all_listings(&self) -> StorageResult<Vec<Listing>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM listings ORDER BY id", LISTING_COLUMNS))?;

        let rows = stmt
            .query_map([], read_listing_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(decode_listing).collect()
    }

    // ===== Statistics =====

    fn count_listings(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_by_relevance(&self, relevant: Option<bool>) -> StorageResult<u64> {
        let count: i64 = match relevant {
            Some(flag) => self.conn.query_row(
                "SELECT COUNT(*) FROM listings WHERE relevant = ?1",
                params![flag],
                |row| row.get(0),
            )?,
            None => self.conn.query_row(
                "SELECT COUNT(*) FROM listings WHERE relevant IS NULL",
                [],
                |row| row.get(0),
            )?,
        };
        Ok(count as u64)
    }

    fn count_by_property_type(&self) -> StorageResult<Vec<(PropertyType, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT property_type, COUNT(*) FROM listings GROUP BY property_type ORDER BY property_type",
        )?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(ty, count)| Some((PropertyType::from_db_string(&ty)?, count as u64)))
            .collect())
    }
}
