//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::listing::{Listing, PropertyType};
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt row for listing {id}: {reason}")]
    CorruptRow { id: i64, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines all database operations needed by the crawler and the
/// statistics report.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Records how a run ended, with a finish timestamp and the number of
    /// listings it saved
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Listings =====

    /// Inserts a listing or replaces the stored one with the same id
    fn save_listing(&mut self, run_id: i64, listing: &Listing) -> StorageResult<()>;

    /// Saves many listings in one transaction
    fn save_listings(&mut self, run_id: i64, listings: &[Listing]) -> StorageResult<usize> {
        for listing in listings {
            self.save_listing(run_id, listing)?;
        }
        Ok(listings.len())
    }

    /// Gets a listing by id
    fn get_listing(&self, id: i64) -> StorageResult<Option<Listing>>;

    /// Gets every stored listing, ordered by id
    fn get_all_listings(&self) -> StorageResult<Vec<Listing>>;

    // ===== Statistics =====

    /// Gets total listing count
    fn count_listings(&self) -> StorageResult<u64>;

    /// Counts listings by their `relevant` flag; `None` counts unsettled ones
    fn count_by_relevance(&self, relevant: Option<bool>) -> StorageResult<u64>;

    /// Gets listing count per property type, ordered by type
    fn count_by_property_type(&self) -> StorageResult<Vec<(PropertyType, u64)>>;
}
