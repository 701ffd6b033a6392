//! Output module for exporting crawl results and reporting statistics
//!
//! This module handles:
//! - Exporting finished listings as a JSON batch
//! - Recording and printing crawl statistics

mod json;
pub mod stats;

pub use json::{read_listings_json, write_listings_json};
pub use stats::{load_statistics, print_statistics, CrawlStatistics};

use crate::storage::StorageError;
use thiserror::Error;

/// Errors that can occur while producing output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("No crawl runs found in database")]
    NoRuns,
}
