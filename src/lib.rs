//! Estate-Crawler: a real-estate listing harvester
//!
//! This crate crawls the paginated indexes of a listing site, resolves every
//! index entry into a full detail record and normalizes the extracted fields
//! into [`Listing`] entities ready for storage.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod listing;
pub mod output;
pub mod resolver;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Estate-Crawler operations
///
/// Only setup and resource failures surface as a `CrawlError`. Per-page and
/// per-field failures are contained by the crawler and only logged.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid request header: {0}")]
    InvalidHeader(String),
}

/// Result type alias for Estate-Crawler operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlReport, Crawler};
pub use listing::{Listing, ListingKind, PhotoUrls, PropertyType};
pub use state::ListingState;
