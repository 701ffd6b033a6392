use crate::listing::{ListingKind, PropertyType};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for Estate-Crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Header name to value, sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    pub output: OutputConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default, rename = "index")]
    pub indexes: Vec<IndexEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of in-flight requests across the whole run
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: u32,

    /// Attempts per request, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (milliseconds), doubled on each attempt
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound for a single retry delay (milliseconds)
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// Whole-request timeout (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Path segment the site redirects removed listings to
    #[serde(default = "default_removed_marker")]
    pub removed_marker: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent_requests(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            removed_marker: default_removed_marker(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database file
    pub database_path: String,

    /// Optional JSON export of every finished listing
    #[serde(default)]
    pub json_path: Option<String>,

    /// Directory receiving unexpected-status markers
    #[serde(default = "default_debug_dir")]
    pub debug_dir: String,
}

/// Headless browser used to reveal phone numbers and coordinates
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BrowserConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub headless: bool,

    /// Element clicked to unmask the phone numbers
    #[serde(default = "default_phone_button_selector")]
    pub phone_button_selector: String,

    /// Element whose inner HTML holds the revealed numbers
    #[serde(default = "default_phone_container_selector")]
    pub phone_container_selector: String,

    /// Time given to page scripts after a click or navigation (milliseconds)
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            headless: true,
            phone_button_selector: default_phone_button_selector(),
            phone_container_selector: default_phone_container_selector(),
            settle_ms: default_settle_ms(),
        }
    }
}

/// One paginated index to crawl
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IndexEntry {
    pub property_type: PropertyType,
    pub kind: ListingKind,
    pub url: String,
}

fn default_max_concurrent_requests() -> u32 {
    40
}

fn default_max_attempts() -> u32 {
    10
}

fn default_backoff_base_ms() -> u64 {
    100
}

fn default_backoff_max_ms() -> u64 {
    30_000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_removed_marker() -> String {
    "sd".to_string()
}

fn default_debug_dir() -> String {
    "debug".to_string()
}

fn default_true() -> bool {
    true
}

fn default_phone_button_selector() -> String {
    "#callBtn".to_string()
}

fn default_phone_container_selector() -> String {
    "#phoneNumbersHolder".to_string()
}

fn default_settle_ms() -> u64 {
    1500
}
