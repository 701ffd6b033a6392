//! Statistics generation from the listings database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::listing::PropertyType;
use crate::output::OutputError;
use crate::storage::{RunRecord, Storage};

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Most recent run
    pub latest_run: RunRecord,

    /// Total number of stored listings
    pub total_listings: u64,

    /// Listings whose detail page was parsed
    pub relevant: u64,

    /// Listings that were removed or could not be found
    pub gone: u64,

    /// Listings never settled by a parse
    pub unsettled: u64,

    /// Listing count per property type
    pub by_property_type: Vec<(PropertyType, u64)>,

    /// Run duration, once finished
    pub duration_seconds: Option<u64>,
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> Result<CrawlStatistics, OutputError> {
    let latest_run = storage.get_latest_run()?.ok_or(OutputError::NoRuns)?;

    let duration_seconds = match (
        latest_run.started_at.parse::<chrono::DateTime<chrono::Utc>>(),
        latest_run
            .finished_at
            .as_deref()
            .map(str::parse::<chrono::DateTime<chrono::Utc>>),
    ) {
        (Ok(started), Some(Ok(finished))) => Some((finished - started).num_seconds().max(0) as u64),
        _ => None,
    };

    Ok(CrawlStatistics {
        total_listings: storage.count_listings()?,
        relevant: storage.count_by_relevance(Some(true))?,
        gone: storage.count_by_relevance(Some(false))?,
        unsettled: storage.count_by_relevance(None)?,
        by_property_type: storage.count_by_property_type()?,
        duration_seconds,
        latest_run,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    let run = &stats.latest_run;
    println!("Latest run #{}:", run.id);
    println!("  Status: {}", run.status.to_db_string());
    println!("  Started: {}", run.started_at);
    if let Some(finished) = &run.finished_at {
        println!("  Finished: {}", finished);
    }
    if let Some(secs) = stats.duration_seconds {
        println!("  Duration: {}s", secs);
    }
    if let Some(saved) = run.listings_saved {
        println!("  Listings saved: {}", saved);
    }
    println!();

    println!("Listings:");
    println!("  Total: {}", stats.total_listings);
    println!("  Relevant: {}", stats.relevant);
    println!("  Removed or absent: {}", stats.gone);
    if stats.unsettled > 0 {
        println!("  Not parsed: {}", stats.unsettled);
    }
    println!();

    if !stats.by_property_type.is_empty() {
        println!("By Property Type:");
        let mut counts = stats.by_property_type.clone();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        for (property_type, count) in counts {
            println!("  {}: {}", property_type, count);
        }
        println!();
    }

    let rate = if stats.total_listings > 0 {
        (stats.relevant as f64 / stats.total_listings as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "Relevance: {:.1}% ({} / {} listings still listed)",
        rate, stats.relevant, stats.total_listings
    );
}
