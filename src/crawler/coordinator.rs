//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that coordinates one run:
//! - Recording the run in storage
//! - Walking every configured index and collecting stub listings
//! - Parsing all stubs of an index concurrently under the shared gate
//! - Persisting settled listings and exporting them

use crate::config::Config;
use crate::crawler::{AdmissionGate, Crawler, DebugSink, ParseOutcome};
use crate::output::write_listings_json;
use crate::resolver::DynamicResolver;
use crate::storage::{RunStatus, Storage};
use crate::CrawlError;
use futures::future::join_all;
use indicatif::ProgressBar;
use std::path::Path;
use std::sync::Arc;

/// Totals of one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub run_id: i64,
    /// Indexes walked
    pub indexes: usize,
    /// Stub listings found across all index pages
    pub stubs: usize,
    /// Listings settled by a parse, including gone ones
    pub parsed: usize,
    /// Parsed listings that were removed or absent
    pub removed: usize,
    /// Listings whose detail page could not be fetched
    pub failed: usize,
    /// Extraction steps that failed across all parsed listings
    pub failed_steps: usize,
    /// Highest number of network operations in flight at once
    pub peak_in_flight: usize,
    /// The gate was closed before every index was walked
    pub interrupted: bool,
}

/// Main crawler coordinator structure
pub struct Coordinator<S: Storage> {
    config: Arc<Config>,
    config_hash: String,
    crawler: Crawler,
    storage: S,
}

impl<S: Storage> Coordinator<S> {
    /// Creates a new coordinator instance
    ///
    /// Builds the HTTP client and the admission gate for this run.
    pub fn new(
        config: Config,
        config_hash: impl Into<String>,
        resolver: Arc<dyn DynamicResolver>,
        debug_sink: Arc<dyn DebugSink>,
        storage: S,
    ) -> Result<Self, CrawlError> {
        let crawler = Crawler::from_config(&config, resolver, debug_sink)?;

        Ok(Self {
            config: Arc::new(config),
            config_hash: config_hash.into(),
            crawler,
            storage,
        })
    }

    /// Shows progress on `progress` instead of a hidden bar
    pub fn set_progress(&mut self, progress: ProgressBar) {
        self.crawler = self.crawler.clone().with_progress(progress);
    }

    /// The gate shared by every network operation of the run
    ///
    /// Closing it stops the run from admitting new work.
    pub fn gate(&self) -> &AdmissionGate {
        self.crawler.gate()
    }

    pub fn crawler(&self) -> &Crawler {
        &self.crawler
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Runs the crawl
    ///
    /// The run is marked completed on success, interrupted if the gate was
    /// closed along the way and failed if an error propagates. Per-listing
    /// failures never propagate.
    pub async fn run(&mut self) -> Result<CrawlReport, CrawlError> {
        let run_id = self.storage.create_run(&self.config_hash)?;
        tracing::info!("Starting crawl run {}", run_id);
        let start_time = std::time::Instant::now();

        match self.crawl_indexes(run_id).await {
            Ok(report) => {
                let status = if report.interrupted {
                    RunStatus::Interrupted
                } else {
                    RunStatus::Completed
                };
                self.storage.finish_run(run_id, status)?;
                self.crawler.progress().finish_and_clear();
                tracing::info!(
                    "Crawl completed: {} listings parsed ({} gone, {} failed) in {:?}",
                    report.parsed,
                    report.removed,
                    report.failed,
                    start_time.elapsed()
                );
                Ok(report)
            }
            Err(e) => {
                if let Err(storage_err) = self.storage.finish_run(run_id, RunStatus::Failed) {
                    tracing::warn!("Failed to mark run {} as failed: {}", run_id, storage_err);
                }
                Err(e)
            }
        }
    }

    async fn crawl_indexes(&mut self, run_id: i64) -> Result<CrawlReport, CrawlError> {
        let config = Arc::clone(&self.config);
        let mut report = CrawlReport {
            run_id,
            ..CrawlReport::default()
        };
        let mut finished = Vec::new();

        for index in &config.indexes {
            if self.gate().is_closed() {
                tracing::warn!("Crawl interrupted, skipping remaining indexes");
                break;
            }

            let stubs = self.crawler.crawl_index(index.property_type, &index.url).await;
            report.indexes += 1;
            report.stubs += stubs.len();
            if stubs.is_empty() {
                continue;
            }

            tracing::info!("Parsing {} {} listings", stubs.len(), index.kind);
            self.crawler
                .reset_progress(stubs.len(), format!("{} listings", index.property_type));

            let crawler = &self.crawler;
            let outcomes = join_all(
                stubs
                    .into_iter()
                    .map(|stub| crawler.parse_listing_of_kind(index.kind, stub)),
            )
            .await;

            let mut settled = Vec::with_capacity(outcomes.len());
            for outcome in outcomes {
                match outcome {
                    ParseOutcome::Parsed {
                        listing,
                        settled_from,
                        failed_steps,
                    } => {
                        report.parsed += 1;
                        report.failed_steps += failed_steps.len();
                        if settled_from.is_gone() {
                            report.removed += 1;
                        }
                        settled.push(listing);
                    }
                    ParseOutcome::Failed(listing) => {
                        tracing::debug!("Not saving unparsed listing {}", listing.id);
                        report.failed += 1;
                    }
                }
            }

            self.storage.save_listings(run_id, &settled)?;
            finished.extend(settled);
        }

        report.peak_in_flight = self.gate().peak_in_flight();
        report.interrupted = self.gate().is_closed();

        if let Some(path) = &config.output.json_path {
            write_listings_json(Path::new(path), &finished)?;
        }

        Ok(report)
    }
}
