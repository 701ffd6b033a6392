//! Crawler module for listing discovery and detail parsing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - Admission control shared by every network operation of a run
//! - Pagination fan-out over listing indexes
//! - The per-listing parse state machine
//! - Overall crawl coordination

mod coordinator;
mod debug;
mod fetcher;
mod gate;
mod listing_parser;
mod pagination;

pub use coordinator::{Coordinator, CrawlReport};
pub use debug::{DebugSink, FileDebugSink, NullDebugSink};
pub use fetcher::{
    build_http_client, is_removal_redirect, is_retryable_status, FetchError, FetchOutcome,
    Fetcher, Page, RetryPolicy,
};
pub use gate::{AdmissionGate, GateClosed, GatePermit};
pub use listing_parser::ParseOutcome;
pub use pagination::{extract_stubs, page_count_from_document, page_url, parse_page_count};

use crate::config::Config;
use crate::resolver::DynamicResolver;
use crate::CrawlError;
use indicatif::ProgressBar;
use std::sync::Arc;

/// Fetches indexes and parses listings for one crawl run
///
/// Cloning is cheap: clones share the HTTP client, the admission gate, the
/// resolver and the progress bar.
#[derive(Clone)]
pub struct Crawler {
    fetcher: Fetcher,
    gate: AdmissionGate,
    resolver: Arc<dyn DynamicResolver>,
    progress: ProgressBar,
}

impl Crawler {
    pub fn new(fetcher: Fetcher, gate: AdmissionGate, resolver: Arc<dyn DynamicResolver>) -> Self {
        Self {
            fetcher,
            gate,
            resolver,
            progress: ProgressBar::hidden(),
        }
    }

    /// Builds a crawler with its own HTTP client and gate
    pub fn from_config(
        config: &Config,
        resolver: Arc<dyn DynamicResolver>,
        debug_sink: Arc<dyn DebugSink>,
    ) -> Result<Self, CrawlError> {
        let fetcher = Fetcher::from_config(config, debug_sink)?;
        let gate = AdmissionGate::new(config.crawler.max_concurrent_requests as usize);
        Ok(Self::new(fetcher, gate, resolver))
    }

    /// Replaces the (hidden by default) progress bar
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub fn progress(&self) -> &ProgressBar {
        &self.progress
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub fn resolver(&self) -> &dyn DynamicResolver {
        self.resolver.as_ref()
    }

    /// Restarts the progress bar for a batch of `len` units
    pub(crate) fn reset_progress(&self, len: usize, message: impl Into<String>) {
        self.progress.set_length(len as u64);
        self.progress.set_position(0);
        self.progress.set_message(message.into());
    }
}
