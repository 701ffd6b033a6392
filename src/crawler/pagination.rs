//! Pagination over listing indexes
//!
//! An index shows its page count in a summary line ("1 - 25 of 240"). Every
//! page is fetched concurrently under the admission gate and its entries are
//! turned into stub listings.

use crate::crawler::{Crawler, FetchOutcome};
use crate::extract::{all_matches, first_match, text_of};
use crate::listing::{Listing, PropertyType};
use futures::future::join_all;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, error, info, warn};

const PAGE_SUMMARY: &str = r#"p[class="fSize11 centered"]"#;
const STANDARD_ENTRY: &str = r#"li[class="listingBox w100"]"#;
const PROMOTED_ENTRY: &str = r#"li[class="promotionListing listingBox w100"]"#;
const PUBLISH_DATE: &str = r#"span[class="listingDetails iconPadR"]"#;

/// URL of page `n` of an index
pub fn page_url(index_url: &str, n: usize) -> String {
    format!("{}:p:{}", index_url, n)
}

/// Page count from the summary text: the last integer after the final `-`
///
/// # Example
///
/// ```
/// use estate_crawler::crawler::parse_page_count;
///
/// assert_eq!(parse_page_count("1 - 25 of 240"), 240);
/// assert_eq!(parse_page_count("1 - 12"), 12);
/// assert_eq!(parse_page_count("Results"), 0);
/// ```
pub fn parse_page_count(text: &str) -> usize {
    text.rsplit('-')
        .next()
        .and_then(|tail| {
            tail.split_whitespace()
                .filter_map(|t| t.replace(',', "").parse::<usize>().ok())
                .last()
        })
        .unwrap_or(0)
}

/// Page count of a fetched index page; 0 without a summary line
pub fn page_count_from_document(html: &str) -> usize {
    let document = Html::parse_document(html);
    match first_match(&document, PAGE_SUMMARY) {
        Ok(summary) => parse_page_count(&text_of(summary)),
        Err(_) => 0,
    }
}

/// Stub listings of one index page
///
/// Standard entries are used when present, promoted entries otherwise. Only
/// standard entries carry a publish date.
pub fn extract_stubs(property_type: PropertyType, html: &str) -> Vec<Listing> {
    let document = Html::parse_document(html);

    let standard = all_matches(&document, STANDARD_ENTRY).unwrap_or_default();
    if !standard.is_empty() {
        let date = Selector::parse(PUBLISH_DATE).ok();
        return standard
            .into_iter()
            .filter_map(|entry| {
                let publish_date = date
                    .as_ref()
                    .and_then(|sel| entry.select(sel).next())
                    .map(text_of);
                stub_from_entry(property_type, entry, publish_date)
            })
            .collect();
    }

    all_matches(&document, PROMOTED_ENTRY)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|entry| stub_from_entry(property_type, entry, None))
        .collect()
}

fn stub_from_entry(
    property_type: PropertyType,
    entry: ElementRef<'_>,
    publish_date: Option<String>,
) -> Option<Listing> {
    let Some(linkref) = entry.value().attr("linkref") else {
        warn!("Index entry without linkref skipped");
        return None;
    };

    let stub = Listing::from_url(property_type, linkref, publish_date);
    if stub.is_none() {
        warn!("Index entry with non-numeric linkref skipped: {}", linkref);
    }
    stub
}

impl Crawler {
    /// Number of pages of an index; 0 if it cannot be determined
    pub async fn count_pages(&self, index_url: &str) -> usize {
        let Ok(_permit) = self.gate().acquire().await else {
            return 0;
        };

        match self.fetcher().fetch(index_url).await {
            Ok(FetchOutcome::Document(page)) => page_count_from_document(&page.html),
            Ok(_) => {
                warn!("No index page at {}", index_url);
                0
            }
            Err(e) => {
                error!("{}", e);
                0
            }
        }
    }

    /// Every stub listing of an index, across all of its pages
    ///
    /// Order across pages is unspecified.
    pub async fn crawl_index(&self, property_type: PropertyType, index_url: &str) -> Vec<Listing> {
        info!("Collecting listing pages from {}", index_url);

        let total = self.count_pages(index_url).await;
        if total == 0 {
            info!("{} has no pages", index_url);
            return Vec::new();
        }

        self.reset_progress(total, format!("{} pages", property_type));

        let pages = (1..=total).map(|n| self.crawl_page(property_type, page_url(index_url, n)));
        let stubs: Vec<Listing> = join_all(pages).await.into_iter().flatten().collect();

        info!("Found {} listings on {} pages of {}", stubs.len(), total, index_url);
        stubs
    }

    async fn crawl_page(&self, property_type: PropertyType, url: String) -> Vec<Listing> {
        let Ok(_permit) = self.gate().acquire().await else {
            debug!("Gate closed, skipping {}", url);
            return Vec::new();
        };

        let outcome = self.fetcher().fetch(&url).await;
        self.progress().inc(1);

        match outcome {
            Ok(FetchOutcome::Document(page)) => extract_stubs(property_type, &page.html),
            Ok(_) => Vec::new(),
            Err(e) => {
                error!("{}", e);
                Vec::new()
            }
        }
    }
}
