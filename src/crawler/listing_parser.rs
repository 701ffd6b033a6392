//! Per-listing parse state machine
//!
//! A parse fetches the detail page under the admission gate, settles whether
//! the listing still exists and then runs its extraction steps. Steps are
//! independent: a failing step is logged with its name and skipped.
//!
//! The parsed tree is not `Send`, so extraction runs in two phases. Phase one
//! walks the document synchronously and keeps what the network steps need;
//! phase two runs those network steps in the variant's order.

use crate::crawler::{Crawler, FetchOutcome, Page};
use crate::extract::location::{resolve_location, LocationSource};
use crate::extract::phones::resolve_phone_numbers;
use crate::extract::photos::resolve_photos;
use crate::extract::{fields, ExtractError, ExtractResult};
use crate::listing::{Listing, ListingKind};
use crate::state::ListingState;
use scraper::Html;
use tracing::{error, trace};

/// How a parse ended
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// The parse settled the listing
    Parsed {
        listing: Listing,
        /// `Removed`, `Absent` or `Extracting`: the state before `Done`
        settled_from: ListingState,
        /// Names of the extraction steps that failed
        failed_steps: Vec<&'static str>,
    },

    /// The detail page could not be fetched; the stub comes back untouched
    Failed(Listing),
}

impl ParseOutcome {
    /// Returns true if the listing counts as processed
    pub fn is_processed(&self) -> bool {
        matches!(self, Self::Parsed { .. })
    }

    pub fn listing(&self) -> &Listing {
        match self {
            Self::Parsed { listing, .. } | Self::Failed(listing) => listing,
        }
    }

    pub fn into_listing(self) -> Listing {
        match self {
            Self::Parsed { listing, .. } | Self::Failed(listing) => listing,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Variant {
    Resale { for_rent: bool },
    NewDevelopment,
}

impl Variant {
    fn document_steps(&self) -> &'static [(&'static str, DocumentStep)] {
        match self {
            Self::Resale { .. } => RESALE_STEPS,
            Self::NewDevelopment => NEW_DEVELOPMENT_STEPS,
        }
    }

    fn network_steps(&self) -> &'static [NetworkStep] {
        match self {
            Self::Resale { .. } => &[NetworkStep::Coordinates, NetworkStep::PhoneNumbers],
            Self::NewDevelopment => &[NetworkStep::PhoneNumbers, NetworkStep::Coordinates],
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Resale { .. } => "resale",
            Self::NewDevelopment => "new adv",
        }
    }
}

type DocumentStep = fn(&Html, &mut Listing, Variant) -> ExtractResult<()>;

const RESALE_STEPS: &[(&str, DocumentStep)] = &[
    ("title", resale_title),
    ("description", resale_description),
    ("price", resale_price),
    ("city", resale_region),
    ("tags", resale_tags),
    ("features", resale_features),
    ("ad features", resale_ad_features),
    ("photos urls", photos),
];

const NEW_DEVELOPMENT_STEPS: &[(&str, DocumentStep)] = &[
    ("title", new_development_title),
    ("description", new_development_description),
    ("price", new_development_price),
    ("tags", new_development_tags),
    ("location", new_development_region),
    ("photos urls", photos),
];

fn resale_title(doc: &Html, listing: &mut Listing, _: Variant) -> ExtractResult<()> {
    listing.title = Some(fields::resale_title(doc)?);
    Ok(())
}

fn resale_description(doc: &Html, listing: &mut Listing, _: Variant) -> ExtractResult<()> {
    listing.description = Some(fields::resale_description(doc)?);
    Ok(())
}

fn resale_price(doc: &Html, listing: &mut Listing, variant: Variant) -> ExtractResult<()> {
    let for_rent = matches!(variant, Variant::Resale { for_rent: true });
    fields::resale_price(doc, for_rent)?.apply(listing);
    Ok(())
}

fn resale_region(doc: &Html, listing: &mut Listing, _: Variant) -> ExtractResult<()> {
    listing.district = None;
    listing.region = Some(fields::resale_region(doc)?);
    Ok(())
}

/// Keeps every tag and every derived number even if some tags are malformed;
/// the first malformed tag is reported
fn resale_tags(doc: &Html, listing: &mut Listing, _: Variant) -> ExtractResult<()> {
    let summary = fields::resale_tags(doc)?;
    listing.tags = summary.tags;
    listing.area = summary.area.or(listing.area);
    listing.rooms_number = summary.rooms_number.or(listing.rooms_number);
    listing.floor = summary.floor.or(listing.floor);

    match summary.errors.into_iter().next() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn resale_features(doc: &Html, listing: &mut Listing, _: Variant) -> ExtractResult<()> {
    if let Some(age) = fields::resale_age(doc)? {
        listing.age = Some(age);
    }
    Ok(())
}

fn resale_ad_features(doc: &Html, listing: &mut Listing, _: Variant) -> ExtractResult<()> {
    let (features, elevator) = fields::resale_ad_features(doc)?;
    listing.ad_features = features;
    listing.elevator = elevator;
    Ok(())
}

fn new_development_title(doc: &Html, listing: &mut Listing, _: Variant) -> ExtractResult<()> {
    listing.title = Some(fields::new_development_title(doc)?);
    Ok(())
}

fn new_development_description(doc: &Html, listing: &mut Listing, _: Variant) -> ExtractResult<()> {
    listing.description = Some(fields::new_development_description(doc)?);
    Ok(())
}

fn new_development_price(doc: &Html, listing: &mut Listing, _: Variant) -> ExtractResult<()> {
    fields::new_development_price(doc)?.apply(listing);
    Ok(())
}

fn new_development_tags(doc: &Html, listing: &mut Listing, _: Variant) -> ExtractResult<()> {
    listing.tags = fields::new_development_tags(doc)?;
    Ok(())
}

fn new_development_region(doc: &Html, listing: &mut Listing, _: Variant) -> ExtractResult<()> {
    listing.district = None;
    listing.region = Some(fields::new_development_region(doc)?);
    Ok(())
}

fn photos(doc: &Html, listing: &mut Listing, _: Variant) -> ExtractResult<()> {
    listing.photos_urls = resolve_photos(doc)?;
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum NetworkStep {
    Coordinates,
    PhoneNumbers,
}

impl NetworkStep {
    fn name(&self) -> &'static str {
        match self {
            Self::Coordinates => "coords",
            Self::PhoneNumbers => "phone numbers",
        }
    }
}

/// What phase one hands to phase two
struct Pending {
    page: Page,
    location: ExtractResult<LocationSource>,
}

/// Tracks the state of one parse and validates its transitions
struct ParseTask {
    url: String,
    state: ListingState,
}

impl ParseTask {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            state: ListingState::Fetching,
        }
    }

    fn advance(&mut self, next: ListingState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        trace!("{}: {} -> {}", self.url, self.state, next);
        self.state = next;
    }
}

/// Runs every document step, then captures the coordinate source
///
/// The parsed tree lives only inside this function.
fn extract_document(
    listing: &mut Listing,
    page: Page,
    variant: Variant,
    failed: &mut Vec<&'static str>,
) -> Pending {
    let document = Html::parse_document(&page.html);

    for (name, step) in variant.document_steps() {
        if let Err(e) = step(&document, listing, variant) {
            log_step_failure(name, &listing.url, variant, &e);
            failed.push(*name);
        }
    }

    let location = LocationSource::from_document(&document, &page.url);
    Pending { page, location }
}

fn log_step_failure(step: &str, url: &str, variant: Variant, e: &ExtractError) {
    error!(
        "{} (while parsing {}) [{}] url={}",
        e,
        step,
        variant.label(),
        url
    );
}

impl Crawler {
    /// Parses one resale listing; `for_rent` stores a plain price as rent
    pub async fn parse_resale_listing(&self, stub: Listing, for_rent: bool) -> ParseOutcome {
        self.parse_listing(stub, Variant::Resale { for_rent }).await
    }

    /// Parses one new-development listing
    pub async fn parse_new_development_listing(&self, stub: Listing) -> ParseOutcome {
        self.parse_listing(stub, Variant::NewDevelopment).await
    }

    /// Parses one listing with the parser its index kind calls for
    pub async fn parse_listing_of_kind(&self, kind: ListingKind, stub: Listing) -> ParseOutcome {
        let variant = match kind {
            ListingKind::Resale => Variant::Resale { for_rent: false },
            ListingKind::Rent => Variant::Resale { for_rent: true },
            ListingKind::NewDevelopment => Variant::NewDevelopment,
        };
        self.parse_listing(stub, variant).await
    }

    async fn parse_listing(&self, mut listing: Listing, variant: Variant) -> ParseOutcome {
        let mut task = ParseTask::new(&listing.url);

        // Held for the whole parse, including the resolver calls
        let Ok(_permit) = self.gate().acquire().await else {
            return ParseOutcome::Failed(listing);
        };

        let page = match self.fetcher().fetch(&listing.url).await {
            Ok(FetchOutcome::Document(page)) => page,
            Ok(FetchOutcome::Removed { .. }) => {
                task.advance(ListingState::Removed);
                return self.settle(listing, task, Vec::new());
            }
            Ok(FetchOutcome::Absent) => {
                error!("Nothing to parse (url: {})", listing.url);
                task.advance(ListingState::Absent);
                return self.settle(listing, task, Vec::new());
            }
            Err(e) => {
                error!("{}", e);
                return ParseOutcome::Failed(listing);
            }
        };

        task.advance(ListingState::Extracting);
        listing.relevant = Some(true);
        if matches!(variant, Variant::NewDevelopment) {
            listing.is_new = true;
        }

        let mut failed = Vec::new();
        let pending = extract_document(&mut listing, page, variant, &mut failed);

        let mut location = Some(pending.location);
        for step in variant.network_steps() {
            let result = match step {
                NetworkStep::Coordinates => match location.take() {
                    Some(Ok(source)) => {
                        let resolved = resolve_location(self.resolver(), source).await;
                        resolved.map(|pair| listing.location = pair)
                    }
                    Some(Err(e)) => Err(e),
                    None => Ok(()),
                },
                NetworkStep::PhoneNumbers => {
                    let resolved =
                        resolve_phone_numbers(self.resolver(), &listing.url, &pending.page.html)
                            .await;
                    resolved.map(|numbers| listing.phone_numbers = numbers)
                }
            };

            if let Err(e) = result {
                log_step_failure(step.name(), &listing.url, variant, &e);
                failed.push(step.name());
            }
        }

        self.settle(listing, task, failed)
    }

    fn settle(
        &self,
        mut listing: Listing,
        mut task: ParseTask,
        failed_steps: Vec<&'static str>,
    ) -> ParseOutcome {
        let settled_from = task.state;
        if settled_from.is_gone() {
            listing.relevant = Some(false);
        }
        task.advance(ListingState::Done);
        self.progress().inc(1);

        ParseOutcome::Parsed {
            listing,
            settled_from,
            failed_steps,
        }
    }
}
