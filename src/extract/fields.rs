//! Document-local field extractors
//!
//! The `parse_*` functions work on plain text and carry the site's textual
//! conventions (price phrasing, tag suffixes, age phrases). The document
//! functions locate the element for a field and hand its text to them.

use crate::extract::{all_matches, first_match, text_joined, text_of, ExtractError, ExtractResult};
use crate::listing::Listing;
use scraper::Html;

/// CSS selectors for the fields of a detail page
pub mod selectors {
    pub const RESALE_TITLE: &str = "h1";
    pub const RESALE_DESCRIPTION: &str = r#"div[class*="blockProp"] > p"#;
    pub const RESALE_PRICE: &str = r#"div[class="mainInfoProp"] h3[class="orangeTit"]"#;
    pub const RESALE_REGION: &str = r#"div[class*="adBreadBlock"] > div > div > a:nth-of-type(2)"#;
    pub const RESALE_TAGS: &str = r#"div[class*="adDetails"] > div > span"#;
    pub const RESALE_FEATURES: &str =
        r#"div[class*="adFeatures"] > div > div:nth-of-type(2) > p:nth-of-type(2)"#;
    pub const RESALE_AD_FEATURES: &str = r#"div[class*="adFeatures"] > div > span"#;

    pub const NEW_TITLE: &str = r#"h1[class="SpremiumH2"]"#;
    pub const NEW_DESCRIPTION: &str = r#"p[class="changeDescrip"]"#;
    pub const NEW_PRICE: &str = r#"h2[class="SpremiumH2 orangeText"]"#;
    pub const NEW_TAGS: &str = r#"p[class="immoBadge"]"#;
    pub const NEW_REGION: &str = r#"div[class*="adBreadBlock"] > div > div > a:nth-of-type(3)"#;
}

/// One pricing representation of a listing
#[derive(Debug, Clone, PartialEq)]
pub enum Price {
    /// "Price on request": no numeric price is published
    OnRequest,
    Sale { amount: f64, currency: Option<String> },
    Rent { amount: f64, currency: Option<String> },
    PerDay { amount: f64, currency: Option<String> },
    From { amount: f64, currency: Option<String> },
}

impl Price {
    /// Writes this price into the listing's pricing fields
    pub fn apply(self, listing: &mut Listing) {
        let currency = match self {
            Price::OnRequest => {
                listing.request_price = true;
                return;
            }
            Price::Sale { amount, currency } => {
                listing.price = Some(amount);
                currency
            }
            Price::Rent { amount, currency } => {
                listing.rent_price = Some(amount);
                currency
            }
            Price::PerDay { amount, currency } => {
                listing.price_per_day = Some(amount);
                currency
            }
            Price::From { amount, currency } => {
                listing.from_price = Some(amount);
                currency
            }
        };
        if currency.is_some() {
            listing.currency = currency;
        }
    }
}

/// A numeric fact carried by a resale tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFact {
    Area(i64),
    Rooms(i64),
    Floor(i64),
}

/// Tags of a resale listing and the numbers derived from them
#[derive(Debug, Default)]
pub struct TagSummary {
    pub tags: Vec<String>,
    pub area: Option<i64>,
    pub rooms_number: Option<i64>,
    pub floor: Option<i64>,
    /// Tags that looked numeric but did not parse
    pub errors: Vec<ExtractError>,
}

fn parse_int(field: &'static str, token: &str) -> ExtractResult<i64> {
    token
        .replace(',', "")
        .parse()
        .map_err(|_| ExtractError::malformed(field, token))
}

fn parse_amount(field: &'static str, token: &str) -> ExtractResult<f64> {
    token
        .replace(',', "")
        .parse()
        .map_err(|_| ExtractError::malformed(field, token))
}

fn first_token<'a>(field: &'static str, text: &'a str) -> ExtractResult<&'a str> {
    text.split_whitespace()
        .next()
        .ok_or_else(|| ExtractError::malformed(field, text))
}

/// Parses the price line of a resale listing
///
/// `"1,250,000 USD"` is a sale price (a rent price in for-rent mode),
/// `"90 USD per day"` a daily price and `"Price on request"` sets the
/// request flag only. The currency is everything after the number, so a
/// daily price keeps its `"per day"` suffix.
pub fn parse_resale_price(text: &str, for_rent: bool) -> ExtractResult<Price> {
    if text.contains("Price on request") {
        return Ok(Price::OnRequest);
    }

    let (number, rest) = text
        .trim()
        .split_once(char::is_whitespace)
        .ok_or_else(|| ExtractError::malformed("price", text))?;
    let amount = parse_amount("price", number)?;

    let per_day = text.contains("per day");
    let currency = Some(rest.trim().to_string()).filter(|c| !c.is_empty());

    Ok(if per_day {
        Price::PerDay { amount, currency }
    } else if for_rent {
        Price::Rent { amount, currency }
    } else {
        Price::Sale { amount, currency }
    })
}

/// Parses the combined price line of a new-development listing
///
/// Forms: `"From 150,000 USD"`, `"Price on request"`, `"200,000 USD"`.
pub fn parse_new_development_price(text: &str) -> ExtractResult<Price> {
    let normalized = text.to_lowercase().replace(',', "");
    let tokens: Vec<&str> = normalized.split_whitespace().collect();

    if normalized.contains("from") {
        let number = tokens
            .get(1)
            .ok_or_else(|| ExtractError::malformed("price", text))?;
        let amount = parse_amount("price", number)?;
        let currency = tokens
            .last()
            .filter(|_| tokens.len() > 2)
            .map(|c| c.to_string());
        Ok(Price::From { amount, currency })
    } else if normalized.contains("request") {
        Ok(Price::OnRequest)
    } else {
        let amount = parse_amount("price", first_token("price", &normalized)?)?;
        Ok(Price::Sale {
            amount,
            currency: None,
        })
    }
}

/// Derives a numeric fact from one lowercase resale tag
///
/// `"85 m²"` is an area, `"3 rooms"` / `"1 room"` a room count and `"12th"`
/// a floor. Other tags carry no fact.
pub fn derive_tag_fact(tag: &str) -> ExtractResult<Option<TagFact>> {
    if tag.ends_with("m²") {
        parse_int("area", first_token("area", tag)?).map(|n| Some(TagFact::Area(n)))
    } else if tag.contains(" room") || tag.ends_with("rooms") {
        parse_int("rooms", first_token("rooms", tag)?).map(|n| Some(TagFact::Rooms(n)))
    } else if tag.ends_with("th") {
        let label = first_token("floor", tag)?;
        let digits = label.trim_end_matches(|c: char| c.is_ascii_alphabetic());
        parse_int("floor", digits)
            .map_err(|_| ExtractError::malformed("floor", tag))
            .map(|n| Some(TagFact::Floor(n)))
    } else {
        Ok(None)
    }
}

/// Derives the building age from a feature phrase
///
/// Only phrases mentioning "year" count. In priority order:
/// `"less than 1 year"` → 1, `"over 100 years old"` → 100,
/// `"5-10 years old"` → 10 (upper bound), `"7 years"` → 7.
pub fn parse_age(text: &str) -> ExtractResult<Option<i64>> {
    let text = text.to_lowercase();
    if !text.contains("year") {
        return Ok(None);
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();
    let malformed = || ExtractError::malformed("age", text.as_str());

    let number = if text.contains("less than") {
        tokens.len().checked_sub(2).map(|i| tokens[i]).ok_or_else(malformed)?
    } else if text.contains("over") {
        tokens.get(1).copied().ok_or_else(malformed)?
    } else if text.contains('-') {
        let range = tokens.first().ok_or_else(malformed)?;
        range.rsplit('-').next().ok_or_else(malformed)?
    } else {
        tokens.first().copied().ok_or_else(malformed)?
    };

    parse_int("age", number).map(Some)
}

// ===== Resale detail page =====

pub fn resale_title(document: &Html) -> ExtractResult<String> {
    Ok(text_of(first_match(document, selectors::RESALE_TITLE)?))
}

pub fn resale_description(document: &Html) -> ExtractResult<String> {
    Ok(text_joined(
        first_match(document, selectors::RESALE_DESCRIPTION)?,
        "\n\n",
    ))
}

pub fn resale_price(document: &Html, for_rent: bool) -> ExtractResult<Price> {
    let text = text_of(first_match(document, selectors::RESALE_PRICE)?);
    parse_resale_price(&text, for_rent)
}

/// City from the breadcrumb, e.g. "Properties Beirut" → "Beirut"
///
/// Positional heuristic; it breaks if the breadcrumb wording changes.
pub fn resale_region(document: &Html) -> ExtractResult<String> {
    let text = text_of(first_match(document, selectors::RESALE_REGION)?);
    text.split(' ')
        .nth(1)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ExtractError::malformed("region", text.as_str()))
}

/// Lowercase tags plus area / rooms / floor derived from them
pub fn resale_tags(document: &Html) -> ExtractResult<TagSummary> {
    let mut summary = TagSummary::default();

    for span in all_matches(document, selectors::RESALE_TAGS)? {
        let tag = text_of(span).to_lowercase();
        match derive_tag_fact(&tag) {
            Ok(Some(TagFact::Area(n))) => summary.area = Some(n),
            Ok(Some(TagFact::Rooms(n))) => summary.rooms_number = Some(n),
            Ok(Some(TagFact::Floor(n))) => summary.floor = Some(n),
            Ok(None) => {}
            Err(e) => summary.errors.push(e),
        }
        summary.tags.push(tag);
    }

    Ok(summary)
}

/// Building age from the feature list; the last phrase mentioning years wins
pub fn resale_age(document: &Html) -> ExtractResult<Option<i64>> {
    let mut age = None;
    for p in all_matches(document, selectors::RESALE_FEATURES)? {
        if let Some(years) = parse_age(&text_of(p))? {
            age = Some(years);
        }
    }
    Ok(age)
}

/// Advertised features and whether one of them is an elevator
pub fn resale_ad_features(document: &Html) -> ExtractResult<(Vec<String>, bool)> {
    let features: Vec<String> = all_matches(document, selectors::RESALE_AD_FEATURES)?
        .into_iter()
        .map(text_of)
        .collect();
    let elevator = features.iter().any(|f| f.eq_ignore_ascii_case("elevator"));
    Ok((features, elevator))
}

// ===== New-development detail page =====

pub fn new_development_title(document: &Html) -> ExtractResult<String> {
    Ok(text_of(first_match(document, selectors::NEW_TITLE)?))
}

pub fn new_development_description(document: &Html) -> ExtractResult<String> {
    Ok(text_joined(
        first_match(document, selectors::NEW_DESCRIPTION)?,
        "\n\n",
    ))
}

pub fn new_development_price(document: &Html) -> ExtractResult<Price> {
    let text = text_of(first_match(document, selectors::NEW_PRICE)?);
    parse_new_development_price(&text)
}

/// Badge tags, verbatim
pub fn new_development_tags(document: &Html) -> ExtractResult<Vec<String>> {
    Ok(all_matches(document, selectors::NEW_TAGS)?
        .into_iter()
        .map(text_of)
        .collect())
}

/// City from the breadcrumb, e.g. "New homes Beirut" → "Beirut"
pub fn new_development_region(document: &Html) -> ExtractResult<String> {
    let text = text_of(first_match(document, selectors::NEW_REGION)?);
    text.split_whitespace()
        .last()
        .map(str::to_string)
        .ok_or_else(|| ExtractError::malformed("region", text.as_str()))
}
