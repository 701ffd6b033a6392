//! Field extraction for listing detail pages
//!
//! Every extractor pulls one semantic field out of a parsed document and
//! returns its own [`ExtractResult`], so the listing parser can log a broken
//! field and carry on with the rest.
//!
//! - `fields`: title, description, price, region, tags, features
//! - `location`: inline coordinates or the lookup request for the resolver
//! - `photos`: carousel payload or an explicit "no photos" marker
//! - `phones`: phone numbers revealed by the dynamic-content resolver

pub mod fields;
pub mod location;
pub mod phones;
pub mod photos;

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// Why a single field could not be extracted
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no element matches `{selector}`")]
    MissingElement { selector: String },

    #[error("malformed {field}: {text:?}")]
    Malformed { field: &'static str, text: String },

    #[error("unrecognized page layout for {0}")]
    UnrecognizedLayout(&'static str),

    #[error("invalid selector `{0}`")]
    InvalidSelector(String),

    #[error("dynamic-content resolver failed: {0}")]
    Resolver(#[source] anyhow::Error),
}

/// Result type for field extraction
pub type ExtractResult<T> = Result<T, ExtractError>;

impl ExtractError {
    pub(crate) fn malformed(field: &'static str, text: impl Into<String>) -> Self {
        Self::Malformed {
            field,
            text: text.into(),
        }
    }
}

/// Compiles a CSS selector
pub(crate) fn selector(css: &str) -> ExtractResult<Selector> {
    Selector::parse(css).map_err(|_| ExtractError::InvalidSelector(css.to_string()))
}

/// Returns the first element matching `css`
pub(crate) fn first_match<'a>(document: &'a Html, css: &str) -> ExtractResult<ElementRef<'a>> {
    let sel = selector(css)?;
    document
        .select(&sel)
        .next()
        .ok_or_else(|| ExtractError::MissingElement {
            selector: css.to_string(),
        })
}

/// Returns every element matching `css`, in document order
pub(crate) fn all_matches<'a>(document: &'a Html, css: &str) -> ExtractResult<Vec<ElementRef<'a>>> {
    let sel = selector(css)?;
    Ok(document.select(&sel).collect())
}

/// Text of an element: trimmed text nodes joined by single spaces
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    text_joined(element, " ")
}

/// Trimmed, non-empty text nodes of an element joined by `separator`
pub(crate) fn text_joined(element: ElementRef<'_>, separator: &str) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}
