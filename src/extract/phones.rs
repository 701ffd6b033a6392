//! Phone number resolution
//!
//! Contact numbers are masked in the static page. The dynamic-content
//! resolver reveals them and returns the HTML fragment that holds them, one
//! number per paragraph.

use crate::extract::{all_matches, text_of, ExtractError, ExtractResult};
use crate::resolver::DynamicResolver;
use scraper::Html;

/// Asks the resolver to unmask a listing's phone numbers
///
/// `html` is the already-fetched detail page, passed along as context.
pub async fn resolve_phone_numbers(
    resolver: &dyn DynamicResolver,
    url: &str,
    html: &str,
) -> ExtractResult<Option<Vec<String>>> {
    let fragment = resolver
        .unmask_phone_numbers(url, html)
        .await
        .map_err(ExtractError::Resolver)?;

    match fragment {
        Some(fragment) => parse_phone_fragment(&fragment).map(Some),
        None => Ok(None),
    }
}

/// Text of every paragraph of the fragment, in document order
pub fn parse_phone_fragment(fragment: &str) -> ExtractResult<Vec<String>> {
    let document = Html::parse_fragment(fragment);
    Ok(all_matches(&document, "p")?.into_iter().map(text_of).collect())
}
