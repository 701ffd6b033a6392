//! Coordinate resolution
//!
//! Most detail pages carry the map position inline. Pages that do not embed
//! the parameters of a lookup request instead, which only the
//! dynamic-content resolver can answer.

use crate::extract::{first_match, ExtractError, ExtractResult};
use crate::resolver::DynamicResolver;
use scraper::Html;
use url::Url;

const MAP_HOLDER: &str = r#"div[class="prop-map-holder"]"#;
const LOOKUP_URL_INPUT: &str = "input#locDataUrlHidden";
const LOOKUP_TYPE_INPUT: &str = "input#locationType";
const LOOKUP_ID_INPUT: &str = "input#locationId";

/// Where a listing's coordinates come from
#[derive(Debug, Clone, PartialEq)]
pub enum LocationSource {
    /// `[lat, lon]` read from the page
    Inline([f64; 2]),
    /// Parameters for the resolver's location lookup
    Lookup {
        request_url: String,
        location_type: String,
        location_id: String,
    },
}

impl LocationSource {
    /// Finds the coordinate source of a detail page
    ///
    /// Inline `lat`/`lon` attributes win whenever both parse as floats. A
    /// relative lookup URL is resolved against `page_url`.
    pub fn from_document(document: &Html, page_url: &str) -> ExtractResult<Self> {
        if let Some(pair) = inline_coordinates(document) {
            return Ok(Self::Inline(pair));
        }

        let raw = input_value(document, LOOKUP_URL_INPUT)?;
        let request_url = Url::parse(page_url)
            .and_then(|base| base.join(&raw))
            .map_err(|_| ExtractError::malformed("location lookup", raw.as_str()))?;

        Ok(Self::Lookup {
            request_url: request_url.to_string(),
            location_type: input_value(document, LOOKUP_TYPE_INPUT)?,
            location_id: input_value(document, LOOKUP_ID_INPUT)?,
        })
    }
}

fn inline_coordinates(document: &Html) -> Option<[f64; 2]> {
    let holder = first_match(document, MAP_HOLDER).ok()?;
    let lat = holder.value().attr("lat")?.trim().parse().ok()?;
    let lon = holder.value().attr("lon")?.trim().parse().ok()?;
    Some([lat, lon])
}

fn input_value(document: &Html, css: &str) -> ExtractResult<String> {
    first_match(document, css)?
        .value()
        .attr("value")
        .map(str::to_string)
        .ok_or_else(|| ExtractError::malformed("location lookup", css))
}

/// Resolves a coordinate source to `[lat, lon]`
///
/// Inline coordinates are returned without I/O; lookups go to the resolver,
/// whose `None` is passed through.
pub async fn resolve_location(
    resolver: &dyn DynamicResolver,
    source: LocationSource,
) -> ExtractResult<Option<[f64; 2]>> {
    match source {
        LocationSource::Inline(pair) => Ok(Some(pair)),
        LocationSource::Lookup {
            request_url,
            location_type,
            location_id,
        } => resolver
            .lookup_location(&request_url, &location_type, &location_id)
            .await
            .map_err(ExtractError::Resolver),
    }
}
