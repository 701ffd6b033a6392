//! Photo URL resolution
//!
//! A detail page shows either a photo carousel whose `pics` attribute holds a
//! JSON payload, or one of two "no photo" markers. Any other shape means the
//! page layout changed and is reported as an error rather than as "no photos".

use crate::extract::{first_match, ExtractError, ExtractResult};
use crate::listing::PhotoUrls;
use scraper::Html;
use serde::Deserialize;
use serde_json::Value;

const CAROUSEL: &str = r#"div[class="flipsnap noRtl"]"#;
const NO_PHOTO_IMAGE: &str = r#"img[alt="No Photo"]"#;
const NO_PHOTO_CONTAINER: &str = r#"div[class*="noPhoto"]"#;

/// One entry of the carousel payload
#[derive(Debug, Clone, Deserialize)]
pub struct CarouselEntry {
    pub photo: Photo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Photo {
    pub url: String,
    #[serde(default)]
    pub extension: Option<String>,
    /// Numeric or string, depending on the page
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, rename = "mainPicture")]
    pub is_main: bool,
}

/// Resolves the photo URLs of a detail page
pub fn resolve_photos(document: &Html) -> ExtractResult<PhotoUrls> {
    if let Ok(carousel) = first_match(document, CAROUSEL) {
        let payload = carousel
            .value()
            .attr("pics")
            .ok_or_else(|| ExtractError::malformed("photos", "carousel without pics"))?;
        return parse_carousel(payload).map(PhotoUrls::Urls);
    }

    if first_match(document, NO_PHOTO_IMAGE).is_ok()
        || first_match(document, NO_PHOTO_CONTAINER).is_ok()
    {
        return Ok(PhotoUrls::NoPhotos);
    }

    Err(ExtractError::UnrecognizedLayout("photos"))
}

/// Decodes the carousel payload into photo URLs, in carousel order
pub fn parse_carousel(payload: &str) -> ExtractResult<Vec<String>> {
    let entries: Vec<CarouselEntry> =
        serde_json::from_str(payload).map_err(|_| ExtractError::malformed("photos", payload))?;
    Ok(entries.into_iter().map(|e| e.photo.url).collect())
}
