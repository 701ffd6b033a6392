//! Dynamic-content resolution
//!
//! Some listing data only exists after page scripts run: phone numbers are
//! revealed by a click and coordinates of some pages come from a scripted
//! lookup request. A [`DynamicResolver`] performs that work; the crawler only
//! sees its results.

mod chrome;

pub use chrome::{parse_coordinates_payload, ChromeResolver};

use async_trait::async_trait;

/// Reveals content that the static HTML does not carry
///
/// Implementations must be safe to call from many concurrent parses.
/// `Ok(None)` means the content is not available for this listing.
#[async_trait]
pub trait DynamicResolver: Send + Sync {
    /// Returns the HTML fragment holding the unmasked phone numbers
    async fn unmask_phone_numbers(&self, url: &str, html: &str) -> anyhow::Result<Option<String>>;

    /// Performs the page's location lookup and returns `[lat, lon]`
    async fn lookup_location(
        &self,
        request_url: &str,
        location_type: &str,
        location_id: &str,
    ) -> anyhow::Result<Option<[f64; 2]>>;
}

/// Resolver used when no browser is available: nothing is ever revealed
#[derive(Debug, Clone, Copy, Default)]
pub struct NullResolver;

#[async_trait]
impl DynamicResolver for NullResolver {
    async fn unmask_phone_numbers(&self, _url: &str, _html: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    async fn lookup_location(
        &self,
        _request_url: &str,
        _location_type: &str,
        _location_id: &str,
    ) -> anyhow::Result<Option<[f64; 2]>> {
        Ok(None)
    }
}
