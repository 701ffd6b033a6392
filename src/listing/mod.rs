//! Listing data model
//!
//! A [`Listing`] starts life as a stub produced by pagination (id, type, url
//! and an optional publish date) and is then filled in place by exactly one
//! detail parse.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::OnceLock;

/// Category of property an index lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyType {
    Apartment,
    Villa,
    House,
    Land,
    Office,
    Shop,
    Building,
    Chalet,
    Commercial,
    Other,
}

impl PropertyType {
    /// Converts the property type to its storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apartment => "apartment",
            Self::Villa => "villa",
            Self::House => "house",
            Self::Land => "land",
            Self::Office => "office",
            Self::Shop => "shop",
            Self::Building => "building",
            Self::Chalet => "chalet",
            Self::Commercial => "commercial",
            Self::Other => "other",
        }
    }

    /// Parses a property type from its storage representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "apartment" => Some(Self::Apartment),
            "villa" => Some(Self::Villa),
            "house" => Some(Self::House),
            "land" => Some(Self::Land),
            "office" => Some(Self::Office),
            "shop" => Some(Self::Shop),
            "building" => Some(Self::Building),
            "chalet" => Some(Self::Chalet),
            "commercial" => Some(Self::Commercial),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which detail parser handles the listings of an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListingKind {
    /// Resale listings with a sale price
    Resale,
    /// Resale listings whose plain price is a rent price
    Rent,
    /// New-development projects
    NewDevelopment,
}

impl ListingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resale => "resale",
            Self::Rent => "rent",
            Self::NewDevelopment => "new-development",
        }
    }
}

impl fmt::Display for ListingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Photo URLs of a listing
///
/// `NoPhotos` means the page asserted that the listing has no photos, which
/// is different from never having looked (`NotAttempted`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PhotoUrls {
    #[default]
    NotAttempted,
    NoPhotos,
    Urls(Vec<String>),
}

impl PhotoUrls {
    pub fn is_not_attempted(&self) -> bool {
        matches!(self, Self::NotAttempted)
    }

    /// The URL list, if the page had photos
    pub fn urls(&self) -> Option<&[String]> {
        match self {
            Self::Urls(urls) => Some(urls),
            _ => None,
        }
    }
}

impl Serialize for PhotoUrls {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Urls(urls) => urls.serialize(serializer),
            Self::NoPhotos | Self::NotAttempted => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for PhotoUrls {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<Vec<String>>::deserialize(deserializer)? {
            Some(urls) => Self::Urls(urls),
            None => Self::NoPhotos,
        })
    }
}

/// One real-estate advertisement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: i64,
    pub property_type: PropertyType,
    #[serde(default)]
    pub is_new: bool,
    pub url: String,

    /// `None` until a detail parse settles it
    #[serde(default)]
    pub relevant: Option<bool>,

    pub title: Option<String>,
    pub description: Option<String>,
    pub area: Option<i64>,
    pub floor: Option<i64>,
    pub rooms_number: Option<i64>,
    pub age: Option<i64>,

    pub price: Option<f64>,
    pub price_per_day: Option<f64>,
    pub from_price: Option<f64>,
    pub rent_price: Option<f64>,
    #[serde(default)]
    pub request_price: bool,
    pub currency: Option<String>,

    pub district: Option<String>,
    pub region: Option<String>,
    pub publish_date: Option<String>,
    pub phone_numbers: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub ad_features: Vec<String>,
    #[serde(default)]
    pub elevator: bool,
    pub location: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "PhotoUrls::is_not_attempted")]
    pub photos_urls: PhotoUrls,
}

impl Listing {
    /// Creates a stub listing with every extracted field unset
    pub fn stub(
        id: i64,
        property_type: PropertyType,
        url: impl Into<String>,
        publish_date: Option<String>,
    ) -> Self {
        Self {
            id,
            property_type,
            is_new: false,
            url: url.into(),
            relevant: None,
            title: None,
            description: None,
            area: None,
            floor: None,
            rooms_number: None,
            age: None,
            price: None,
            price_per_day: None,
            from_price: None,
            rent_price: None,
            request_price: false,
            currency: None,
            district: None,
            region: None,
            publish_date,
            phone_numbers: None,
            tags: Vec::new(),
            ad_features: Vec::new(),
            elevator: false,
            location: None,
            photos_urls: PhotoUrls::NotAttempted,
        }
    }

    /// Creates a stub from a canonical listing URL
    ///
    /// Returns `None` if the URL carries no numeric path segment.
    pub fn from_url(
        property_type: PropertyType,
        url: &str,
        publish_date: Option<String>,
    ) -> Option<Self> {
        let id = parse_listing_id(url)?;
        Some(Self::stub(id, property_type, url, publish_date))
    }

    /// Returns true once a parse has found the listing alive
    pub fn is_relevant(&self) -> bool {
        self.relevant == Some(true)
    }

    /// Number of numeric price fields that are populated
    pub fn price_fields_set(&self) -> usize {
        [
            self.price,
            self.price_per_day,
            self.from_price,
            self.rent_price,
        ]
        .iter()
        .filter(|p| p.is_some())
        .count()
    }
}

/// Extracts the listing id from the first `/<digits>/` segment of a URL
///
/// # Example
///
/// ```
/// use estate_crawler::listing::parse_listing_id;
///
/// assert_eq!(
///     parse_listing_id("https://example.com/en/12345/sunny-flat"),
///     Some(12345)
/// );
/// assert_eq!(parse_listing_id("https://example.com/en/about"), None);
/// ```
pub fn parse_listing_id(url: &str) -> Option<i64> {
    static ID_SEGMENT: OnceLock<Regex> = OnceLock::new();
    let re = ID_SEGMENT.get_or_init(|| Regex::new(r"/(\d+)/").expect("static regex"));
    re.captures(url)?.get(1)?.as_str().parse().ok()
}
