use crate::config::types::{BrowserConfig, Config, CrawlerConfig, IndexEntry, OutputConfig};
use crate::ConfigError;
use reqwest::header::{HeaderName, HeaderValue};
use scraper::Selector;
use std::collections::BTreeMap;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_headers(&config.headers)?;
    validate_output_config(&config.output)?;
    validate_browser_config(&config.browser)?;
    validate_indexes(&config.indexes)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_requests must be between 1 and 100, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.backoff_base_ms > config.backoff_max_ms {
        return Err(ConfigError::Validation(format!(
            "backoff_base_ms ({}) cannot exceed backoff_max_ms ({})",
            config.backoff_base_ms, config.backoff_max_ms
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.removed_marker.is_empty() || config.removed_marker.contains('/') {
        return Err(ConfigError::Validation(format!(
            "removed_marker must be a single non-empty path segment, got '{}'",
            config.removed_marker
        )));
    }

    Ok(())
}

/// Validates that every header can be sent as-is
fn validate_headers(headers: &BTreeMap<String, String>) -> Result<(), ConfigError> {
    for (name, value) in headers {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::InvalidHeader(format!("bad header name '{}'", name)))?;
        HeaderValue::from_str(value)
            .map_err(|_| ConfigError::InvalidHeader(format!("bad value for header '{}'", name)))?;
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if matches!(&config.json_path, Some(p) if p.is_empty()) {
        return Err(ConfigError::Validation(
            "json_path cannot be empty when set".to_string(),
        ));
    }

    if config.debug_dir.is_empty() {
        return Err(ConfigError::Validation(
            "debug_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates that the browser selectors are usable CSS
///
/// Checked even when the browser is disabled, so enabling it later cannot
/// turn up a broken selector mid-run.
fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    for (key, css) in [
        ("phone_button_selector", &config.phone_button_selector),
        ("phone_container_selector", &config.phone_container_selector),
    ] {
        if Selector::parse(css).is_err() {
            return Err(ConfigError::Validation(format!(
                "{} is not a valid CSS selector: '{}'",
                key, css
            )));
        }
    }
    Ok(())
}

/// Validates index entries
fn validate_indexes(indexes: &[IndexEntry]) -> Result<(), ConfigError> {
    for entry in indexes {
        let url = Url::parse(&entry.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid index URL '{}': {}", entry.url, e))
        })?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(ConfigError::Validation(format!(
                "Index URL '{}' must use http or https",
                entry.url
            )));
        }
    }

    Ok(())
}
