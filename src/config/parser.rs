use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use estate_crawler::config::load_config;
///
/// let config = load_config(Path::new("crawler.toml")).unwrap();
/// println!("Indexes to crawl: {}", config.indexes.len());
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a hex-encoded SHA-256 hash of the configuration file content
///
/// Every crawl run records this hash, so stored listings can be traced back
/// to the configuration that produced them.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(hash_content(&content))
}

/// Loads a configuration and returns both the config and its hash
///
/// The file is read once, so the hash always matches the parsed content.
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, hash_content(&content)))
}

fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::{ListingKind, PropertyType};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[crawler]
max-concurrent-requests = 20
max-attempts = 5

[headers]
"User-Agent" = "Mozilla/5.0 (Linux; Android 10)"
"Accept-Language" = "en-US,en;q=0.9"

[output]
database-path = "./test.db"
json-path = "./listings.json"

[browser]
enabled = false

[[index]]
property-type = "apartment"
kind = "resale"
url = "https://site.test/en/buy/apartments"

[[index]]
property-type = "villa"
kind = "new-development"
url = "https://site.test/en/new-homes/villas"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.max_concurrent_requests, 20);
        assert_eq!(config.crawler.max_attempts, 5);
        // Unset keys fall back to defaults
        assert_eq!(config.crawler.backoff_max_ms, 30_000);
        assert_eq!(config.crawler.removed_marker, "sd");
        assert_eq!(config.headers.len(), 2);
        assert_eq!(config.output.json_path.as_deref(), Some("./listings.json"));
        assert_eq!(config.output.debug_dir, "debug");
        assert!(!config.browser.enabled);
        assert_eq!(config.indexes.len(), 2);
        assert_eq!(config.indexes[1].kind, ListingKind::NewDevelopment);
        assert_eq!(config.indexes[1].property_type, PropertyType::Villa);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let config_content = "this is not valid TOML {{{";
        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[crawler]
max-concurrent-requests = 0

[output]
database-path = "./test.db"
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_config_rejects_unknown_property_type() {
        let config_content = r#"
[output]
database-path = "./test.db"

[[index]]
property-type = "castle"
kind = "resale"
url = "https://site.test/en/buy/castles"
"#;

        let file = create_temp_config(config_content);
        assert!(matches!(
            load_config(file.path()).unwrap_err(),
            ConfigError::Parse(_)
        ));
    }

    #[test]
    fn test_parse_config_rejects_bad_browser_selector() {
        let config_content = r#"
[output]
database-path = "./test.db"

[browser]
phone-button-selector = "[["
"#;

        assert!(matches!(
            parse_config(config_content).unwrap_err(),
            ConfigError::Validation(msg) if msg.contains("phone_button_selector")
        ));
    }

    #[test]
    fn test_compute_config_hash() {
        let config_content = "test content";
        let file = create_temp_config(config_content);

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        // Same content should produce same hash
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64); // SHA-256 produces 64 hex characters
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_load_with_hash_matches_file_hash() {
        let file = create_temp_config(
            r#"
[output]
database-path = "./test.db"
"#,
        );
        let (config, hash) = load_config_with_hash(file.path()).unwrap();
        assert!(config.indexes.is_empty());
        assert_eq!(hash, compute_config_hash(file.path()).unwrap());
    }
}
