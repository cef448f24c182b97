//! Configuration validation rules

use crate::config::types::Config;
use crate::ConfigError;

/// Validates a parsed configuration
///
/// Checks that URLs are present and well-formed enough to use, and that all
/// numeric knobs are in their working ranges.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if !config.source.base_url.starts_with("http") {
        return Err(ConfigError::Validation(format!(
            "source.base-url must be an http(s) URL, got '{}'",
            config.source.base_url
        )));
    }

    if !config.source.token_url.starts_with("http") {
        return Err(ConfigError::Validation(format!(
            "source.token-url must be an http(s) URL, got '{}'",
            config.source.token_url
        )));
    }

    if !config.source.search_path.starts_with('/') {
        return Err(ConfigError::Validation(
            "source.search-path must start with '/'".to_string(),
        ));
    }

    if !config.source.consult_path.starts_with('/') {
        return Err(ConfigError::Validation(
            "source.consult-path must start with '/'".to_string(),
        ));
    }

    if config.source.requests_per_minute == 0 {
        return Err(ConfigError::Validation(
            "source.requests-per-minute must be greater than 0".to_string(),
        ));
    }

    if config.source.timeout_seconds == 0 {
        return Err(ConfigError::Validation(
            "source.timeout-seconds must be greater than 0".to_string(),
        ));
    }

    if config.crawl.page_size == 0 {
        return Err(ConfigError::Validation(
            "crawl.page-size must be greater than 0".to_string(),
        ));
    }

    if config.storage.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "storage.database-path must not be empty".to_string(),
        ));
    }

    if config.schema.path.is_empty() {
        return Err(ConfigError::Validation(
            "schema.path must not be empty".to_string(),
        ));
    }

    Ok(())
}
