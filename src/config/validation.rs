use crate::config::types::{
    Config, DiscoveryConfig, ExtractionConfig, IndexingConfig, ProfilingConfig, QueueConfig,
    RelevanceRule, StorageConfig, TechnologySignature,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_discovery_config(&config.discovery)?;
    validate_extraction_config(&config.extraction)?;
    validate_profiling_config(&config.profiling)?;
    validate_queue_config(&config.queue)?;
    validate_storage_config(&config.storage)?;
    validate_indexing_config(&config.indexing)?;
    validate_relevance_rules(&config.relevance)?;
    Ok(())
}

fn validate_discovery_config(config: &DiscoveryConfig) -> Result<(), ConfigError> {
    validate_http_url("discovery.base-url", &config.base_url)?;

    if config.max_page_attempts < 1 || config.max_page_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max_page_attempts must be between 1 and 10, got {}",
            config.max_page_attempts
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "discovery request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.fast_timeout_secs == 0 || config.browser_timeout_secs == 0 {
        return Err(ConfigError::Validation(format!(
            "extraction timeouts must be >= 1s, got fast={}s browser={}s",
            config.fast_timeout_secs, config.browser_timeout_secs
        )));
    }

    for status in &config.blocking_statuses {
        if !(400..=599).contains(status) {
            return Err(ConfigError::Validation(format!(
                "blocking status {} is not an HTTP error status",
                status
            )));
        }
    }

    Ok(())
}

fn validate_profiling_config(config: &ProfilingConfig) -> Result<(), ConfigError> {
    validate_http_url("profiling.pagespeed-url", &config.pagespeed_url)?;

    if config.strategy != "mobile" && config.strategy != "desktop" {
        return Err(ConfigError::Validation(format!(
            "strategy must be 'mobile' or 'desktop', got '{}'",
            config.strategy
        )));
    }

    for technology in &config.technologies {
        validate_technology(technology)?;
    }

    Ok(())
}

fn validate_technology(technology: &TechnologySignature) -> Result<(), ConfigError> {
    if technology.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "technology name cannot be empty".to_string(),
        ));
    }

    if technology.contains.is_empty() && technology.selectors.is_empty() {
        return Err(ConfigError::Validation(format!(
            "technology '{}' needs at least one pattern or selector",
            technology.name
        )));
    }

    for selector in &technology.selectors {
        Selector::parse(selector).map_err(|e| {
            ConfigError::Validation(format!(
                "technology '{}' has invalid selector '{}': {:?}",
                technology.name, selector, e
            ))
        })?;
    }

    Ok(())
}

fn validate_queue_config(config: &QueueConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 16 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 16, got {}",
            config.workers
        )));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.poll_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "poll_interval_ms must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_indexing_config(config: &IndexingConfig) -> Result<(), ConfigError> {
    if let Some(endpoint) = &config.endpoint {
        validate_http_url("indexing.endpoint", endpoint)?;
    }
    Ok(())
}

fn validate_relevance_rules(rules: &[RelevanceRule]) -> Result<(), ConfigError> {
    for rule in rules {
        if rule.triggers.iter().all(|t| t.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "relevance rule must have at least one trigger".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field, other
        ))),
    }
}
