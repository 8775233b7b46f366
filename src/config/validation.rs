use crate::config::types::{
    Config, CrawlerConfig, IndexingConfig, OutputConfig, SearchConfig, SelectorEntry, SiteEntry,
};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
///
/// An empty site list is accepted here; it is rejected when indexing starts.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_indexing_config(&config.indexing)?;
    validate_search_config(&config.search)?;
    validate_output_config(&config.output)?;
    validate_sites(&config.sites)?;
    validate_selectors(&config.selectors)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.fetch_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "fetch-timeout-ms must be greater than 0".to_string(),
        ));
    }

    if config.min_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "min-delay-ms ({}) cannot exceed max-delay-ms ({})",
            config.min_delay_ms, config.max_delay_ms
        )));
    }

    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 256 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-fetches must be between 1 and 256, got {}",
            config.max_concurrent_fetches
        )));
    }

    if config.heartbeat_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "heartbeat-interval-secs must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

fn validate_indexing_config(config: &IndexingConfig) -> Result<(), ConfigError> {
    if config.batch_size == 0 {
        return Err(ConfigError::Validation(
            "batch-size must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if config.max_lemma_frequency == 0 {
        return Err(ConfigError::Validation(
            "max-lemma-frequency must be greater than 0".to_string(),
        ));
    }

    if config.default_limit == 0 {
        return Err(ConfigError::Validation(
            "default-limit must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates site entries: parsable http(s) URLs, non-empty names, no duplicates
fn validate_sites(sites: &[SiteEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for site in sites {
        if site.name.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Site '{}' must have a name",
                site.url
            )));
        }

        let url = Url::parse(&site.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid site URL '{}': {}", site.url, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "Site URL '{}' must use HTTP or HTTPS",
                site.url
            )));
        }

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "Site URL '{}' has no host",
                site.url
            )));
        }

        if !seen.insert(site.url.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Site '{}' is listed more than once",
                site.url
            )));
        }
    }

    Ok(())
}

/// Validates selector entries: parsable CSS and positive weights
fn validate_selectors(selectors: &[SelectorEntry]) -> Result<(), ConfigError> {
    if selectors.is_empty() {
        return Err(ConfigError::Validation(
            "At least one selector must be configured".to_string(),
        ));
    }

    for entry in selectors {
        scraper::Selector::parse(&entry.selector).map_err(|e| {
            ConfigError::InvalidSelector(format!("'{}' ({}): {:?}", entry.selector, entry.name, e))
        })?;

        if !entry.weight.is_finite() || entry.weight <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "Selector '{}' must have a positive weight, got {}",
                entry.name, entry.weight
            )));
        }
    }

    Ok(())
}
