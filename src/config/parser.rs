use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use lemmascope::config::load_config;
///
/// let config = load_config(Path::new("config.toml")).unwrap();
/// println!("Database: {}", config.output.database_path);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses, normalizes and validates configuration text
///
/// Site URLs are stored without a trailing slash so that they can be used
/// directly as crawl boundaries.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let mut config: Config = toml::from_str(content)?;

    for site in &mut config.sites {
        let trimmed = site.url.trim().trim_end_matches('/').to_string();
        site.url = trimmed;
        site.name = site.name.trim().to_string();
    }

    validate(&config)?;

    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// This is logged at startup so that runs can be traced back to the
/// configuration they used.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
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
user-agent = "TestBot/1.0"
referer = "https://example.com"
fetch-timeout-ms = 1500
min-delay-ms = 10
max-delay-ms = 20

[indexing]
batch-size = 30

[search]
max-lemma-frequency = 100

[output]
database-path = "./test.db"

[[sites]]
url = "https://example.com/"
name = "Example"

[[selectors]]
name = "title"
selector = "title"
weight = 1.0
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.user_agent, "TestBot/1.0");
        assert_eq!(config.crawler.fetch_timeout_ms, 1500);
        assert_eq!(config.crawler.heartbeat_interval_secs, 5);
        assert_eq!(config.indexing.batch_size, 30);
        assert_eq!(config.search.max_lemma_frequency, 100);
        assert!(!config.search.skip_unknown_lemmas);
        assert_eq!(config.sites.len(), 1);
        assert_eq!(config.sites[0].url, "https://example.com");
        assert_eq!(config.selectors.len(), 1);
    }

    #[test]
    fn test_defaults_applied() {
        let config = parse_config(
            r#"
[output]
database-path = "./test.db"
"#,
        )
        .unwrap();

        assert!(config.sites.is_empty());
        assert_eq!(config.indexing.batch_size, 60);
        assert_eq!(config.crawler.min_delay_ms, 50);
        assert_eq!(config.crawler.max_delay_ms, 150);
        assert_eq!(config.selectors.len(), 2);
        assert_eq!(config.selectors[0].selector, "title");
        assert_eq!(config.selectors[1].weight, 0.8);
    }

    #[test]
    fn test_site_lookup_by_prefix() {
        let config = parse_config(
            r#"
[output]
database-path = "./test.db"

[[sites]]
url = "https://example.com"
name = "Example"

[[sites]]
url = "https://other.org"
name = "Other"
"#,
        )
        .unwrap();

        let site = config.site_for_url("https://other.org/news/1").unwrap();
        assert_eq!(site.name, "Other");
        assert!(config.site_for_url("https://unknown.net/").is_none());
        assert_eq!(
            config.site_by_url("https://example.com/").unwrap().name,
            "Example"
        );
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[indexing]
batch-size = 0

[output]
database-path = "./test.db"
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
