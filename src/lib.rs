//! Lemmascope: a lemma-based site search engine
//!
//! This crate crawls a fixed set of configured web sites, builds a lemma-based
//! inverted index of their content, and answers ranked full-text queries with
//! highlighted snippets.

pub mod config;
pub mod crawler;
pub mod indexer;
pub mod morphology;
pub mod output;
pub mod search;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Lemmascope operations
#[derive(Debug, Error)]
pub enum SearchEngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The request cannot be served with the current site configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The request conflicts with the current indexing state
    #[error("State conflict: {0}")]
    StateConflict(String),

    /// The request itself is invalid
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SearchEngineError {
    /// Returns true for errors that reject a request rather than report a failure
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::StateConflict(_) | Self::Validation(_)
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("URL {url} is outside of boundary {boundary}")]
    OutsideBoundary { url: String, boundary: String },
}

/// Result type alias for Lemmascope operations
pub type Result<T> = std::result::Result<T, SearchEngineError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::Orchestrator;
pub use morphology::{Lemmatizer, SnowballLemmatizer};
pub use search::{SearchEngine, SearchResponse, SearchResult};
pub use state::SiteStatus;
pub use storage::{SharedStorage, SqliteStorage, Storage};
