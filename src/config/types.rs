use serde::Deserialize;

/// Main configuration structure for Lemmascope
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub sites: Vec<SiteEntry>,
    #[serde(default = "default_selectors")]
    pub selectors: Vec<SelectorEntry>,
}

impl Config {
    /// Finds the configured site whose boundary is a prefix of `url`
    ///
    /// The prefix must end at a path boundary, so `https://example.community`
    /// does not belong to `https://example.com`.
    pub fn site_for_url(&self, url: &str) -> Option<&SiteEntry> {
        self.sites.iter().find(|site| {
            url.strip_prefix(site.url.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }

    /// Finds the configured site with exactly this root URL
    ///
    /// A trailing slash on `url` is ignored.
    pub fn site_by_url(&self, url: &str) -> Option<&SiteEntry> {
        let url = url.trim_end_matches('/');
        self.sites.iter().find(|site| site.url == url)
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Referer header sent with every request
    #[serde(rename = "referer", default = "default_referer")]
    pub referer: String,

    /// Total timeout of a single page fetch (milliseconds)
    #[serde(rename = "fetch-timeout-ms", default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Lower bound of the random delay before each fetch (milliseconds)
    #[serde(rename = "min-delay-ms", default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Upper bound of the random delay before each fetch (milliseconds)
    #[serde(rename = "max-delay-ms", default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Maximum number of fetches in flight per site
    #[serde(
        rename = "max-concurrent-fetches",
        default = "default_max_concurrent_fetches"
    )]
    pub max_concurrent_fetches: u32,

    /// Interval between heartbeat updates of a site's status time (seconds)
    #[serde(
        rename = "heartbeat-interval-secs",
        default = "default_heartbeat_interval_secs"
    )]
    pub heartbeat_interval_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            referer: default_referer(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
        }
    }
}

/// Index builder configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IndexingConfig {
    /// Number of rows written per batch
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

/// Query engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Lemmas found on more pages than this are too common to discriminate
    #[serde(rename = "max-lemma-frequency", default = "default_max_lemma_frequency")]
    pub max_lemma_frequency: u64,

    /// Ignore query lemmas that occur nowhere instead of matching nothing
    #[serde(rename = "skip-unknown-lemmas", default)]
    pub skip_unknown_lemmas: bool,

    /// Page size used when the caller gives no limit
    #[serde(rename = "default-limit", default = "default_limit")]
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_lemma_frequency: default_max_lemma_frequency(),
            skip_unknown_lemmas: false,
            default_limit: default_limit(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// A site to crawl
#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    /// Root URL of the site; also the crawl boundary
    pub url: String,

    /// Human readable site name
    pub name: String,
}

/// A weighted content-extraction rule
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorEntry {
    /// Rule name (e.g., "title")
    pub name: String,

    /// CSS selector of the page region
    pub selector: String,

    /// Multiplier applied to lemma counts found in the region
    pub weight: f64,
}

fn default_user_agent() -> String {
    "LemmascopeBot/1.0".to_string()
}

fn default_referer() -> String {
    "https://www.google.com".to_string()
}

fn default_fetch_timeout_ms() -> u64 {
    3000
}

fn default_min_delay_ms() -> u64 {
    50
}

fn default_max_delay_ms() -> u64 {
    150
}

fn default_max_concurrent_fetches() -> u32 {
    8
}

fn default_heartbeat_interval_secs() -> u64 {
    5
}

fn default_batch_size() -> usize {
    60
}

fn default_max_lemma_frequency() -> u64 {
    500
}

fn default_limit() -> usize {
    20
}

fn default_selectors() -> Vec<SelectorEntry> {
    vec![
        SelectorEntry {
            name: "title".to_string(),
            selector: "title".to_string(),
            weight: 1.0,
        },
        SelectorEntry {
            name: "body".to_string(),
            selector: "body".to_string(),
            weight: 0.8,
        },
    ]
}
