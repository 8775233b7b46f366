//! Index statistics
//!
//! This module collects per-site and total counts from the storage layer
//! and displays them.

use crate::config::Config;
use crate::state::SiteStatus;
use crate::storage::{Storage, StorageResult};
use serde::Serialize;

/// Totals across every site
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalStatistics {
    pub sites: u64,
    pub pages: u64,
    pub lemmas: u64,
    pub is_indexing: bool,
}

/// Statistics of one configured site
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteStatistics {
    pub url: String,
    pub name: String,

    /// `None` until the site has been crawled once
    pub status: Option<SiteStatus>,
    pub status_time: Option<String>,
    pub error: Option<String>,
    pub pages: u64,
    pub lemmas: u64,
}

/// Index statistics summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total: TotalStatistics,
    pub detailed: Vec<SiteStatistics>,
}

/// Collects statistics for every configured site
///
/// # Arguments
///
/// * `config` - Configuration listing the sites
/// * `storage` - The storage backend to query
/// * `is_indexing` - Whether a run is in flight
pub fn collect_statistics<S: Storage + ?Sized>(
    config: &Config,
    storage: &S,
    is_indexing: bool,
) -> StorageResult<Statistics> {
    let mut detailed = Vec::with_capacity(config.sites.len());

    for site in &config.sites {
        let entry = match storage.get_site_by_url(&site.url)? {
            Some(record) => SiteStatistics {
                url: site.url.clone(),
                name: site.name.clone(),
                status: Some(record.status),
                status_time: Some(record.status_time),
                error: record.last_error,
                pages: storage.count_pages(Some(record.id))?,
                lemmas: storage.count_lemmas(Some(record.id))?,
            },
            None => SiteStatistics {
                url: site.url.clone(),
                name: site.name.clone(),
                status: None,
                status_time: None,
                error: None,
                pages: 0,
                lemmas: 0,
            },
        };
        detailed.push(entry);
    }

    Ok(Statistics {
        total: TotalStatistics {
            sites: config.sites.len() as u64,
            pages: storage.count_pages(None)?,
            lemmas: storage.count_lemmas(None)?,
            is_indexing,
        },
        detailed,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &Statistics) {
    println!("=== Index Statistics ===\n");

    println!("Overview:");
    println!("  Sites: {}", stats.total.sites);
    println!("  Pages: {}", stats.total.pages);
    println!("  Lemmas: {}", stats.total.lemmas);
    println!(
        "  Indexing: {}",
        if stats.total.is_indexing { "running" } else { "idle" }
    );
    println!();

    for site in &stats.detailed {
        println!("{} ({})", site.name, site.url);
        match site.status {
            Some(status) => println!(
                "  Status: {} at {}",
                status,
                site.status_time.as_deref().unwrap_or("-")
            ),
            None => println!("  Status: never indexed"),
        }
        println!("  Pages: {}, lemmas: {}", site.pages, site.lemmas);
        if let Some(error) = &site.error {
            println!("  Last error: {}", error);
        }
        println!();
    }
}
