//! Recursive crawl of one site
//!
//! Every page is handled by its own spawned task. A task fetches its page,
//! extracts lemmas, claims the unvisited child links and spawns one task per
//! claimed link, then returns its children's outcomes followed by its own.
//! Dropping a task aborts the whole subtree below it.

use crate::config::CrawlerConfig;
use crate::crawler::extractor::LexicalExtractor;
use crate::crawler::fetcher::{fetch_url, FetchResult};
use crate::crawler::outcome::{LemmaRanks, PageOutcome};
use crate::crawler::parser::extract_links;
use crate::url::SiteBoundary;
use rand::Rng;
use reqwest::Client;
use scraper::Html;
use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

type CrawlFuture = Pin<Box<dyn Future<Output = Vec<PageOutcome>> + Send>>;

/// Politeness settings applied to every fetch of a site
#[derive(Debug, Clone, Copy)]
pub struct FetchPolicy {
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl FetchPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            min_delay: Duration::from_millis(config.min_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms.max(config.min_delay_ms)),
        }
    }

    /// Picks a random delay in `[min_delay, max_delay]`
    fn jitter(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        rand::thread_rng().gen_range(self.min_delay..=self.max_delay)
    }
}

/// Everything the tasks of one site crawl share
pub struct CrawlContext {
    boundary: SiteBoundary,
    client: Client,
    extractor: Arc<LexicalExtractor>,
    policy: FetchPolicy,
    fetch_permits: Semaphore,
    visited: Mutex<HashSet<String>>,
    single_page: bool,
}

impl CrawlContext {
    pub fn new(
        boundary: SiteBoundary,
        client: Client,
        extractor: Arc<LexicalExtractor>,
        policy: FetchPolicy,
        max_concurrent_fetches: usize,
        single_page: bool,
    ) -> Self {
        Self {
            boundary,
            client,
            extractor,
            policy,
            fetch_permits: Semaphore::new(max_concurrent_fetches.max(1)),
            visited: Mutex::new(HashSet::new()),
            single_page,
        }
    }

    pub fn boundary(&self) -> &SiteBoundary {
        &self.boundary
    }

    /// Claims a URL for this crawl; returns false if it was already claimed
    fn claim(&self, url: &str) -> bool {
        let Ok(key) = self.boundary.visit_key(url) else {
            return false;
        };

        match self.visited.lock() {
            Ok(mut visited) => visited.insert(key),
            Err(_) => false,
        }
    }

    fn path_of(&self, url: &str) -> String {
        self.boundary
            .path_of(url)
            .unwrap_or_else(|_| url.to_string())
    }
}

/// Crawls a site starting at `start_url`
///
/// Returns one outcome per visited page. In single-page mode only
/// `start_url` itself is visited.
pub async fn crawl_site(context: Arc<CrawlContext>, start_url: String) -> Vec<PageOutcome> {
    context.claim(&start_url);
    crawl_page(context, start_url).await
}

fn crawl_page(context: Arc<CrawlContext>, url: String) -> CrawlFuture {
    Box::pin(async move {
        let (outcome, links) = visit(&context, &url).await;

        let mut outcomes = Vec::new();
        if !links.is_empty() {
            let mut children = JoinSet::new();
            for link in links {
                if context.claim(&link) {
                    children.spawn(crawl_page(Arc::clone(&context), link));
                }
            }

            while let Some(joined) = children.join_next().await {
                match joined {
                    Ok(child_outcomes) => outcomes.extend(child_outcomes),
                    Err(e) => tracing::warn!("Crawl task below {} failed: {}", url, e),
                }
            }
        }

        outcomes.push(outcome);
        outcomes
    })
}

/// Fetches and analyses one page
///
/// Returns the page outcome and the candidate child links.
async fn visit(context: &CrawlContext, url: &str) -> (PageOutcome, Vec<String>) {
    let path = context.path_of(url);

    let delay = context.policy.jitter();
    tokio::time::sleep(delay).await;

    let fetched = match context.fetch_permits.acquire().await {
        Ok(_permit) => fetch_url(&context.client, url).await,
        Err(_) => FetchResult::NetworkError {
            error: "Crawl was shut down".to_string(),
        },
    };

    match fetched {
        FetchResult::Success {
            final_url,
            status_code,
            body,
        } => {
            let (lemmas, links) = analyse(context, url, &body, &final_url);
            tracing::debug!(
                "Fetched {} ({} lemmas, {} links)",
                url,
                lemmas.len(),
                links.len()
            );
            (
                PageOutcome::Success {
                    path,
                    status: status_code,
                    content: body,
                    lemmas,
                },
                links,
            )
        }
        FetchResult::ContentMismatch {
            status_code,
            content_type,
        } => {
            tracing::warn!("Skipping {}: unsupported content type {}", url, content_type);
            (
                PageOutcome::Failure {
                    path,
                    status: Some(status_code),
                    error: format!("Unsupported content type '{}'", content_type),
                },
                Vec::new(),
            )
        }
        FetchResult::HttpError { status_code } => {
            tracing::warn!("Failed to fetch {}: HTTP {}", url, status_code);
            (
                PageOutcome::Failure {
                    path,
                    status: Some(status_code),
                    error: format!("HTTP {}", status_code),
                },
                Vec::new(),
            )
        }
        FetchResult::NetworkError { error } => {
            tracing::warn!("Failed to fetch {}: {}", url, error);
            (
                PageOutcome::Failure {
                    path,
                    status: None,
                    error,
                },
                Vec::new(),
            )
        }
    }
}

/// Extracts lemma ranks and crawlable child links from a page body
///
/// Links are resolved against `final_url` and kept only when they lie below
/// `url`, the address the page was crawled under.
fn analyse(
    context: &CrawlContext,
    url: &str,
    body: &str,
    final_url: &str,
) -> (LemmaRanks, Vec<String>) {
    let document = Html::parse_document(body);
    let lemmas = context.extractor.extract(&document);

    if context.single_page {
        return (lemmas, Vec::new());
    }

    let Ok(base_url) = Url::parse(final_url) else {
        return (lemmas, Vec::new());
    };

    let boundary = &context.boundary;
    let links: BTreeSet<String> = extract_links(&document, &base_url)
        .iter()
        .map(|link| boundary.truncate_link(url, link))
        .filter(|link| boundary.is_crawlable_link(url, link))
        .map(str::to_string)
        .collect();

    (lemmas, links.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_within_bounds() {
        let policy = FetchPolicy {
            min_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(150),
        };
        for _ in 0..100 {
            let delay = policy.jitter();
            assert!(delay >= policy.min_delay && delay <= policy.max_delay);
        }
    }

    #[test]
    fn test_fixed_delay() {
        let policy = FetchPolicy {
            min_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(10),
        };
        assert_eq!(policy.jitter(), Duration::from_millis(10));
    }
}
