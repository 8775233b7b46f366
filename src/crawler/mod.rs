//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with a politeness delay
//! - HTML parsing, link extraction and weighted lemma extraction
//! - The recursive per-site crawl tree
//! - Orchestration of indexing runs

mod extractor;
mod fetcher;
mod orchestrator;
mod outcome;
mod parser;
mod task;

pub use extractor::LexicalExtractor;
pub use fetcher::{build_http_client, fetch_url, FetchResult};
pub use orchestrator::{Orchestrator, STOPPED_MESSAGE};
pub use outcome::{aggregate_failures, LemmaRanks, PageOutcome};
pub use parser::{page_title, plain_text};
pub use task::{crawl_site, CrawlContext, FetchPolicy};
