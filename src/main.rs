//! Lemmascope main entry point
//!
//! This is the command-line interface for the Lemmascope site search engine.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lemmascope::config::{load_config_with_hash, Config};
use lemmascope::output::{print_search_results, print_statistics};
use lemmascope::storage::{self, open_storage, SharedStorage};
use lemmascope::{Lemmatizer, Orchestrator, SearchEngine, SnowballLemmatizer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Lemmascope: a lemma-based site search engine
///
/// Lemmascope crawls the configured sites, builds a lemma index of their
/// content and answers ranked full-text queries with highlighted snippets.
#[derive(Parser, Debug)]
#[command(name = "lemmascope")]
#[command(version = "1.0.0")]
#[command(about = "A lemma-based site search engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl and index every configured site (Ctrl-C stops the run)
    Index,

    /// Re-index a single page of a configured site
    IndexPage {
        /// Absolute URL of the page
        url: String,
    },

    /// Search the index
    Search {
        /// Free-text query
        query: String,

        /// Restrict results to one configured site (root URL)
        #[arg(long)]
        site: Option<String>,

        /// Number of results to skip
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,

        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show index statistics
    Stats {
        /// Print the statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate the configuration and list sites and selectors
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Command::Check = cli.command {
        handle_check(&config);
        return Ok(());
    }

    let config = Arc::new(config);
    let storage = storage::shared(
        open_storage(Path::new(&config.output.database_path))
            .with_context(|| format!("failed to open {}", config.output.database_path))?,
    );
    let lemmatizer: Arc<dyn Lemmatizer> = Arc::new(SnowballLemmatizer::new());

    match cli.command {
        Command::Index => handle_index(config, storage, lemmatizer).await,
        Command::IndexPage { url } => handle_index_page(config, storage, lemmatizer, &url).await,
        Command::Search {
            query,
            site,
            offset,
            limit,
            json,
        } => {
            let engine = SearchEngine::new(config, storage, lemmatizer);
            let response = engine.search(&query, site.as_deref(), offset, limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_search_results(&response, offset);
            }
            Ok(())
        }
        Command::Stats { json } => {
            let orchestrator = Orchestrator::new(config, storage, lemmatizer)?;
            let statistics = orchestrator.statistics()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&statistics)?);
            } else {
                print_statistics(&statistics);
            }
            Ok(())
        }
        Command::Check => Ok(()),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("lemmascope=info,warn"),
            1 => EnvFilter::new("lemmascope=debug,info"),
            2 => EnvFilter::new("lemmascope=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the check command: shows what the configuration describes
fn handle_check(config: &Config) {
    println!("=== Lemmascope Configuration ===\n");

    println!("Crawler:");
    println!("  User agent: {}", config.crawler.user_agent);
    println!("  Fetch timeout: {}ms", config.crawler.fetch_timeout_ms);
    println!(
        "  Delay: {}-{}ms",
        config.crawler.min_delay_ms, config.crawler.max_delay_ms
    );
    println!(
        "  Max concurrent fetches: {}",
        config.crawler.max_concurrent_fetches
    );

    println!("\nSearch:");
    println!(
        "  Max lemma frequency: {}",
        config.search.max_lemma_frequency
    );
    println!("  Default limit: {}", config.search.default_limit);

    println!("\nDatabase: {}", config.output.database_path);

    println!("\nSites ({}):", config.sites.len());
    for site in &config.sites {
        println!("  - {} ({})", site.name, site.url);
    }

    println!("\nSelectors ({}):", config.selectors.len());
    for selector in &config.selectors {
        println!(
            "  - {}: {} (weight {})",
            selector.name, selector.selector, selector.weight
        );
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the index command: runs a full crawl until it completes or Ctrl-C
async fn handle_index(
    config: Arc<Config>,
    storage: SharedStorage,
    lemmatizer: Arc<dyn Lemmatizer>,
) -> Result<()> {
    let orchestrator = Orchestrator::new(config, storage, lemmatizer)?;

    orchestrator.start_indexing()?;
    tracing::info!("Indexing started");

    tokio::select! {
        _ = orchestrator.wait_until_idle() => {
            tracing::info!("Indexing finished");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            tracing::warn!("Interrupted, stopping indexing");
            // The run may have completed between the signal and this call
            if let Err(e) = orchestrator.stop_indexing() {
                if !e.is_rejection() {
                    return Err(e.into());
                }
            }
            orchestrator.wait_until_idle().await;
        }
    }

    print_statistics(&orchestrator.statistics()?);
    Ok(())
}

/// Handles the index-page command
async fn handle_index_page(
    config: Arc<Config>,
    storage: SharedStorage,
    lemmatizer: Arc<dyn Lemmatizer>,
    url: &str,
) -> Result<()> {
    let orchestrator = Orchestrator::new(config, storage, lemmatizer)?;

    orchestrator.index_page(url)?;
    tracing::info!("Re-indexing {}", url);
    orchestrator.wait_until_idle().await;

    print_statistics(&orchestrator.statistics()?);
    Ok(())
}
