//! Crawl orchestration
//!
//! The orchestrator owns the process-wide indexing state. A run crawls every
//! configured site (or one page of one site) in parallel; each site gets a
//! heartbeat that keeps its status time fresh, a crawl tree, and one
//! persistence step on the blocking pool once its whole tree has joined.

use crate::config::Config;
use crate::crawler::extractor::LexicalExtractor;
use crate::crawler::fetcher::build_http_client;
use crate::crawler::outcome::{aggregate_failures, PageOutcome};
use crate::crawler::task::{crawl_site, CrawlContext, FetchPolicy};
use crate::indexer::IndexBuilder;
use crate::morphology::Lemmatizer;
use crate::output::{collect_statistics, Statistics};
use crate::state::{IndexingState, RunHandle, SiteStatus};
use crate::storage::{self, SharedStorage, Storage, StorageResult};
use crate::url::{normalize_url, SiteBoundary};
use crate::{Result, SearchEngineError};
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

/// Error recorded on every site that was still indexing when a run was stopped
pub const STOPPED_MESSAGE: &str = "Indexing stopped by user";

/// Indexing state plus a signal for callers waiting on the completion barrier
struct RunTracker {
    state: Mutex<IndexingState>,
    idle: watch::Sender<bool>,
}

impl RunTracker {
    fn finish(&self, run_id: u64) {
        let cleared = match self.state.lock() {
            Ok(mut state) => state.finish(run_id),
            Err(_) => false,
        };

        if cleared {
            self.idle.send_replace(true);
        }
    }
}

/// How a site's outcomes are written to the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexMode {
    FullSite,
    SinglePage,
}

/// One site of a run
struct SiteJob {
    site_id: i64,
    boundary: SiteBoundary,
    start_url: String,
    mode: IndexMode,
}

/// Everything a run's tasks share
struct RunContext {
    storage: SharedStorage,
    client: Client,
    extractor: Arc<LexicalExtractor>,
    builder: IndexBuilder,
    policy: FetchPolicy,
    max_concurrent_fetches: usize,
    heartbeat_interval: Duration,
    persistence_permits: Arc<Semaphore>,
}

/// Drives the crawl -> index pipeline and serializes its invocations
pub struct Orchestrator {
    config: Arc<Config>,
    run_context: Arc<RunContext>,
    tracker: Arc<RunTracker>,
    next_run_id: AtomicU64,
}

impl Orchestrator {
    /// Creates an idle orchestrator
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `storage` - Shared index storage
    /// * `lemmatizer` - Lemmatizer used for page content
    pub fn new(
        config: Arc<Config>,
        storage: SharedStorage,
        lemmatizer: Arc<dyn Lemmatizer>,
    ) -> Result<Self> {
        let client = build_http_client(&config.crawler)?;
        let extractor = Arc::new(LexicalExtractor::new(&config.selectors, lemmatizer)?);
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);

        let run_context = RunContext {
            storage,
            client,
            extractor,
            builder: IndexBuilder::new(config.indexing.batch_size),
            policy: FetchPolicy::from_config(&config.crawler),
            max_concurrent_fetches: config.crawler.max_concurrent_fetches as usize,
            heartbeat_interval: Duration::from_secs(config.crawler.heartbeat_interval_secs),
            persistence_permits: Arc::new(Semaphore::new(workers)),
        };

        let (idle, _) = watch::channel(true);

        Ok(Self {
            config,
            run_context: Arc::new(run_context),
            tracker: Arc::new(RunTracker {
                state: Mutex::new(IndexingState::Idle),
                idle,
            }),
            next_run_id: AtomicU64::new(1),
        })
    }

    /// Starts a full re-index of every configured site
    ///
    /// Each site is set to INDEXING before this returns. Purging its old rows
    /// and the crawl itself run in the background, the purge on the blocking
    /// pool. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// * `Configuration` - no sites are configured
    /// * `StateConflict` - a run is already in flight
    pub fn start_indexing(&self) -> Result<()> {
        if self.config.sites.is_empty() {
            return Err(SearchEngineError::Configuration(
                "no sites configured".to_string(),
            ));
        }

        let mut state = self.lock_state()?;
        if state.is_running() {
            return Err(SearchEngineError::StateConflict(
                "indexing is already running".to_string(),
            ));
        }

        let mut jobs = Vec::with_capacity(self.config.sites.len());
        {
            let mut storage = storage::lock(&self.run_context.storage)?;
            for site in &self.config.sites {
                let boundary = SiteBoundary::new(&site.url);
                let site_id =
                    storage.upsert_site(boundary.root(), &site.name, SiteStatus::Indexing)?;

                jobs.push(SiteJob {
                    site_id,
                    start_url: boundary.url_for("/"),
                    boundary,
                    mode: IndexMode::FullSite,
                });
            }
        }

        tracing::info!("Starting indexing of {} site(s)", jobs.len());
        *state = self.launch(jobs);
        Ok(())
    }

    /// Stops the in-flight run
    ///
    /// Every task of the run is cancelled and every site still INDEXING is
    /// marked FAILED with [`STOPPED_MESSAGE`].
    ///
    /// # Errors
    ///
    /// * `StateConflict` - no run is in flight
    pub fn stop_indexing(&self) -> Result<()> {
        let run = self.lock_state()?.take_run().ok_or_else(|| {
            SearchEngineError::StateConflict("indexing is not running".to_string())
        })?;

        run.cancel.cancel();
        run.supervisor.abort();

        let failed = storage::lock(&self.run_context.storage)?.fail_indexing_sites(STOPPED_MESSAGE)?;
        self.tracker.idle.send_replace(true);

        tracing::info!("Indexing run {} stopped, {} site(s) failed", run.run_id, failed);
        Ok(())
    }

    /// Re-indexes a single, already indexed page
    ///
    /// # Errors
    ///
    /// * `Configuration` - the URL is outside every configured site
    /// * `Validation` - the page is not in the index
    /// * `StateConflict` - a run is already in flight
    pub fn index_page(&self, url: &str) -> Result<()> {
        let url = normalize_url(url)
            .map(|parsed| parsed.to_string())
            .unwrap_or_else(|_| url.trim().to_string());

        let site = self.config.site_for_url(&url).ok_or_else(|| {
            SearchEngineError::Configuration(format!(
                "page {} is outside of the configured sites",
                url
            ))
        })?;
        let boundary = SiteBoundary::new(&site.url);
        let path = boundary.path_of(&url)?;

        let mut state = self.lock_state()?;
        let site_id = {
            let storage = storage::lock(&self.run_context.storage)?;
            let record = storage.get_site_by_url(boundary.root())?;
            match record {
                Some(record) if storage.find_page(record.id, &path)?.is_some() => record.id,
                _ => {
                    return Err(SearchEngineError::Validation(format!(
                        "page {} is not in the index",
                        url
                    )))
                }
            }
        };

        if state.is_running() {
            return Err(SearchEngineError::StateConflict(
                "indexing is already running".to_string(),
            ));
        }

        storage::lock(&self.run_context.storage)?.update_site_status(
            site_id,
            SiteStatus::Indexing,
            None,
        )?;

        tracing::info!("Re-indexing page {}", url);
        *state = self.launch(vec![SiteJob {
            site_id,
            boundary,
            start_url: url,
            mode: IndexMode::SinglePage,
        }]);
        Ok(())
    }

    /// Returns true while a run is in flight
    pub fn is_indexing(&self) -> bool {
        self.lock_state()
            .map(|state| state.is_running())
            .unwrap_or(false)
    }

    /// Waits until no run is in flight
    pub async fn wait_until_idle(&self) {
        let mut idle = self.tracker.idle.subscribe();
        while !*idle.borrow_and_update() {
            if idle.changed().await.is_err() {
                return;
            }
        }
    }

    /// Collects index statistics for every configured site
    pub fn statistics(&self) -> Result<Statistics> {
        // State lock before storage lock, as everywhere else
        let indexing = self.is_indexing();
        let storage = storage::lock(&self.run_context.storage)?;
        let statistics = collect_statistics(&self.config, &*storage, indexing)?;
        Ok(statistics)
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, IndexingState>> {
        self.tracker
            .state
            .lock()
            .map_err(|_| SearchEngineError::Task("indexing state lock poisoned".to_string()))
    }

    /// Spawns the supervisor of a new run and returns the running state
    ///
    /// The caller must hold the state lock until the returned state is stored,
    /// so the supervisor cannot clear a run that is not yet recorded.
    fn launch(&self, jobs: Vec<SiteJob>) -> IndexingState {
        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let context = Arc::clone(&self.run_context);
        let tracker = Arc::clone(&self.tracker);
        let run_cancel = cancel.clone();

        self.tracker.idle.send_replace(false);

        let supervisor: JoinHandle<()> = tokio::spawn(async move {
            let started = Instant::now();
            let mut sites = JoinSet::new();

            for job in jobs {
                sites.spawn(run_site(
                    Arc::clone(&context),
                    job,
                    run_cancel.child_token(),
                ));
            }

            while let Some(joined) = sites.join_next().await {
                if let Err(e) = joined {
                    tracing::error!("Site task of run {} failed: {}", run_id, e);
                }
            }

            tracing::info!(
                "Indexing run {} finished in {} ms",
                run_id,
                started.elapsed().as_millis()
            );
            tracker.finish(run_id);
        });

        IndexingState::Running(RunHandle {
            run_id,
            cancel,
            supervisor,
        })
    }
}

/// Crawls and persists one site, then flips its status
async fn run_site(context: Arc<RunContext>, job: SiteJob, cancel: CancellationToken) {
    let heartbeat = spawn_heartbeat(
        Arc::clone(&context.storage),
        job.site_id,
        context.heartbeat_interval,
        cancel.child_token(),
    );
    let _heartbeat_guard = heartbeat.drop_guard();

    if job.mode == IndexMode::FullSite {
        if let Err(e) = purge_site(&context, job.site_id).await {
            tracing::error!("Failed to purge {}: {}", job.boundary.root(), e);
        }
    }

    let crawl_context = Arc::new(CrawlContext::new(
        job.boundary.clone(),
        context.client.clone(),
        Arc::clone(&context.extractor),
        context.policy,
        context.max_concurrent_fetches,
        job.mode == IndexMode::SinglePage,
    ));

    let outcomes = tokio::select! {
        _ = cancel.cancelled() => {
            tracing::info!("Crawl of {} cancelled", job.boundary.root());
            return;
        }
        outcomes = crawl_site(crawl_context, job.start_url.clone()) => outcomes,
    };

    tracing::info!(
        "Crawl of {} finished with {} page(s)",
        job.boundary.root(),
        outcomes.len()
    );

    let Ok(permit) = Arc::clone(&context.persistence_permits).acquire_owned().await else {
        return;
    };

    let root = job.boundary.root().to_string();
    let persisted = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        persist_site(&context, job.site_id, job.mode, &outcomes, &cancel)
    })
    .await;

    match persisted {
        Ok(Ok(Some(status))) => tracing::info!("Site {} is {}", root, status),
        Ok(Ok(None)) => tracing::info!("Persistence of {} skipped after stop", root),
        Ok(Err(e)) => tracing::error!("Failed to persist {}: {}", root, e),
        Err(e) => tracing::error!("Persistence task of {} failed: {}", root, e),
    }
}

/// Deletes a site's pages, lemmas and postings on the blocking pool
async fn purge_site(context: &RunContext, site_id: i64) -> Result<()> {
    let shared = Arc::clone(&context.storage);
    tokio::task::spawn_blocking(move || {
        storage::lock(&shared).and_then(|mut storage| storage.delete_site_data(site_id))
    })
    .await
    .map_err(|e| SearchEngineError::Task(e.to_string()))??;
    Ok(())
}

/// Writes a site's outcomes and sets its final status
///
/// Runs under the storage lock; a cancelled run writes nothing. Returns the
/// status the site ended in, or `None` when cancelled.
fn persist_site(
    context: &RunContext,
    site_id: i64,
    mode: IndexMode,
    outcomes: &[PageOutcome],
    cancel: &CancellationToken,
) -> StorageResult<Option<SiteStatus>> {
    let mut storage = storage::lock(&context.storage)?;
    if cancel.is_cancelled() {
        return Ok(None);
    }

    if let Some(message) = aggregate_failures(outcomes) {
        storage.update_site_status(site_id, SiteStatus::Failed, Some(&message))?;
        return Ok(Some(SiteStatus::Failed));
    }

    let written = match mode {
        IndexMode::FullSite => context.builder.index_site(&mut *storage, site_id, outcomes),
        IndexMode::SinglePage => match outcomes.first() {
            Some(outcome) => context
                .builder
                .replace_page(&mut *storage, site_id, outcome),
            None => Ok(Default::default()),
        },
    };

    match written {
        Ok(summary) => {
            tracing::debug!(
                "Site {}: {} page(s), {} new lemma(s), {} posting(s)",
                site_id,
                summary.pages,
                summary.lemmas,
                summary.postings
            );
            storage.update_site_status(site_id, SiteStatus::Indexed, None)?;
            Ok(Some(SiteStatus::Indexed))
        }
        Err(e) => {
            tracing::error!("Index builder failed for site {}: {}", site_id, e);
            let message = format!("Failed to write index: {}", e);
            storage.update_site_status(site_id, SiteStatus::Failed, Some(&message))?;
            Ok(Some(SiteStatus::Failed))
        }
    }
}

/// Spawns the task that refreshes a site's status time until cancelled
fn spawn_heartbeat(
    storage: SharedStorage,
    site_id: i64,
    interval: Duration,
    cancel: CancellationToken,
) -> CancellationToken {
    let token = cancel.clone();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let shared = Arc::clone(&storage);
                    let touched = tokio::task::spawn_blocking(move || {
                        storage::lock(&shared).and_then(|mut storage| storage.touch_site(site_id))
                    })
                    .await;
                    match touched {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            tracing::warn!("Heartbeat of site {} failed: {}", site_id, e)
                        }
                        Err(e) => {
                            tracing::warn!("Heartbeat task of site {} failed: {}", site_id, e)
                        }
                    }
                }
            }
        }
    });

    token
}
