//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::SiteStatus;
use crate::storage::{LemmaRecord, NewPage, NewPosting, PageRecord, SiteRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Readers take `&self`; every mutation takes `&mut self` so a shared
/// backend must be wrapped in a lock.
pub trait Storage {
    // ===== Transactions =====

    /// Starts a transaction
    fn begin(&mut self) -> StorageResult<()>;

    /// Commits the open transaction
    fn commit(&mut self) -> StorageResult<()>;

    /// Rolls back the open transaction
    fn rollback(&mut self) -> StorageResult<()>;

    /// Runs `f` inside a transaction, rolling back if it fails
    fn with_transaction<T, F>(&mut self, f: F) -> StorageResult<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> StorageResult<T>,
    {
        self.begin()?;
        match f(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_error) = self.rollback() {
                    tracing::error!("Rollback failed: {}", rollback_error);
                }
                Err(e)
            }
        }
    }

    // ===== Site Management =====

    /// Inserts the site or updates its name, and sets its status
    ///
    /// The status time is set to now and the last error is cleared.
    ///
    /// # Returns
    ///
    /// The site ID
    fn upsert_site(&mut self, url: &str, name: &str, status: SiteStatus) -> StorageResult<i64>;

    /// Gets a site by its root URL
    fn get_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>>;

    /// Gets all stored sites
    fn list_sites(&self) -> StorageResult<Vec<SiteRecord>>;

    /// Sets a site's status, status time and last error
    fn update_site_status(
        &mut self,
        site_id: i64,
        status: SiteStatus,
        last_error: Option<&str>,
    ) -> StorageResult<()>;

    /// Refreshes a site's status time
    fn touch_site(&mut self, site_id: i64) -> StorageResult<()>;

    /// Marks every INDEXING site FAILED with `message`
    ///
    /// # Returns
    ///
    /// The number of sites changed
    fn fail_indexing_sites(&mut self, message: &str) -> StorageResult<usize>;

    /// Deletes all pages, lemmas and postings of a site
    fn delete_site_data(&mut self, site_id: i64) -> StorageResult<()>;

    // ===== Page Management =====

    /// Inserts pages of a site
    ///
    /// # Returns
    ///
    /// The page IDs, in input order
    fn insert_pages(&mut self, site_id: i64, pages: &[NewPage]) -> StorageResult<Vec<i64>>;

    /// Finds a page by site and site-relative path
    fn find_page(&self, site_id: i64, path: &str) -> StorageResult<Option<PageRecord>>;

    /// Gets pages by ID; unknown IDs are skipped
    fn get_pages(&self, page_ids: &[i64]) -> StorageResult<Vec<PageRecord>>;

    /// Deletes a page and its postings
    fn delete_page(&mut self, page_id: i64) -> StorageResult<()>;

    /// Counts pages, for one site or overall
    fn count_pages(&self, site_id: Option<i64>) -> StorageResult<u64>;

    // ===== Lemma Management =====

    /// Finds the lemmas of a site among `lemmas`
    fn find_lemmas(&self, site_id: i64, lemmas: &[String]) -> StorageResult<Vec<LemmaRecord>>;

    /// Inserts lemmas of a site with their initial frequencies
    ///
    /// # Returns
    ///
    /// The lemma IDs, in input order
    fn insert_lemmas(&mut self, site_id: i64, lemmas: &[(String, u64)])
        -> StorageResult<Vec<i64>>;

    /// Adds `delta` to a lemma's frequency
    fn adjust_lemma_frequency(&mut self, lemma_id: i64, delta: i64) -> StorageResult<()>;

    /// Deletes a lemma and its postings
    fn delete_lemma(&mut self, lemma_id: i64) -> StorageResult<()>;

    /// Gets the lemmas a page has postings for
    fn lemmas_for_page(&self, page_id: i64) -> StorageResult<Vec<LemmaRecord>>;

    /// Sums the frequency of a lemma, for one site or across all sites
    fn lemma_frequency(&self, lemma: &str, site_id: Option<i64>) -> StorageResult<u64>;

    /// Counts lemma rows, for one site or overall
    fn count_lemmas(&self, site_id: Option<i64>) -> StorageResult<u64>;

    // ===== Posting Management =====

    /// Inserts postings
    fn insert_postings(&mut self, postings: &[NewPosting]) -> StorageResult<()>;

    /// Gets the IDs of pages with a posting for `lemma`
    fn pages_for_lemma(&self, lemma: &str, site_id: Option<i64>) -> StorageResult<Vec<i64>>;

    /// Sums the grades of a page's postings for the given lemmas
    fn grade_sum(&self, page_id: i64, lemmas: &[String]) -> StorageResult<f64>;

    /// Counts distinct pages with a posting for a lemma row
    fn count_pages_for_lemma(&self, lemma_id: i64) -> StorageResult<u64>;
}
