//! Storage module for the search index
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Site rows and their indexing status
//! - Pages, lemmas and postings of the inverted index

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::SiteStatus;
use crate::SearchEngineError;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Storage handle shared by the orchestrator, its workers and the query engine
pub type SharedStorage = Arc<Mutex<SqliteStorage>>;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(SearchEngineError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, SearchEngineError> {
    SqliteStorage::new(path)
}

/// Wraps a storage backend for sharing
pub fn shared(storage: SqliteStorage) -> SharedStorage {
    Arc::new(Mutex::new(storage))
}

/// Locks shared storage, turning lock poisoning into an error
pub fn lock(storage: &SharedStorage) -> StorageResult<MutexGuard<'_, SqliteStorage>> {
    storage.lock().map_err(|_| StorageError::Poisoned)
}

/// Represents a site in the database
#[derive(Debug, Clone)]
pub struct SiteRecord {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    pub status_time: String,
    pub last_error: Option<String>,
}

/// Represents a page in the database
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub id: i64,
    pub site_id: i64,
    pub path: String,
    pub code: u16,
    pub content: String,
}

/// A page about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewPage {
    pub path: String,
    pub code: u16,
    pub content: String,
}

/// Represents a lemma of a site
#[derive(Debug, Clone, PartialEq)]
pub struct LemmaRecord {
    pub id: i64,
    pub site_id: i64,
    pub lemma: String,
    pub frequency: u64,
}

/// A posting about to be inserted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewPosting {
    pub page_id: i64,
    pub lemma_id: i64,
    pub grade: f64,
}
