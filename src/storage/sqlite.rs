//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::SiteStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{LemmaRecord, NewPage, NewPosting, PageRecord, SiteRecord};
use crate::SearchEngineError;
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use std::path::Path;

const SITE_COLUMNS: &str = "id, url, name, status, status_time, last_error";
const PAGE_COLUMNS: &str = "id, site_id, path, code, content";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SearchEngineError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SearchEngineError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, SearchEngineError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn site_from_row(row: &Row<'_>) -> rusqlite::Result<SiteRecord> {
    let status: String = row.get(3)?;
    Ok(SiteRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        name: row.get(2)?,
        status: SiteStatus::from_db_string(&status).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                Type::Text,
                format!("unknown site status '{}'", status).into(),
            )
        })?,
        status_time: row.get(4)?,
        last_error: row.get(5)?,
    })
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    Ok(PageRecord {
        id: row.get(0)?,
        site_id: row.get(1)?,
        path: row.get(2)?,
        code: row.get(3)?,
        content: row.get(4)?,
    })
}

fn lemma_from_row(row: &Row<'_>) -> rusqlite::Result<LemmaRecord> {
    Ok(LemmaRecord {
        id: row.get(0)?,
        site_id: row.get(1)?,
        lemma: row.get(2)?,
        frequency: row.get::<_, i64>(3)?.max(0) as u64,
    })
}

/// Builds `?{start}, ?{start+1}, ...` for an IN list of `count` values
fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Storage for SqliteStorage {
    // ===== Transactions =====

    fn begin(&mut self) -> StorageResult<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> StorageResult<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    // ===== Site Management =====

    fn upsert_site(&mut self, url: &str, name: &str, status: SiteStatus) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO sites (url, name, status, status_time, last_error)
             VALUES (?1, ?2, ?3, ?4, NULL)
             ON CONFLICT(url) DO UPDATE SET
                name = excluded.name,
                status = excluded.status,
                status_time = excluded.status_time,
                last_error = NULL",
            params![url, name, status.to_db_string(), now],
        )?;

        let id = self.conn.query_row(
            "SELECT id FROM sites WHERE url = ?1",
            params![url],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn get_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>> {
        let site = self
            .conn
            .query_row(
                &format!("SELECT {} FROM sites WHERE url = ?1", SITE_COLUMNS),
                params![url],
                site_from_row,
            )
            .optional()?;
        Ok(site)
    }

    fn list_sites(&self) -> StorageResult<Vec<SiteRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM sites ORDER BY id", SITE_COLUMNS))?;
        let sites = stmt
            .query_map([], site_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sites)
    }

    fn update_site_status(
        &mut self,
        site_id: i64,
        status: SiteStatus,
        last_error: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE sites SET status = ?1, status_time = ?2, last_error = ?3 WHERE id = ?4",
            params![status.to_db_string(), now, last_error, site_id],
        )?;

        if updated == 0 {
            return Err(StorageError::NotFound(format!("Site ID {}", site_id)));
        }
        Ok(())
    }

    fn touch_site(&mut self, site_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE sites SET status_time = ?1 WHERE id = ?2",
            params![now, site_id],
        )?;
        Ok(())
    }

    fn fail_indexing_sites(&mut self, message: &str) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE sites SET status = ?1, status_time = ?2, last_error = ?3 WHERE status = ?4",
            params![
                SiteStatus::Failed.to_db_string(),
                now,
                message,
                SiteStatus::Indexing.to_db_string()
            ],
        )?;
        Ok(updated)
    }

    fn delete_site_data(&mut self, site_id: i64) -> StorageResult<()> {
        self.conn.execute(
            "DELETE FROM search_index WHERE page_id IN (SELECT id FROM pages WHERE site_id = ?1)",
            params![site_id],
        )?;
        self.conn
            .execute("DELETE FROM pages WHERE site_id = ?1", params![site_id])?;
        self.conn
            .execute("DELETE FROM lemmas WHERE site_id = ?1", params![site_id])?;
        Ok(())
    }

    // ===== Page Management =====

    fn insert_pages(&mut self, site_id: i64, pages: &[NewPage]) -> StorageResult<Vec<i64>> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO pages (site_id, path, code, content) VALUES (?1, ?2, ?3, ?4)",
        )?;

        let mut ids = Vec::with_capacity(pages.len());
        for page in pages {
            let id = stmt.insert(params![site_id, page.path, page.code, page.content])?;
            ids.push(id);
        }
        Ok(ids)
    }

    fn find_page(&self, site_id: i64, path: &str) -> StorageResult<Option<PageRecord>> {
        let page = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM pages WHERE site_id = ?1 AND path = ?2",
                    PAGE_COLUMNS
                ),
                params![site_id, path],
                page_from_row,
            )
            .optional()?;
        Ok(page)
    }

    fn get_pages(&self, page_ids: &[i64]) -> StorageResult<Vec<PageRecord>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("SELECT {} FROM pages WHERE id = ?1", PAGE_COLUMNS))?;

        let mut pages = Vec::with_capacity(page_ids.len());
        for id in page_ids {
            if let Some(page) = stmt.query_row(params![id], page_from_row).optional()? {
                pages.push(page);
            }
        }
        Ok(pages)
    }

    fn delete_page(&mut self, page_id: i64) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM search_index WHERE page_id = ?1", params![page_id])?;
        self.conn
            .execute("DELETE FROM pages WHERE id = ?1", params![page_id])?;
        Ok(())
    }

    fn count_pages(&self, site_id: Option<i64>) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE ?1 IS NULL OR site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Lemma Management =====

    fn find_lemmas(&self, site_id: i64, lemmas: &[String]) -> StorageResult<Vec<LemmaRecord>> {
        if lemmas.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT id, site_id, lemma, frequency FROM lemmas
             WHERE site_id = ?1 AND lemma IN ({})",
            placeholders(2, lemmas.len())
        );

        let mut values: Vec<&dyn ToSql> = Vec::with_capacity(lemmas.len() + 1);
        values.push(&site_id);
        for lemma in lemmas {
            values.push(lemma);
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let found = stmt
            .query_map(values.as_slice(), lemma_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(found)
    }

    fn insert_lemmas(
        &mut self,
        site_id: i64,
        lemmas: &[(String, u64)],
    ) -> StorageResult<Vec<i64>> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO lemmas (site_id, lemma, frequency) VALUES (?1, ?2, ?3)",
        )?;

        let mut ids = Vec::with_capacity(lemmas.len());
        for (lemma, frequency) in lemmas {
            let id = stmt.insert(params![site_id, lemma, *frequency as i64])?;
            ids.push(id);
        }
        Ok(ids)
    }

    fn adjust_lemma_frequency(&mut self, lemma_id: i64, delta: i64) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE lemmas SET frequency = frequency + ?1 WHERE id = ?2",
            params![delta, lemma_id],
        )?;
        Ok(())
    }

    fn delete_lemma(&mut self, lemma_id: i64) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM search_index WHERE lemma_id = ?1", params![lemma_id])?;
        self.conn
            .execute("DELETE FROM lemmas WHERE id = ?1", params![lemma_id])?;
        Ok(())
    }

    fn lemmas_for_page(&self, page_id: i64) -> StorageResult<Vec<LemmaRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.id, l.site_id, l.lemma, l.frequency
             FROM lemmas l JOIN search_index si ON si.lemma_id = l.id
             WHERE si.page_id = ?1
             ORDER BY l.id",
        )?;
        let lemmas = stmt
            .query_map(params![page_id], lemma_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lemmas)
    }

    fn lemma_frequency(&self, lemma: &str, site_id: Option<i64>) -> StorageResult<u64> {
        let sum: Option<i64> = self.conn.query_row(
            "SELECT SUM(frequency) FROM lemmas WHERE lemma = ?1 AND (?2 IS NULL OR site_id = ?2)",
            params![lemma, site_id],
            |row| row.get(0),
        )?;
        Ok(sum.unwrap_or(0).max(0) as u64)
    }

    fn count_lemmas(&self, site_id: Option<i64>) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM lemmas WHERE ?1 IS NULL OR site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Posting Management =====

    fn insert_postings(&mut self, postings: &[NewPosting]) -> StorageResult<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO search_index (page_id, lemma_id, grade) VALUES (?1, ?2, ?3)",
        )?;

        for posting in postings {
            stmt.execute(params![posting.page_id, posting.lemma_id, posting.grade])?;
        }
        Ok(())
    }

    fn pages_for_lemma(&self, lemma: &str, site_id: Option<i64>) -> StorageResult<Vec<i64>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT DISTINCT si.page_id
             FROM search_index si JOIN lemmas l ON l.id = si.lemma_id
             WHERE l.lemma = ?1 AND (?2 IS NULL OR l.site_id = ?2)
             ORDER BY si.page_id",
        )?;
        let ids = stmt
            .query_map(params![lemma, site_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    fn grade_sum(&self, page_id: i64, lemmas: &[String]) -> StorageResult<f64> {
        if lemmas.is_empty() {
            return Ok(0.0);
        }

        let sql = format!(
            "SELECT SUM(si.grade)
             FROM search_index si JOIN lemmas l ON l.id = si.lemma_id
             WHERE si.page_id = ?1 AND l.lemma IN ({})",
            placeholders(2, lemmas.len())
        );

        let mut values: Vec<&dyn ToSql> = Vec::with_capacity(lemmas.len() + 1);
        values.push(&page_id);
        for lemma in lemmas {
            values.push(lemma);
        }

        let sum: Option<f64> = self
            .conn
            .query_row(&sql, values.as_slice(), |row| row.get(0))?;
        Ok(sum.unwrap_or(0.0))
    }

    fn count_pages_for_lemma(&self, lemma_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT page_id) FROM search_index WHERE lemma_id = ?1",
            params![lemma_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
