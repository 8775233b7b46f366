use crate::crawler::{LemmaRanks, PageOutcome};
use crate::storage::{NewPage, NewPosting, Storage, StorageResult};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Row counts written by one builder operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexSummary {
    pub pages: usize,
    pub lemmas: usize,
    pub postings: usize,
}

/// Writes crawl outcomes into the index in fixed-size batches
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    batch_size: usize,
}

impl IndexBuilder {
    /// Creates a builder; a batch size of zero is treated as one
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Replaces everything stored for a site with the given crawl outcomes
    ///
    /// Runs inside one transaction. Only successful outcomes become pages;
    /// when two outcomes share a path the first one wins.
    ///
    /// # Arguments
    ///
    /// * `storage` - The storage backend
    /// * `site_id` - The site being rebuilt
    /// * `outcomes` - Flat outcome list of the site's crawl
    pub fn index_site<S: Storage>(
        &self,
        storage: &mut S,
        site_id: i64,
        outcomes: &[PageOutcome],
    ) -> StorageResult<IndexSummary> {
        let pages = unique_pages(outcomes);

        storage.with_transaction(|storage| {
            storage.delete_site_data(site_id)?;

            let mut page_ids = Vec::with_capacity(pages.len());
            for chunk in pages.chunks(self.batch_size) {
                let rows: Vec<NewPage> = chunk.iter().map(|(page, _)| page.clone()).collect();
                page_ids.extend(storage.insert_pages(site_id, &rows)?);
            }

            // Lemma -> number of pages containing it; ordered for stable row IDs
            let mut page_counts: BTreeMap<&str, u64> = BTreeMap::new();
            for (_, lemmas) in &pages {
                for lemma in lemmas.keys() {
                    *page_counts.entry(lemma.as_str()).or_insert(0) += 1;
                }
            }

            let lemma_rows: Vec<(String, u64)> = page_counts
                .iter()
                .map(|(lemma, count)| (lemma.to_string(), *count))
                .collect();

            let mut lemma_ids: HashMap<String, i64> = HashMap::with_capacity(lemma_rows.len());
            for chunk in lemma_rows.chunks(self.batch_size) {
                let ids = storage.insert_lemmas(site_id, chunk)?;
                for ((lemma, _), id) in chunk.iter().zip(ids) {
                    lemma_ids.insert(lemma.clone(), id);
                }
            }

            let mut postings = Vec::new();
            for ((_, lemmas), page_id) in pages.iter().zip(&page_ids) {
                postings.extend(postings_for(*page_id, lemmas, &lemma_ids));
            }

            for chunk in postings.chunks(self.batch_size) {
                storage.insert_postings(chunk)?;
            }

            tracing::debug!(
                "Site {}: wrote {} pages, {} lemmas, {} postings",
                site_id,
                page_ids.len(),
                lemma_rows.len(),
                postings.len()
            );

            Ok(IndexSummary {
                pages: page_ids.len(),
                lemmas: lemma_rows.len(),
                postings: postings.len(),
            })
        })
    }

    /// Re-indexes one page of a site in place
    ///
    /// The old page, its postings and its share of every lemma frequency are
    /// removed; lemmas no longer referenced anywhere are deleted. The new
    /// content is then inserted, incrementing existing lemmas or creating
    /// them with frequency 1. A failed outcome leaves the index untouched.
    pub fn replace_page<S: Storage>(
        &self,
        storage: &mut S,
        site_id: i64,
        outcome: &PageOutcome,
    ) -> StorageResult<IndexSummary> {
        let PageOutcome::Success {
            path,
            status,
            content,
            lemmas,
        } = outcome
        else {
            return Ok(IndexSummary::default());
        };

        storage.with_transaction(|storage| {
            if let Some(old_page) = storage.find_page(site_id, path)? {
                let old_lemmas = storage.lemmas_for_page(old_page.id)?;
                storage.delete_page(old_page.id)?;

                for lemma in old_lemmas {
                    if lemma.frequency <= 1 {
                        storage.delete_lemma(lemma.id)?;
                    } else {
                        storage.adjust_lemma_frequency(lemma.id, -1)?;
                    }
                }
            }

            let page_ids = storage.insert_pages(
                site_id,
                &[NewPage {
                    path: path.clone(),
                    code: *status,
                    content: content.clone(),
                }],
            )?;
            let Some(&page_id) = page_ids.first() else {
                return Ok(IndexSummary::default());
            };

            let mut texts: Vec<String> = lemmas.keys().cloned().collect();
            texts.sort();

            let mut lemma_ids: HashMap<String, i64> = HashMap::with_capacity(texts.len());
            for chunk in texts.chunks(self.batch_size) {
                for existing in storage.find_lemmas(site_id, chunk)? {
                    storage.adjust_lemma_frequency(existing.id, 1)?;
                    lemma_ids.insert(existing.lemma, existing.id);
                }
            }

            let fresh: Vec<(String, u64)> = texts
                .iter()
                .filter(|lemma| !lemma_ids.contains_key(*lemma))
                .map(|lemma| (lemma.clone(), 1))
                .collect();
            for chunk in fresh.chunks(self.batch_size) {
                let ids = storage.insert_lemmas(site_id, chunk)?;
                for ((lemma, _), id) in chunk.iter().zip(ids) {
                    lemma_ids.insert(lemma.clone(), id);
                }
            }

            let postings = postings_for(page_id, lemmas, &lemma_ids);
            for chunk in postings.chunks(self.batch_size) {
                storage.insert_postings(chunk)?;
            }

            Ok(IndexSummary {
                pages: 1,
                lemmas: fresh.len(),
                postings: postings.len(),
            })
        })
    }
}

/// Collects the successful outcomes as page rows, first occurrence per path
fn unique_pages(outcomes: &[PageOutcome]) -> Vec<(NewPage, &LemmaRanks)> {
    let mut seen = HashSet::new();
    let mut pages = Vec::new();

    for outcome in outcomes {
        if let PageOutcome::Success {
            path,
            status,
            content,
            lemmas,
        } = outcome
        {
            if !seen.insert(path.as_str()) {
                continue;
            }
            pages.push((
                NewPage {
                    path: path.clone(),
                    code: *status,
                    content: content.clone(),
                },
                lemmas,
            ));
        }
    }

    pages
}

fn postings_for(
    page_id: i64,
    lemmas: &LemmaRanks,
    lemma_ids: &HashMap<String, i64>,
) -> Vec<NewPosting> {
    let mut postings: Vec<NewPosting> = lemmas
        .iter()
        .filter_map(|(lemma, grade)| {
            lemma_ids.get(lemma).map(|&lemma_id| NewPosting {
                page_id,
                lemma_id,
                grade: *grade,
            })
        })
        .collect();
    postings.sort_by_key(|posting| posting.lemma_id);
    postings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SiteStatus;
    use crate::storage::SqliteStorage;

    fn success(path: &str, lemmas: &[(&str, f64)]) -> PageOutcome {
        PageOutcome::Success {
            path: path.to_string(),
            status: 200,
            content: format!("<html><title>{}</title></html>", path),
            lemmas: lemmas
                .iter()
                .map(|(lemma, grade)| (lemma.to_string(), *grade))
                .collect(),
        }
    }

    fn failure(path: &str) -> PageOutcome {
        PageOutcome::Failure {
            path: path.to_string(),
            status: Some(500),
            error: "HTTP 500".to_string(),
        }
    }

    fn setup() -> (SqliteStorage, i64) {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        let site = storage
            .upsert_site("https://example.com", "Example", SiteStatus::Indexing)
            .unwrap();
        (storage, site)
    }

    fn frequency(storage: &SqliteStorage, site: i64, lemma: &str) -> Option<u64> {
        storage
            .find_lemmas(site, &[lemma.to_string()])
            .unwrap()
            .first()
            .map(|record| record.frequency)
    }

    #[test]
    fn test_index_site_counts_pages_per_lemma() {
        let (mut storage, site) = setup();
        let outcomes = vec![
            success("/", &[("тест", 2.0), ("сайт", 1.0)]),
            success("/a", &[("тест", 0.8)]),
            failure("/broken"),
        ];

        let summary = IndexBuilder::new(60)
            .index_site(&mut storage, site, &outcomes)
            .unwrap();

        assert_eq!(
            summary,
            IndexSummary {
                pages: 2,
                lemmas: 2,
                postings: 3
            }
        );
        assert_eq!(frequency(&storage, site, "тест"), Some(2));
        assert_eq!(frequency(&storage, site, "сайт"), Some(1));
        assert!(storage.find_page(site, "/broken").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_paths_keep_first() {
        let (mut storage, site) = setup();
        let outcomes = vec![success("/a", &[("один", 1.0)]), success("/a", &[("два", 1.0)])];

        IndexBuilder::new(60)
            .index_site(&mut storage, site, &outcomes)
            .unwrap();

        assert_eq!(storage.count_pages(Some(site)).unwrap(), 1);
        assert_eq!(frequency(&storage, site, "один"), Some(1));
        assert_eq!(frequency(&storage, site, "два"), None);
    }

    #[test]
    fn test_batch_size_does_not_change_rows() {
        let outcomes: Vec<PageOutcome> = (0..7)
            .map(|i| success(&format!("/p{}", i), &[("общий", 1.0), ("слово", 0.5)]))
            .collect();

        let (mut small, small_site) = setup();
        IndexBuilder::new(2)
            .index_site(&mut small, small_site, &outcomes)
            .unwrap();

        let (mut large, large_site) = setup();
        IndexBuilder::new(60)
            .index_site(&mut large, large_site, &outcomes)
            .unwrap();

        assert_eq!(small.count_pages(None).unwrap(), 7);
        assert_eq!(large.count_pages(None).unwrap(), 7);
        assert_eq!(frequency(&small, small_site, "общий"), Some(7));
        assert_eq!(frequency(&large, large_site, "общий"), Some(7));
    }

    #[test]
    fn test_reindexing_replaces_previous_rows() {
        let (mut storage, site) = setup();
        let builder = IndexBuilder::new(60);

        builder
            .index_site(&mut storage, site, &[success("/", &[("старый", 1.0)])])
            .unwrap();
        builder
            .index_site(&mut storage, site, &[success("/", &[("новый", 1.0)])])
            .unwrap();

        assert_eq!(frequency(&storage, site, "старый"), None);
        assert_eq!(frequency(&storage, site, "новый"), Some(1));
        assert_eq!(storage.count_pages(Some(site)).unwrap(), 1);
    }

    #[test]
    fn test_replace_page_decrements_shared_lemma() {
        let (mut storage, site) = setup();
        let builder = IndexBuilder::new(60);
        builder
            .index_site(
                &mut storage,
                site,
                &[
                    success("/", &[("тест", 1.0)]),
                    success("/a", &[("тест", 1.0)]),
                ],
            )
            .unwrap();

        builder
            .replace_page(&mut storage, site, &success("/a", &[("другой", 1.0)]))
            .unwrap();

        assert_eq!(frequency(&storage, site, "тест"), Some(1));
        assert_eq!(frequency(&storage, site, "другой"), Some(1));
    }

    #[test]
    fn test_replace_page_deletes_orphaned_lemma() {
        let (mut storage, site) = setup();
        let builder = IndexBuilder::new(60);
        builder
            .index_site(
                &mut storage,
                site,
                &[success("/", &[("общий", 1.0)]), success("/a", &[("тест", 1.0)])],
            )
            .unwrap();

        builder
            .replace_page(&mut storage, site, &success("/a", &[("общий", 2.0)]))
            .unwrap();

        assert_eq!(frequency(&storage, site, "тест"), None);
        assert_eq!(frequency(&storage, site, "общий"), Some(2));
        assert_eq!(storage.count_pages(Some(site)).unwrap(), 2);
    }

    #[test]
    fn test_replace_page_with_failure_is_noop() {
        let (mut storage, site) = setup();
        let builder = IndexBuilder::new(60);
        builder
            .index_site(&mut storage, site, &[success("/a", &[("тест", 1.0)])])
            .unwrap();

        let summary = builder
            .replace_page(&mut storage, site, &failure("/a"))
            .unwrap();

        assert_eq!(summary, IndexSummary::default());
        assert_eq!(frequency(&storage, site, "тест"), Some(1));
    }
}
