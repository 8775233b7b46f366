use crate::config::Config;
use crate::crawler::{page_title, plain_text};
use crate::morphology::Lemmatizer;
use crate::search::snippet::build_snippet;
use crate::storage::{self, PageRecord, SharedStorage, SiteRecord, Storage};
use crate::{Result, SearchEngineError};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// One page of search results
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    /// Number of matching pages before pagination
    pub count: usize,
    pub results: Vec<SearchResult>,
}

impl SearchResponse {
    fn empty() -> Self {
        Self {
            count: 0,
            results: Vec::new(),
        }
    }
}

/// A ranked page
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub site_url: String,
    pub site_name: String,
    pub path: String,
    pub title: Option<String>,
    pub snippet: String,
    /// Grade sum relative to the best candidate, in `[0, 1]`
    pub relevance: f64,
}

/// Answers ranked queries from the persisted index
///
/// The engine never writes; it can run while an indexing run is in flight
/// and only considers sites whose last run completed.
pub struct SearchEngine {
    config: Arc<Config>,
    storage: SharedStorage,
    lemmatizer: Arc<dyn Lemmatizer>,
}

/// A page that matched every selected lemma
struct Candidate {
    page: PageRecord,
    grade_sum: f64,
}

impl SearchEngine {
    pub fn new(
        config: Arc<Config>,
        storage: SharedStorage,
        lemmatizer: Arc<dyn Lemmatizer>,
    ) -> Self {
        Self {
            config,
            storage,
            lemmatizer,
        }
    }

    /// Runs a query
    ///
    /// # Arguments
    ///
    /// * `query` - Free text; function words and punctuation are ignored
    /// * `site` - Root URL of a configured site to restrict results to
    /// * `offset` - Number of ranked results to skip
    /// * `limit` - Page size, `search.default-limit` when `None`
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank query, an unknown or unindexed scope
    /// site, or when no site has been indexed yet.
    pub fn search(
        &self,
        query: &str,
        site: Option<&str>,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<SearchResponse> {
        if query.trim().is_empty() {
            return Err(SearchEngineError::Validation(
                "empty search query".to_string(),
            ));
        }

        let (sites, site_id) = self.resolve_scope(site)?;

        let lemmas = self.lemmatizer.lemma_set(query);
        if lemmas.is_empty() {
            debug!("Query {:?} has no searchable words", query);
            return Ok(SearchResponse::empty());
        }

        let (selected, candidates) = self.candidates(lemmas, site_id, &sites)?;
        if candidates.is_empty() {
            return Ok(SearchResponse::empty());
        }

        // Raw grade sums first; pages without a snippet must not set the maximum
        let mut results: Vec<SearchResult> = candidates
            .into_iter()
            .filter_map(|candidate| {
                let site = sites.get(&candidate.page.site_id)?;
                let text = plain_text(&candidate.page.content);
                let snippet = build_snippet(&text, &selected, self.lemmatizer.as_ref());
                if snippet.is_empty() {
                    return None;
                }

                Some(SearchResult {
                    site_url: site.url.clone(),
                    site_name: site.name.clone(),
                    title: page_title(&candidate.page.content),
                    path: candidate.page.path,
                    snippet,
                    relevance: candidate.grade_sum,
                })
            })
            .collect();

        let max_grade = results
            .iter()
            .map(|result| result.relevance)
            .fold(0.0_f64, f64::max);
        for result in &mut results {
            result.relevance = if max_grade > 0.0 {
                result.relevance / max_grade
            } else {
                0.0
            };
        }

        results.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.site_url.cmp(&b.site_url))
                .then_with(|| a.path.cmp(&b.path))
        });

        let count = results.len();
        let limit = limit.unwrap_or(self.config.search.default_limit);
        let results = results.into_iter().skip(offset).take(limit).collect();

        debug!("Query {:?} matched {} page(s)", query, count);
        Ok(SearchResponse { count, results })
    }

    /// Resolves the searchable sites, keyed by id
    ///
    /// Also returns the scope site id when `site` is given.
    fn resolve_scope(
        &self,
        site: Option<&str>,
    ) -> Result<(HashMap<i64, SiteRecord>, Option<i64>)> {
        let storage = storage::lock(&self.storage)?;

        match site {
            Some(url) => {
                let entry = self.config.site_by_url(url).ok_or_else(|| {
                    SearchEngineError::Validation(format!("site {} is not configured", url))
                })?;

                let record = storage
                    .get_site_by_url(&entry.url)?
                    .filter(|record| record.status.is_searchable())
                    .ok_or_else(|| {
                        SearchEngineError::Validation(format!(
                            "site {} is not indexed",
                            entry.url
                        ))
                    })?;

                let id = record.id;
                Ok((HashMap::from([(id, record)]), Some(id)))
            }
            None => {
                let sites: HashMap<i64, SiteRecord> = storage
                    .list_sites()?
                    .into_iter()
                    .filter(|record| record.status.is_searchable())
                    .filter(|record| self.config.site_by_url(&record.url).is_some())
                    .map(|record| (record.id, record))
                    .collect();

                if sites.is_empty() {
                    return Err(SearchEngineError::Validation(
                        "sites not indexed yet".to_string(),
                    ));
                }

                Ok((sites, None))
            }
        }
    }

    /// Selects the discriminating lemmas and the pages containing all of them
    ///
    /// Lemmas come back rarest first.
    fn candidates(
        &self,
        lemmas: HashSet<String>,
        site_id: Option<i64>,
        sites: &HashMap<i64, SiteRecord>,
    ) -> Result<(Vec<String>, Vec<Candidate>)> {
        let storage = storage::lock(&self.storage)?;
        let settings = &self.config.search;

        let mut ranked = Vec::with_capacity(lemmas.len());
        for lemma in lemmas {
            let frequency = storage.lemma_frequency(&lemma, site_id)?;
            if frequency > settings.max_lemma_frequency {
                debug!("Skipping common lemma {:?} ({} pages)", lemma, frequency);
                continue;
            }
            if frequency == 0 && settings.skip_unknown_lemmas {
                continue;
            }
            ranked.push((frequency, lemma));
        }
        ranked.sort();

        let selected: Vec<String> = ranked.into_iter().map(|(_, lemma)| lemma).collect();
        let Some((rarest, rest)) = selected.split_first() else {
            return Ok((selected, Vec::new()));
        };

        let mut page_ids: HashSet<i64> = storage
            .pages_for_lemma(rarest, site_id)?
            .into_iter()
            .collect();

        for lemma in rest {
            if page_ids.is_empty() {
                break;
            }
            let next: HashSet<i64> = storage.pages_for_lemma(lemma, site_id)?.into_iter().collect();
            page_ids.retain(|id| next.contains(id));
        }

        if page_ids.is_empty() {
            return Ok((selected, Vec::new()));
        }

        let page_ids: Vec<i64> = page_ids.into_iter().collect();
        let mut candidates = Vec::with_capacity(page_ids.len());
        for page in storage.get_pages(&page_ids)? {
            if !sites.contains_key(&page.site_id) {
                continue;
            }
            let grade_sum = storage.grade_sum(page.id, &selected)?;
            candidates.push(Candidate { page, grade_sum });
        }

        Ok((selected, candidates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::crawler::PageOutcome;
    use crate::indexer::IndexBuilder;
    use crate::morphology::SnowballLemmatizer;
    use crate::state::SiteStatus;
    use crate::storage::SqliteStorage;

    const CONFIG: &str = r#"
[output]
database-path = "./test.db"

[[sites]]
url = "https://a.com"
name = "A"

[[sites]]
url = "https://b.com"
name = "B"
"#;

    struct Fixture {
        engine: SearchEngine,
        storage: SharedStorage,
        lemmatizer: Arc<SnowballLemmatizer>,
    }

    impl Fixture {
        fn new(toml: &str) -> Self {
            let config = Arc::new(parse_config(toml).unwrap());
            let storage = storage::shared(SqliteStorage::open_in_memory().unwrap());
            let lemmatizer = Arc::new(SnowballLemmatizer::new());
            let engine = SearchEngine::new(config, storage.clone(), lemmatizer.clone());
            Self {
                engine,
                storage,
                lemmatizer,
            }
        }

        /// Indexes `pages` as (path, title, body) and marks the site with `status`
        fn index(&self, url: &str, status: SiteStatus, pages: &[(&str, &str, &str)]) {
            let outcomes: Vec<PageOutcome> = pages
                .iter()
                .map(|(path, title, body)| PageOutcome::Success {
                    path: path.to_string(),
                    status: 200,
                    content: format!(
                        "<html><head><title>{}</title></head><body><p>{}</p></body></html>",
                        title, body
                    ),
                    lemmas: self
                        .lemmatizer
                        .lemma_frequency_map(&format!("{} {}", title, body))
                        .into_iter()
                        .map(|(lemma, count)| (lemma, count as f64))
                        .collect(),
                })
                .collect();

            self.index_outcomes(url, status, &outcomes);
        }

        fn index_outcomes(&self, url: &str, status: SiteStatus, outcomes: &[PageOutcome]) {
            let mut storage = storage::lock(&self.storage).unwrap();
            let site_id = storage.upsert_site(url, url, SiteStatus::Indexing).unwrap();
            IndexBuilder::new(60)
                .index_site(&mut *storage, site_id, outcomes)
                .unwrap();
            storage.update_site_status(site_id, status, None).unwrap();
        }
    }

    fn validation_message(result: Result<SearchResponse>) -> String {
        match result {
            Err(SearchEngineError::Validation(message)) => message,
            other => panic!("expected validation error, got {:?}", other.map(|r| r.count)),
        }
    }

    #[test]
    fn test_blank_query_is_rejected() {
        let fixture = Fixture::new(CONFIG);
        let message = validation_message(fixture.engine.search("   ", None, 0, None));
        assert_eq!(message, "empty search query");
    }

    #[test]
    fn test_no_indexed_sites() {
        let fixture = Fixture::new(CONFIG);
        fixture.index("https://a.com", SiteStatus::Failed, &[("/", "Машина", "машина")]);

        let message = validation_message(fixture.engine.search("машина", None, 0, None));
        assert_eq!(message, "sites not indexed yet");
    }

    #[test]
    fn test_unknown_scope_site_is_rejected() {
        let fixture = Fixture::new(CONFIG);
        fixture.index("https://a.com", SiteStatus::Indexed, &[("/", "Машина", "машина")]);

        let message =
            validation_message(fixture.engine.search("машина", Some("https://c.com"), 0, None));
        assert!(message.contains("not configured"));
    }

    #[test]
    fn test_unindexed_scope_site_is_rejected() {
        let fixture = Fixture::new(CONFIG);
        fixture.index("https://a.com", SiteStatus::Indexed, &[("/", "Машина", "машина")]);
        fixture.index("https://b.com", SiteStatus::Indexing, &[("/", "Машина", "машина")]);

        let message =
            validation_message(fixture.engine.search("машина", Some("https://b.com/"), 0, None));
        assert!(message.contains("not indexed"));
    }

    #[test]
    fn test_punctuation_query_returns_nothing() {
        let fixture = Fixture::new(CONFIG);
        fixture.index("https://a.com", SiteStatus::Indexed, &[("/", "Машина", "машина")]);

        let response = fixture.engine.search("?!... ,", None, 0, None).unwrap();
        assert_eq!(response.count, 0);
        assert!(response.results.is_empty());
    }

    #[test]
    fn test_relevance_is_normalized() {
        let fixture = Fixture::new(CONFIG);
        fixture.index(
            "https://a.com",
            SiteStatus::Indexed,
            &[
                ("/one", "Машина", "красная машина едет"),
                ("/two", "Гараж", "машина стоит"),
                ("/three", "Дом", "здесь ничего нет"),
            ],
        );

        let response = fixture.engine.search("машина", None, 0, None).unwrap();

        assert_eq!(response.count, 2);
        assert_eq!(response.results[0].path, "/one");
        assert_eq!(response.results[0].relevance, 1.0);
        assert_eq!(response.results[0].title.as_deref(), Some("Машина"));
        assert!(response
            .results
            .iter()
            .all(|result| result.relevance > 0.0 && result.relevance <= 1.0));
        assert!(response.results[1].relevance < 1.0);
        assert!(response.results[1].snippet.contains("<b>машина</b>"));
    }

    #[test]
    fn test_relevance_ignores_pages_without_snippet() {
        let fixture = Fixture::new(CONFIG);
        let lemma = fixture.lemmatizer.lemma_of("машина").unwrap();
        let page = |path: &str, body: &str, grade: f64| PageOutcome::Success {
            path: path.to_string(),
            status: 200,
            content: format!("<html><body><p>{}</p></body></html>", body),
            lemmas: [(lemma.clone(), grade)].into_iter().collect(),
        };

        // "/stale" is graded higher but its text no longer holds the word
        fixture.index_outcomes(
            "https://a.com",
            SiteStatus::Indexed,
            &[page("/stale", "пусто", 5.0), page("/fresh", "машина", 1.0)],
        );

        let response = fixture.engine.search("машина", None, 0, None).unwrap();

        assert_eq!(response.count, 1);
        assert_eq!(response.results[0].path, "/fresh");
        assert_eq!(response.results[0].relevance, 1.0);
    }

    #[test]
    fn test_all_lemmas_must_match() {
        let fixture = Fixture::new(CONFIG);
        fixture.index(
            "https://a.com",
            SiteStatus::Indexed,
            &[
                ("/both", "Дорога", "красная машина"),
                ("/one", "Дорога", "синяя машина"),
            ],
        );

        let response = fixture.engine.search("красная машина", None, 0, None).unwrap();

        assert_eq!(response.count, 1);
        assert_eq!(response.results[0].path, "/both");
    }

    #[test]
    fn test_unknown_lemma_matches_nothing_unless_skipped() {
        let fixture = Fixture::new(CONFIG);
        fixture.index("https://a.com", SiteStatus::Indexed, &[("/", "Дорога", "машина")]);

        let response = fixture.engine.search("машина самолет", None, 0, None).unwrap();
        assert_eq!(response.count, 0);

        let skipping = Fixture::new(&format!("[search]\nskip-unknown-lemmas = true\n{}", CONFIG));
        skipping.index("https://a.com", SiteStatus::Indexed, &[("/", "Дорога", "машина")]);

        let response = skipping.engine.search("машина самолет", None, 0, None).unwrap();
        assert_eq!(response.count, 1);
    }

    #[test]
    fn test_common_lemmas_are_dropped() {
        let fixture = Fixture::new(&format!("[search]\nmax-lemma-frequency = 1\n{}", CONFIG));
        fixture.index(
            "https://a.com",
            SiteStatus::Indexed,
            &[("/one", "Дорога", "машина"), ("/two", "Дорога", "машина гараж")],
        );

        // "машина" is on two pages and is ignored; only "гараж" decides
        let response = fixture.engine.search("машина гараж", None, 0, None).unwrap();
        assert_eq!(response.count, 1);
        assert_eq!(response.results[0].path, "/two");
    }

    #[test]
    fn test_global_search_skips_unindexed_sites() {
        let fixture = Fixture::new(CONFIG);
        fixture.index("https://a.com", SiteStatus::Indexed, &[("/", "А", "машина")]);
        fixture.index("https://b.com", SiteStatus::Failed, &[("/", "Б", "машина")]);

        let response = fixture.engine.search("машина", None, 0, None).unwrap();

        assert_eq!(response.count, 1);
        assert_eq!(response.results[0].site_url, "https://a.com");
    }

    #[test]
    fn test_pagination_keeps_total_count() {
        let fixture = Fixture::new(CONFIG);
        fixture.index(
            "https://a.com",
            SiteStatus::Indexed,
            &[
                ("/1", "Дорога", "машина"),
                ("/2", "Дорога", "машина"),
                ("/3", "Дорога", "машина"),
            ],
        );

        let response = fixture.engine.search("машина", None, 1, Some(1)).unwrap();

        assert_eq!(response.count, 3);
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].path, "/2");
    }

    #[test]
    fn test_scoped_search() {
        let fixture = Fixture::new(CONFIG);
        fixture.index("https://a.com", SiteStatus::Indexed, &[("/", "А", "машина")]);
        fixture.index("https://b.com", SiteStatus::Indexed, &[("/", "Б", "машина")]);

        let response = fixture
            .engine
            .search("машина", Some("https://b.com"), 0, None)
            .unwrap();

        assert_eq!(response.count, 1);
        assert_eq!(response.results[0].site_name, "https://b.com");
    }
}
