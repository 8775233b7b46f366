//! Per-page results of a crawl

use std::collections::HashMap;

/// Weighted rank of each lemma on a page
pub type LemmaRanks = HashMap<String, f64>;

/// Result of crawling a single page
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// The page was fetched (2xx, HTML) and analysed
    Success {
        /// Site-relative path
        path: String,
        /// HTTP status code
        status: u16,
        /// Raw HTML
        content: String,
        /// Lemma -> sum of occurrence count times selector weight
        lemmas: LemmaRanks,
    },

    /// The page could not be fetched or was not usable
    Failure {
        /// Site-relative path
        path: String,
        /// HTTP status code, when the server answered
        status: Option<u16>,
        /// Error description
        error: String,
    },
}

impl PageOutcome {
    /// Returns the site-relative path of the page
    pub fn path(&self) -> &str {
        match self {
            Self::Success { path, .. } | Self::Failure { path, .. } => path,
        }
    }

    /// Returns true if the page could not be crawled
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// Returns the error description of a failed page
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failure { error, .. } => Some(error),
            Self::Success { .. } => None,
        }
    }
}

/// Builds the error message of a site whose pages all failed
///
/// The message starts with `Total errors: N. ` and lists one
/// `path: description;` entry per failed page.
pub fn aggregate_failures(outcomes: &[PageOutcome]) -> Option<String> {
    if outcomes.is_empty() || !outcomes.iter().all(PageOutcome::is_failure) {
        return None;
    }

    let details: Vec<String> = outcomes
        .iter()
        .filter_map(|outcome| {
            outcome
                .error()
                .map(|error| format!("{}: {};", outcome.path(), error))
        })
        .collect();

    Some(format!(
        "Total errors: {}. {}",
        details.len(),
        details.join(" ")
    ))
}
