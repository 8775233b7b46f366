/// Site status definitions for tracking indexing progress
///
/// A site moves `Indexing -> Indexed` or `Indexing -> Failed`; only the
/// orchestrator changes it.
use std::fmt;

/// Represents the current status of a site in the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SiteStatus {
    /// A crawl of the site is in progress
    Indexing,

    /// The last crawl finished and its pages are searchable
    Indexed,

    /// The last crawl failed or was cancelled
    Failed,
}

impl SiteStatus {
    /// Returns true if the site can be searched
    pub fn is_searchable(&self) -> bool {
        matches!(self, Self::Indexed)
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Indexing => "INDEXING",
            Self::Indexed => "INDEXED",
            Self::Failed => "FAILED",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "INDEXING" => Some(Self::Indexing),
            "INDEXED" => Some(Self::Indexed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
