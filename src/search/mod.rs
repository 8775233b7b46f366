//! Query engine
//!
//! Answers ranked full-text queries from the persisted index. Queries are
//! reduced to lemmas, the rarest lemma's pages are intersected with the rest,
//! and every surviving page is scored and given a highlighted snippet.

mod engine;
mod snippet;

pub use engine::{SearchEngine, SearchResponse, SearchResult};
pub use snippet::build_snippet;
