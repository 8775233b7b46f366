//! Index builder
//!
//! Turns the flat outcome list of a crawl into pages, lemmas and postings.
//! Lemma frequencies are maintained here on every insert, replace and delete.

mod builder;

pub use builder::{IndexBuilder, IndexSummary};
