//! Output module for reporting index statistics and search results
//!
//! This module handles:
//! - Collecting per-site and total statistics from storage
//! - Printing statistics and search results for the command line

mod results;
mod stats;

pub use results::print_search_results;
pub use stats::{collect_statistics, print_statistics, SiteStatistics, Statistics, TotalStatistics};
