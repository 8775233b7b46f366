//! State module for tracking indexing progress
//!
//! This module provides state management for sites and for the indexing pipeline.
//!
//! # Components
//!
//! - `SiteStatus`: Tracks the lifecycle of a configured site (indexing, indexed, failed)
//! - `IndexingState`: Tracks whether the indexing pipeline is idle or running

mod indexing_state;
mod site_status;

// Re-export main types
pub use indexing_state::{IndexingState, RunHandle};
pub use site_status::SiteStatus;
