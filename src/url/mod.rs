//! URL handling for Lemmascope
//!
//! This module provides URL normalization and the site boundary used to
//! turn absolute URLs into site-relative page paths and to filter links.

mod boundary;
mod normalize;

pub use boundary::SiteBoundary;
pub use normalize::{normalize_path, normalize_url};
