use crate::url::normalize::normalize_path;
use crate::UrlError;

/// Substring that marks links leaving the site through a redirect page
const EXTERNAL_LINK_MARKER: &str = "extlink";

/// Characters that disqualify a link from being crawled
const REJECTED_CHARS: &[char] = &['#', '?', '=', ' '];

/// The crawl boundary of one configured site
///
/// The boundary is the site's root URL without a trailing slash. Every page
/// of the site is addressed by its path relative to this root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteBoundary {
    root: String,
}

impl SiteBoundary {
    /// Creates a boundary from a site root URL
    pub fn new(root: &str) -> Self {
        Self {
            root: root.trim().trim_end_matches('/').to_string(),
        }
    }

    /// Returns the root URL without a trailing slash
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Returns true if `url` lies inside this boundary
    pub fn contains(&self, url: &str) -> bool {
        url.starts_with(&self.root)
    }

    /// Returns the site-relative path of `url`
    ///
    /// The root itself maps to `/`.
    ///
    /// # Examples
    ///
    /// ```
    /// use lemmascope::url::SiteBoundary;
    ///
    /// let boundary = SiteBoundary::new("https://example.com/");
    /// assert_eq!(boundary.path_of("https://example.com").unwrap(), "/");
    /// assert_eq!(boundary.path_of("https://example.com/news").unwrap(), "/news");
    /// ```
    pub fn path_of(&self, url: &str) -> Result<String, UrlError> {
        match url.strip_prefix(&self.root) {
            Some("") => Ok("/".to_string()),
            Some(rest) => Ok(rest.to_string()),
            None => Err(UrlError::OutsideBoundary {
                url: url.to_string(),
                boundary: self.root.clone(),
            }),
        }
    }

    /// Returns the key used to deduplicate pages of this site during a crawl
    pub fn visit_key(&self, url: &str) -> Result<String, UrlError> {
        self.path_of(url).map(|path| normalize_path(&path))
    }

    /// Builds the absolute URL of a site-relative path
    pub fn url_for(&self, path: &str) -> String {
        if path == "/" {
            format!("{}/", self.root)
        } else {
            format!("{}{}", self.root, path)
        }
    }

    /// Cuts an absolute link down to one path segment below `page_url`
    ///
    /// From `https://example.com/news`, the link
    /// `https://example.com/news/2024/item` becomes
    /// `https://example.com/news/2024`.
    pub fn truncate_link<'a>(&self, page_url: &str, link: &'a str) -> &'a str {
        let start = page_url.trim_end_matches('/').len() + 1;
        match link.get(start..).and_then(|tail| tail.find('/')) {
            Some(index) => &link[..start + index],
            None => link,
        }
    }

    /// Returns true if a truncated link should be crawled from `page_url`
    ///
    /// The link must stay inside the site and continue past `page_url/`,
    /// and must not carry a fragment, query, space or the external-link
    /// marker.
    pub fn is_crawlable_link(&self, page_url: &str, link: &str) -> bool {
        let parent = page_url.trim_end_matches('/');

        is_below(link, &self.root)
            && is_below(link, parent)
            && link.len() > parent.len() + 1
            && !link.contains(REJECTED_CHARS)
            && !link.contains(EXTERNAL_LINK_MARKER)
    }
}

/// Returns true if `link` is `prefix` followed by a `/`
fn is_below(link: &str, prefix: &str) -> bool {
    link.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_trimmed() {
        let boundary = SiteBoundary::new("https://example.com/");
        assert_eq!(boundary.root(), "https://example.com");
        assert_eq!(boundary.url_for("/"), "https://example.com/");
        assert_eq!(boundary.url_for("/news"), "https://example.com/news");
    }

    #[test]
    fn test_path_of() {
        let boundary = SiteBoundary::new("https://example.com");
        assert_eq!(boundary.path_of("https://example.com").unwrap(), "/");
        assert_eq!(boundary.path_of("https://example.com/").unwrap(), "/");
        assert_eq!(
            boundary.path_of("https://example.com/news/1").unwrap(),
            "/news/1"
        );
        assert!(matches!(
            boundary.path_of("https://other.org/news"),
            Err(UrlError::OutsideBoundary { .. })
        ));
    }

    #[test]
    fn test_visit_key_ignores_trailing_slash() {
        let boundary = SiteBoundary::new("https://example.com");
        assert_eq!(
            boundary.visit_key("https://example.com/news/").unwrap(),
            boundary.visit_key("https://example.com/news").unwrap()
        );
        assert_eq!(boundary.visit_key("https://example.com/").unwrap(), "/");
    }

    #[test]
    fn test_truncate_link() {
        let boundary = SiteBoundary::new("https://example.com");
        let root = "https://example.com/";
        assert_eq!(
            boundary.truncate_link(root, "https://example.com/news/2024/item"),
            "https://example.com/news"
        );
        assert_eq!(
            boundary.truncate_link(root, "https://example.com/about"),
            "https://example.com/about"
        );
        assert_eq!(
            boundary.truncate_link(root, "https://example.com/"),
            "https://example.com/"
        );
        assert_eq!(boundary.truncate_link(root, "https://ex"), "https://ex");
    }

    #[test]
    fn test_truncate_link_below_current_page() {
        let boundary = SiteBoundary::new("https://example.com");
        let page = "https://example.com/news";
        assert_eq!(
            boundary.truncate_link(page, "https://example.com/news/2024/item"),
            "https://example.com/news/2024"
        );
        assert_eq!(
            boundary.truncate_link(
                "https://example.com/news/2024",
                "https://example.com/news/2024/item"
            ),
            "https://example.com/news/2024/item"
        );
    }

    #[test]
    fn test_truncate_link_with_path_root() {
        let boundary = SiteBoundary::new("https://example.com/blog");
        assert_eq!(
            boundary.truncate_link(
                "https://example.com/blog/",
                "https://example.com/blog/post/comments"
            ),
            "https://example.com/blog/post"
        );
    }

    #[test]
    fn test_is_crawlable_link() {
        let boundary = SiteBoundary::new("https://example.com");
        let root = "https://example.com/";

        assert!(boundary.is_crawlable_link(root, "https://example.com/news"));

        assert!(!boundary.is_crawlable_link(root, "https://example.com"));
        assert!(!boundary.is_crawlable_link(root, "https://example.com/"));
        assert!(!boundary.is_crawlable_link(root, "https://example.community/x"));
        assert!(!boundary.is_crawlable_link(root, "https://other.org/news"));
        assert!(!boundary.is_crawlable_link(root, "https://example.com/news#top"));
        assert!(!boundary.is_crawlable_link(root, "https://example.com/search?q"));
        assert!(!boundary.is_crawlable_link(root, "https://example.com/a=b"));
        assert!(!boundary.is_crawlable_link(root, "https://example.com/a b"));
        assert!(!boundary.is_crawlable_link(root, "https://example.com/extlink"));
    }

    #[test]
    fn test_crawlable_links_lie_below_current_page() {
        let boundary = SiteBoundary::new("https://example.com");
        let page = "https://example.com/news";

        assert!(boundary.is_crawlable_link(page, "https://example.com/news/item"));

        assert!(!boundary.is_crawlable_link(page, "https://example.com/news"));
        assert!(!boundary.is_crawlable_link(page, "https://example.com/news/"));
        assert!(!boundary.is_crawlable_link(page, "https://example.com/newsroom"));
        assert!(!boundary.is_crawlable_link(page, "https://example.com/about"));
    }
}
