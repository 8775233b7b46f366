//! Display of search results

use crate::search::SearchResponse;

/// Prints a page of search results to stdout
///
/// Snippet emphasis is shown as-is, since terminals cannot render it.
pub fn print_search_results(response: &SearchResponse, offset: usize) {
    println!("Found {} result(s)\n", response.count);

    for (index, result) in response.results.iter().enumerate() {
        println!(
            "{}. {} [{:.3}]",
            offset + index + 1,
            result.title.as_deref().unwrap_or(&result.path),
            result.relevance
        );
        println!("   {}{}", result.site_url, result.path);
        println!("   {}", result.snippet);
        println!();
    }
}
