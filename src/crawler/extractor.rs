//! Lexical extraction of weighted lemmas from a parsed page

use crate::config::SelectorEntry;
use crate::crawler::outcome::LemmaRanks;
use crate::crawler::parser::select_text;
use crate::morphology::Lemmatizer;
use crate::ConfigError;
use scraper::{Html, Selector};
use std::sync::Arc;

/// A compiled selector rule
struct WeightedSelector {
    selector: Selector,
    weight: f64,
}

/// Turns a page into a lemma -> weighted rank map
///
/// Each configured region contributes `count * weight` for every lemma it
/// contains; contributions of different regions are summed.
pub struct LexicalExtractor {
    rules: Vec<WeightedSelector>,
    lemmatizer: Arc<dyn Lemmatizer>,
}

impl LexicalExtractor {
    /// Compiles the selector rules
    pub fn new(
        entries: &[SelectorEntry],
        lemmatizer: Arc<dyn Lemmatizer>,
    ) -> Result<Self, ConfigError> {
        let rules = entries
            .iter()
            .map(|entry| {
                Selector::parse(&entry.selector)
                    .map(|selector| WeightedSelector {
                        selector,
                        weight: entry.weight,
                    })
                    .map_err(|e| {
                        ConfigError::InvalidSelector(format!("'{}': {:?}", entry.selector, e))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rules, lemmatizer })
    }

    /// Computes the weighted lemma ranks of a document
    pub fn extract(&self, document: &Html) -> LemmaRanks {
        let mut ranks = LemmaRanks::new();

        for rule in &self.rules {
            let text = select_text(document, &rule.selector);
            for (lemma, count) in self.lemmatizer.lemma_frequency_map(&text) {
                *ranks.entry(lemma).or_insert(0.0) += f64::from(count) * rule.weight;
            }
        }

        ranks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morphology::SnowballLemmatizer;

    fn entry(selector: &str, weight: f64) -> SelectorEntry {
        SelectorEntry {
            name: selector.to_string(),
            selector: selector.to_string(),
            weight,
        }
    }

    #[test]
    fn test_weights_are_summed_across_regions() {
        let extractor = LexicalExtractor::new(
            &[entry("title", 1.0), entry("body", 0.8)],
            Arc::new(SnowballLemmatizer::new()),
        )
        .unwrap();

        let document = Html::parse_document(
            "<html><head><title>Тест</title></head><body>тест и тест</body></html>",
        );
        let ranks = extractor.extract(&document);

        assert_eq!(ranks.len(), 1);
        let rank = ranks.get("тест").copied().unwrap();
        assert!((rank - 2.6).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_selector() {
        let result = LexicalExtractor::new(
            &[entry("div[", 1.0)],
            Arc::new(SnowballLemmatizer::new()),
        );
        assert!(matches!(result, Err(ConfigError::InvalidSelector(_))));
    }

    #[test]
    fn test_page_without_text() {
        let extractor = LexicalExtractor::new(
            &[entry("body", 1.0)],
            Arc::new(SnowballLemmatizer::new()),
        )
        .unwrap();
        let ranks = extractor.extract(&Html::parse_document("<html><body></body></html>"));
        assert!(ranks.is_empty());
    }
}
