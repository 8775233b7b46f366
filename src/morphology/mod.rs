//! Morphological analysis
//!
//! The index and the query engine only talk to the [`Lemmatizer`] trait; the
//! shipped implementation is [`SnowballLemmatizer`].

mod snowball;
mod stopwords;

pub use snowball::SnowballLemmatizer;

use std::collections::{HashMap, HashSet};

/// Reduces text to lemmas and maps lemmas back to word forms
pub trait Lemmatizer: Send + Sync {
    /// Returns every lemma of `text` with its number of occurrences
    ///
    /// Function words are dropped. Blank text yields an empty map.
    fn lemma_frequency_map(&self, text: &str) -> HashMap<String, u32>;

    /// Returns the distinct lemmas of `text`
    fn lemma_set(&self, text: &str) -> HashSet<String> {
        self.lemma_frequency_map(text).into_keys().collect()
    }

    /// Returns the known surface forms of `lemma`
    ///
    /// The result may be empty when the lemma was never observed.
    fn word_forms(&self, lemma: &str) -> HashSet<String>;

    /// Returns the lemma of a single word, or `None` for function words
    fn lemma_of(&self, word: &str) -> Option<String> {
        self.lemma_frequency_map(word).into_keys().next()
    }
}

/// Splits text into runs of alphabetic characters
pub(crate) fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphabetic())
        .filter(|word| !word.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_split_on_non_alphabetic() {
        let collected: Vec<&str> = words("Привет, мир! hello-world 42x").collect();
        assert_eq!(collected, vec!["Привет", "мир", "hello", "world", "x"]);
    }

    #[test]
    fn test_words_of_punctuation() {
        assert_eq!(words("?!... --- 123").count(), 0);
    }
}
