use super::stopwords::is_stop_word;
use super::{words, Lemmatizer};
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// Number of distinct lemmas whose surface forms are remembered
const MAX_RECORDED_LEMMAS: usize = 50_000;

/// Number of surface forms remembered per lemma
const MAX_FORMS_PER_LEMMA: usize = 16;

/// Lemmatizer backed by the Snowball stemmers
///
/// Cyrillic words go through the Russian stemmer, everything else through
/// the English one. Surface forms seen while lemmatizing are remembered, up
/// to a fixed number of lemmas and forms, so that
/// [`Lemmatizer::word_forms`] can return them later.
pub struct SnowballLemmatizer {
    russian: Stemmer,
    english: Stemmer,
    forms: RwLock<HashMap<String, HashSet<String>>>,
}

impl Default for SnowballLemmatizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SnowballLemmatizer {
    pub fn new() -> Self {
        Self {
            russian: Stemmer::create(Algorithm::Russian),
            english: Stemmer::create(Algorithm::English),
            forms: RwLock::new(HashMap::new()),
        }
    }

    /// Stems one lower-cased word, or returns `None` for a function word
    fn stem(&self, word: &str) -> Option<String> {
        if is_stop_word(word) {
            return None;
        }

        let stemmer = if word.chars().any(is_cyrillic) {
            &self.russian
        } else {
            &self.english
        };

        let stem = stemmer.stem(word).into_owned();
        if stem.is_empty() {
            None
        } else {
            Some(stem)
        }
    }

    fn remember(&self, observed: Vec<(String, String)>) {
        if observed.is_empty() {
            return;
        }

        // A poisoned lock only loses highlighting hints, never index data
        if let Ok(mut forms) = self.forms.write() {
            for (lemma, form) in observed {
                if !forms.contains_key(&lemma) && forms.len() >= MAX_RECORDED_LEMMAS {
                    continue;
                }
                let known = forms.entry(lemma).or_default();
                if known.len() < MAX_FORMS_PER_LEMMA {
                    known.insert(form);
                }
            }
        }
    }
}

impl Lemmatizer for SnowballLemmatizer {
    fn lemma_frequency_map(&self, text: &str) -> HashMap<String, u32> {
        let mut frequencies = HashMap::new();
        let mut observed = Vec::new();

        for word in words(text) {
            let lowercase = word.to_lowercase();
            if let Some(lemma) = self.stem(&lowercase) {
                *frequencies.entry(lemma.clone()).or_insert(0) += 1;
                observed.push((lemma, lowercase));
            }
        }

        self.remember(observed);
        frequencies
    }

    fn word_forms(&self, lemma: &str) -> HashSet<String> {
        let mut result = self
            .forms
            .read()
            .ok()
            .and_then(|forms| forms.get(lemma).cloned())
            .unwrap_or_default();
        result.insert(lemma.to_string());
        result
    }

    fn lemma_of(&self, word: &str) -> Option<String> {
        self.stem(&word.to_lowercase())
    }
}

fn is_cyrillic(c: char) -> bool {
    matches!(c, '\u{0400}'..='\u{04FF}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_map_counts_inflections_together() {
        let lemmatizer = SnowballLemmatizer::new();
        let map = lemmatizer.lemma_frequency_map("Машина и машины, машину!");

        assert_eq!(map.len(), 1);
        assert_eq!(map.values().copied().sum::<u32>(), 3);
    }

    #[test]
    fn test_function_words_dropped() {
        let lemmatizer = SnowballLemmatizer::new();
        let map = lemmatizer.lemma_frequency_map("и в на под the of and");
        assert!(map.is_empty());
    }

    #[test]
    fn test_blank_text() {
        let lemmatizer = SnowballLemmatizer::new();
        assert!(lemmatizer.lemma_frequency_map("   ").is_empty());
        assert!(lemmatizer.lemma_set("...!?").is_empty());
    }

    #[test]
    fn test_english_words_use_english_stemmer() {
        let lemmatizer = SnowballLemmatizer::new();
        let set = lemmatizer.lemma_set("running runs");
        assert_eq!(set.len(), 1);
        assert!(set.contains("run"));
    }

    #[test]
    fn test_word_forms_are_recorded() {
        let lemmatizer = SnowballLemmatizer::new();
        let lemma = lemmatizer.lemma_of("Машины").unwrap();
        lemmatizer.lemma_frequency_map("машины машину");

        let forms = lemmatizer.word_forms(&lemma);
        assert!(forms.contains("машины"));
        assert!(forms.contains("машину"));
        assert!(forms.contains(&lemma));
    }

    #[test]
    fn test_recorded_forms_are_capped() {
        let lemmatizer = SnowballLemmatizer::new();

        let forms_of_one = (0..MAX_FORMS_PER_LEMMA * 2)
            .map(|i| ("лемма".to_string(), format!("форма{}", i)))
            .collect();
        lemmatizer.remember(forms_of_one);
        // the lemma itself is always added on top
        assert_eq!(lemmatizer.word_forms("лемма").len(), MAX_FORMS_PER_LEMMA + 1);

        let many_lemmas = (0..MAX_RECORDED_LEMMAS + 10)
            .map(|i| (format!("l{}", i), format!("f{}", i)))
            .collect();
        lemmatizer.remember(many_lemmas);

        let recorded = lemmatizer.forms.read().unwrap().len();
        assert_eq!(recorded, MAX_RECORDED_LEMMAS);
        assert!(lemmatizer.word_forms("лемма").contains("форма0"));
    }

    #[test]
    fn test_unknown_lemma_forms() {
        let lemmatizer = SnowballLemmatizer::new();
        let forms = lemmatizer.word_forms("никогда");
        assert_eq!(forms.len(), 1);
    }

    #[test]
    fn test_lemma_of_stop_word() {
        let lemmatizer = SnowballLemmatizer::new();
        assert!(lemmatizer.lemma_of("И").is_none());
        assert_eq!(lemmatizer.lemma_of("тест").as_deref(), Some("тест"));
    }
}
