//! Highlighted snippets
//!
//! For each query lemma the first whole-word occurrence of any of its word
//! forms is located in the page text and widened to roughly 20 characters on
//! each side, cut at the nearest space. Fragments contained in a longer one
//! are dropped and every word-form occurrence is wrapped in `<b>...</b>`.

use crate::morphology::{words, Lemmatizer};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Characters of context kept on each side of a match
const CONTEXT_CHARS: usize = 20;

/// Builds the snippet of a page for the given query lemmas
///
/// Returns an empty string when no lemma occurs in `text`.
pub fn build_snippet(text: &str, lemmas: &[String], lemmatizer: &dyn Lemmatizer) -> String {
    let chars: Vec<char> = text.chars().collect();
    let lower = lowercase_chars(&chars);
    let forms = word_forms(text, lemmas, lemmatizer);

    let mut fragments: Vec<Vec<char>> = lemmas
        .iter()
        .filter_map(|lemma| forms.get(lemma))
        .filter_map(|lemma_forms| first_match(&lower, lemma_forms))
        .map(|(start, end)| chars[fragment_bounds(&chars, start, end)].to_vec())
        .collect();

    fragments.sort_by(|a, b| b.len().cmp(&a.len()));

    let mut kept: Vec<Vec<char>> = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        if !kept.iter().any(|longer| contains(longer, &fragment)) {
            kept.push(fragment);
        }
    }

    let all_forms: Vec<Vec<char>> = {
        let mut unique: Vec<&String> = forms
            .values()
            .flatten()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        unique.sort_by_key(|form| std::cmp::Reverse(form.chars().count()));
        unique.into_iter().map(|form| form.chars().collect()).collect()
    };

    kept.iter()
        .map(|fragment| format!("{}...", emphasize(fragment, &all_forms)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collects the lower-cased word forms of each lemma
///
/// Forms come from the lemmatizer's vocabulary and from the words of the
/// text itself whose lemma is one of `lemmas`.
fn word_forms(
    text: &str,
    lemmas: &[String],
    lemmatizer: &dyn Lemmatizer,
) -> HashMap<String, HashSet<String>> {
    let wanted: HashSet<&str> = lemmas.iter().map(String::as_str).collect();
    let mut forms: HashMap<String, HashSet<String>> = lemmas
        .iter()
        .map(|lemma| (lemma.clone(), lemmatizer.word_forms(lemma)))
        .collect();

    let mut seen = HashSet::new();
    for word in words(text) {
        let word = word.to_lowercase();
        if !seen.insert(word.clone()) {
            continue;
        }
        if let Some(lemma) = lemmatizer.lemma_of(&word) {
            if wanted.contains(lemma.as_str()) {
                forms.entry(lemma).or_default().insert(word);
            }
        }
    }

    forms
}

/// Lower-cases character by character so indices stay aligned
fn lowercase_chars(chars: &[char]) -> Vec<char> {
    chars
        .iter()
        .map(|c| c.to_lowercase().next().unwrap_or(*c))
        .collect()
}

/// Finds the earliest whole-word occurrence of any form
fn first_match(lower: &[char], forms: &HashSet<String>) -> Option<(usize, usize)> {
    forms
        .iter()
        .filter(|form| !form.is_empty())
        .filter_map(|form| {
            let needle: Vec<char> = form.chars().collect();
            find_word(lower, &needle, 0).map(|start| (start, start + needle.len()))
        })
        .min_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
}

/// Finds `needle` at or after `from` where it is not part of a longer word
fn find_word(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }

    (from..=haystack.len() - needle.len()).find(|&start| {
        haystack[start..start + needle.len()] == *needle
            && !is_part_of_word(haystack, start, start + needle.len())
    })
}

fn is_part_of_word(chars: &[char], start: usize, end: usize) -> bool {
    (end < chars.len() && chars[end].is_alphabetic())
        || (start > 0 && chars[start - 1].is_alphabetic())
}

/// Widens a match to its surrounding context, cutting at spaces
fn fragment_bounds(chars: &[char], start: usize, end: usize) -> std::ops::Range<usize> {
    let from = if start <= CONTEXT_CHARS {
        0
    } else {
        chars[..=start - CONTEXT_CHARS]
            .iter()
            .rposition(|c| *c == ' ')
            .map_or(0, |index| index + 1)
    };

    let to = if chars.len() < end + CONTEXT_CHARS {
        chars.len()
    } else {
        chars[end + CONTEXT_CHARS..]
            .iter()
            .position(|c| *c == ' ')
            .map_or(chars.len(), |index| end + CONTEXT_CHARS + index)
    };

    from..to
}

fn contains(haystack: &[char], needle: &[char]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}

/// Wraps every whole-word occurrence of a form in `<b>...</b>`
///
/// The emphasized text is the form itself with the fragment's original first
/// character, so "Машина" stays capitalised. `forms` must be sorted longest
/// first.
fn emphasize(fragment: &[char], forms: &[Vec<char>]) -> String {
    let lower = lowercase_chars(fragment);
    let mut out = String::with_capacity(fragment.len() + 16);
    let mut i = 0;

    while i < fragment.len() {
        let matched = forms.iter().find(|form| {
            !form.is_empty()
                && i + form.len() <= lower.len()
                && lower[i..i + form.len()] == form[..]
                && !is_part_of_word(&lower, i, i + form.len())
        });

        match matched {
            Some(form) => {
                out.push_str("<b>");
                out.push(fragment[i]);
                out.extend(&form[1..]);
                out.push_str("</b>");
                i += form.len();
            }
            None => {
                out.push(fragment[i]);
                i += 1;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morphology::SnowballLemmatizer;

    fn lemma(lemmatizer: &SnowballLemmatizer, word: &str) -> String {
        lemmatizer.lemma_of(word).unwrap()
    }

    #[test]
    fn test_short_text_is_kept_whole() {
        let lemmatizer = SnowballLemmatizer::new();
        let lemmas = vec![lemma(&lemmatizer, "машина")];

        let snippet = build_snippet("Новая машина едет", &lemmas, &lemmatizer);
        assert_eq!(snippet, "Новая <b>машина</b> едет...");
    }

    #[test]
    fn test_first_letter_case_is_kept() {
        let lemmatizer = SnowballLemmatizer::new();
        let lemmas = vec![lemma(&lemmatizer, "машина")];

        let snippet = build_snippet("Машины стоят", &lemmas, &lemmatizer);
        assert_eq!(snippet, "<b>Машины</b> стоят...");
    }

    #[test]
    fn test_part_of_word_is_not_matched() {
        let lemmatizer = SnowballLemmatizer::new();
        let lemmas = vec![lemma(&lemmatizer, "кот")];

        let snippet = build_snippet("котлета и кот", &lemmas, &lemmatizer);
        assert_eq!(snippet, "котлета и <b>кот</b>...");
    }

    #[test]
    fn test_long_text_is_cut_at_spaces() {
        let lemmatizer = SnowballLemmatizer::new();
        let lemmas = vec![lemma(&lemmatizer, "машина")];
        let text = "один два три четыре пять шесть семь восемь машина девять десять \
                    одиннадцать двенадцать тринадцать четырнадцать";

        let snippet = build_snippet(text, &lemmas, &lemmatizer);

        assert!(snippet.contains("<b>машина</b>"));
        assert!(!snippet.starts_with("один"));
        assert!(!snippet.contains("четырнадцать"));
        assert!(snippet.ends_with("..."));
    }

    #[test]
    fn test_contained_fragments_are_dropped() {
        let lemmatizer = SnowballLemmatizer::new();
        let lemmas = vec![lemma(&lemmatizer, "красная"), lemma(&lemmatizer, "машина")];

        let snippet = build_snippet("красная машина", &lemmas, &lemmatizer);
        assert_eq!(snippet.matches("...").count(), 1);
        assert!(snippet.contains("<b>машина</b>"));
    }

    #[test]
    fn test_no_match_gives_empty_snippet() {
        let lemmatizer = SnowballLemmatizer::new();
        let lemmas = vec![lemma(&lemmatizer, "самолет")];
        assert_eq!(build_snippet("машина едет", &lemmas, &lemmatizer), "");
    }

    #[test]
    fn test_fragment_bounds() {
        let chars: Vec<char> = "aaaa bbbb cccc dddd eeee ffff gggg hhhh iiii jjjj kkkk llll"
            .chars()
            .collect();
        // match "iiii" at 40..44
        let range = fragment_bounds(&chars, 40, 44);
        let fragment: String = chars[range].iter().collect();
        assert_eq!(fragment, "eeee ffff gggg hhhh iiii jjjj kkkk llll");
    }
}
