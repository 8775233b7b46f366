/// Russian prepositions, conjunctions, particles, pronouns and interjections
pub(crate) const RUSSIAN: &[&str] = &[
    "а", "ай", "ах", "без", "бы", "в", "во", "вот", "вы", "да", "для", "до", "его", "ее", "её",
    "ей", "ему", "если", "же", "за", "и", "из", "или", "им", "их", "к", "как", "ко", "ли", "мы",
    "на", "над", "не", "него", "нее", "неё", "ни", "но", "ну", "о", "об", "ой", "он", "она",
    "они", "оно", "от", "по", "под", "при", "про", "с", "со", "та", "так", "также", "то", "тоже",
    "ты", "у", "уж", "ух", "через", "что", "чтобы", "эй", "это", "эх", "я",
];

/// English function words
pub(crate) const ENGLISH: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "he", "her", "him",
    "his", "i", "if", "in", "into", "is", "it", "its", "me", "my", "of", "oh", "on", "or", "our",
    "she", "so", "that", "the", "their", "them", "they", "this", "to", "us", "was", "we", "were",
    "with", "you", "your",
];

/// Returns true if `word` (already lower-cased) carries no meaning for search
pub(crate) fn is_stop_word(word: &str) -> bool {
    RUSSIAN.contains(&word) || ENGLISH.contains(&word)
}
