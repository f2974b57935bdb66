use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Ratio at or above which a keyword and a token count as the same word.
pub const SIMILARITY_THRESHOLD: f64 = 0.8;

fn word_run() -> &'static Regex {
    static WORD_RUN: OnceLock<Regex> = OnceLock::new();
    WORD_RUN.get_or_init(|| Regex::new(r"\w+").expect("valid word-run pattern"))
}

fn non_word() -> &'static Regex {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    NON_WORD.get_or_init(|| Regex::new(r"[^\w]").expect("valid non-word pattern"))
}

/// Lower-cased, NFC-normalized, trimmed form of an error phrase.
pub fn normalize_phrase(phrase: &str) -> String {
    phrase.nfc().collect::<String>().to_lowercase().trim().to_string()
}

/// Keywords used for matching: word runs of at least two characters.
pub fn keywords(phrase: &str) -> Vec<String> {
    word_run()
        .find_iter(phrase)
        .map(|m| m.as_str().to_string())
        .filter(|kw| kw.chars().count() > 1)
        .collect()
}

/// OCR token text with every non-word character removed, lower-cased.
pub fn clean_token(text: &str) -> String {
    let lowered = text.nfc().collect::<String>().to_lowercase();
    non_word().replace_all(&lowered, "").into_owned()
}

/// `2 * LCS / (len(a) + len(b))` over characters.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    (2 * lcs_length(&a, &b)) as f64 / total as f64
}

fn lcs_length(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Keyword/token predicate: exact, similar, or keyword contained in the token.
///
/// Containment is one-directional; a token inside a longer keyword does not match.
pub fn keyword_matches(keyword: &str, cleaned_token: &str) -> bool {
    keyword == cleaned_token
        || similarity_ratio(keyword, cleaned_token) >= SIMILARITY_THRESHOLD
        || cleaned_token.contains(keyword)
}
