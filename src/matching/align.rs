use tracing::debug;

use crate::core::model::{DetectedError, PageTokens, RecognizedToken};
use crate::matching::compare::{clean_token, keyword_matches, keywords, normalize_phrase};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhraseMatch<'a> {
    pub error: &'a DetectedError,
    pub page_idx: usize,
    pub token: &'a RecognizedToken,
}

/// Pairs every error with every token it plausibly refers to, across all pages.
///
/// Matches come out in error order, then page order, then token order.
pub fn match_phrases<'a>(
    errors: &'a [DetectedError],
    pages: &'a [PageTokens],
) -> Vec<PhraseMatch<'a>> {
    let cleaned: Vec<Vec<String>> = pages
        .iter()
        .map(|page| page.tokens.iter().map(|token| clean_token(&token.text)).collect())
        .collect();

    let mut matches = Vec::new();
    for error in errors {
        let phrase = normalize_phrase(&error.original);
        if phrase.chars().count() < 2 {
            debug!(phrase = %error.original, "skipping phrase shorter than two characters");
            continue;
        }
        let kws = keywords(&phrase);
        if kws.is_empty() {
            continue;
        }

        for (page, page_cleaned) in pages.iter().zip(&cleaned) {
            for (token, token_text) in page.tokens.iter().zip(page_cleaned) {
                if token_text.is_empty() {
                    continue;
                }
                if kws.iter().any(|kw| keyword_matches(kw, token_text)) {
                    matches.push(PhraseMatch {
                        error,
                        page_idx: page.page_idx,
                        token,
                    });
                }
            }
        }
    }

    matches
}

/// Errors that matched no token at all.
pub fn unmatched_errors<'a>(
    errors: &'a [DetectedError],
    matches: &[PhraseMatch<'a>],
) -> Vec<&'a DetectedError> {
    errors
        .iter()
        .filter(|error| !matches.iter().any(|m| std::ptr::eq(m.error, *error)))
        .collect()
}
