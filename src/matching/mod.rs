pub mod align;
pub mod compare;
pub mod group;

use crate::core::model::{DetectedError, MarkerSet, PageTokens};

pub use align::{match_phrases, unmatched_errors, PhraseMatch};
pub use group::group_matches;

/// Turns detected errors plus recognized tokens into on-page markers.
pub trait LocateEngine {
    fn locate(&self, errors: &[DetectedError], pages: &[PageTokens]) -> Located;
}

#[derive(Debug, Clone, Default)]
pub struct Located {
    pub markers: MarkerSet,
    pub unmatched: Vec<DetectedError>,
}

#[derive(Debug, Default)]
pub struct KeywordLocateEngine;

impl KeywordLocateEngine {
    pub fn new() -> Self {
        Self
    }
}

impl LocateEngine for KeywordLocateEngine {
    fn locate(&self, errors: &[DetectedError], pages: &[PageTokens]) -> Located {
        let matches = match_phrases(errors, pages);
        let markers = group_matches(&matches);
        let unmatched = unmatched_errors(errors, &matches)
            .into_iter()
            .cloned()
            .collect();
        Located { markers, unmatched }
    }
}
