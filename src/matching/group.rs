use tracing::debug;

use crate::core::model::{LocationKey, MarkerSet};
use crate::matching::align::PhraseMatch;

/// Folds phrase matches into one marker per token location.
pub fn group_matches(matches: &[PhraseMatch<'_>]) -> MarkerSet {
    let mut markers = MarkerSet::new();

    for m in matches {
        let Some(key) = LocationKey::from_polygon(m.page_idx, &m.token.polygon) else {
            debug!(
                page = m.page_idx,
                text = %m.token.text,
                points = m.token.polygon.len(),
                "dropping token with too few polygon points"
            );
            continue;
        };
        markers.insert(key, m.error.category);
    }

    markers
}
