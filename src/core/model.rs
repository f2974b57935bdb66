use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::core::geometry::{BBox, Point};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Category {
    Spelling,
    Grammar,
    Semantic,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Spelling, Category::Grammar, Category::Semantic];

    /// Maps a free-form category name onto the vocabulary; anything unknown is `Grammar`.
    pub fn coerce(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "spelling" => Category::Spelling,
            "semantic" => Category::Semantic,
            _ => Category::Grammar,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Spelling => "spelling",
            Category::Grammar => "grammar",
            Category::Semantic => "semantic",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Category::Spelling => "Spelling",
            Category::Grammar => "Grammar",
            Category::Semantic => "Semantic",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Category::Spelling => 0,
            Category::Grammar => 1,
            Category::Semantic => 2,
        }
    }
}

impl From<String> for Category {
    fn from(raw: String) -> Self {
        Category::coerce(&raw)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecognizedToken {
    pub text: String,
    #[serde(rename = "box")]
    pub polygon: Vec<Point>,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

fn default_confidence() -> f32 {
    0.5
}

impl RecognizedToken {
    pub fn new(text: impl Into<String>, polygon: Vec<Point>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            polygon,
            confidence,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageTokens {
    pub page_idx: usize,
    pub tokens: Vec<RecognizedToken>,
}

impl PageTokens {
    pub fn text(&self) -> String {
        self.tokens
            .iter()
            .map(|token| token.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DetectedError {
    pub original: String,
    #[serde(rename = "type")]
    pub category: Category,
}

impl DetectedError {
    pub fn new(original: impl Into<String>, category: Category) -> Self {
        Self {
            original: original.into(),
            category,
        }
    }
}

/// Identifies one rectangular region on one page.
///
/// Coordinates are raster pixels. Equality and hashing compare the bit patterns, so two
/// tokens only share a key when the OCR engine reported identical corners.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(from = "(usize, f32, f32, f32, f32)", into = "(usize, f32, f32, f32, f32)")]
pub struct LocationKey {
    pub page_idx: usize,
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl LocationKey {
    pub fn new(page_idx: usize, x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        // fold -0.0 into 0.0 so the bitwise comparison agrees with `==`
        Self {
            page_idx,
            x0: x0 + 0.0,
            y0: y0 + 0.0,
            x1: x1 + 0.0,
            y1: y1 + 0.0,
        }
    }

    /// Key of a token polygon: point 0 and the diagonally opposite point 2.
    ///
    /// Two-point boxes use their second point. Fewer than two points yields `None`.
    pub fn from_polygon(page_idx: usize, polygon: &[Point]) -> Option<Self> {
        let first = polygon.first()?;
        let opposite = polygon.get(2).or_else(|| polygon.get(1))?;
        Some(Self::new(page_idx, first.x, first.y, opposite.x, opposite.y))
    }

    pub fn corners(&self) -> [Point; 2] {
        [Point::new(self.x0, self.y0), Point::new(self.x1, self.y1)]
    }

    pub fn bbox(&self) -> BBox {
        BBox::new(self.x0, self.y0, self.x1, self.y1)
    }

    fn bits(&self) -> (usize, [u32; 4]) {
        (
            self.page_idx,
            [
                self.x0.to_bits(),
                self.y0.to_bits(),
                self.x1.to_bits(),
                self.y1.to_bits(),
            ],
        )
    }
}

impl PartialEq for LocationKey {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for LocationKey {}

impl Hash for LocationKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

impl From<(usize, f32, f32, f32, f32)> for LocationKey {
    fn from((page_idx, x0, y0, x1, y1): (usize, f32, f32, f32, f32)) -> Self {
        Self::new(page_idx, x0, y0, x1, y1)
    }
}

impl From<LocationKey> for (usize, f32, f32, f32, f32) {
    fn from(key: LocationKey) -> Self {
        (key.page_idx, key.x0, key.y0, key.x1, key.y1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Marker {
    pub key: LocationKey,
    pub categories: Vec<Category>,
}

impl Marker {
    pub fn new(key: LocationKey) -> Self {
        Self {
            key,
            categories: Vec::new(),
        }
    }

    /// Appends `category` unless the marker already carries it.
    pub fn add(&mut self, category: Category) -> bool {
        if self.categories.contains(&category) {
            return false;
        }
        self.categories.push(category);
        true
    }
}

/// Markers in first-seen order, indexed by location.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerSet {
    markers: Vec<Marker>,
    index: HashMap<LocationKey, usize>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: LocationKey, category: Category) -> bool {
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                self.markers.push(Marker::new(key));
                self.index.insert(key, self.markers.len() - 1);
                self.markers.len() - 1
            }
        };
        self.markers[slot].add(category)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter()
    }

    pub fn into_markers(self) -> Vec<Marker> {
        self.markers
    }
}

impl FromIterator<Marker> for MarkerSet {
    fn from_iter<I: IntoIterator<Item = Marker>>(iter: I) -> Self {
        let mut set = MarkerSet::new();
        for marker in iter {
            for category in marker.categories {
                set.insert(marker.key, category);
            }
        }
        set
    }
}

/// One flat `{page, box, type}` annotation record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnnotationRecord {
    pub page: usize,
    #[serde(rename = "box")]
    pub polygon: Vec<Point>,
    #[serde(rename = "type", default = "default_category")]
    pub category: Category,
}

fn default_category() -> Category {
    Category::Grammar
}

/// The two accepted shapes of renderer input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AnnotationInput {
    Markers(Vec<Marker>),
    Flat(Vec<AnnotationRecord>),
}

impl AnnotationInput {
    /// Expands markers into one record per category; flat input passes through.
    ///
    /// Markers are folded through a [`MarkerSet`] first, so repeated keys merge and each
    /// category appears once per location.
    pub fn into_records(self) -> Vec<AnnotationRecord> {
        match self {
            AnnotationInput::Flat(records) => records,
            AnnotationInput::Markers(markers) => markers
                .into_iter()
                .collect::<MarkerSet>()
                .into_markers()
                .into_iter()
                .flat_map(|marker| {
                    let polygon = marker.key.corners().to_vec();
                    let page = marker.key.page_idx;
                    marker
                        .categories
                        .into_iter()
                        .map(move |category| AnnotationRecord {
                            page,
                            polygon: polygon.clone(),
                            category,
                        })
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            AnnotationInput::Markers(markers) => markers.is_empty(),
            AnnotationInput::Flat(records) => records.is_empty(),
        }
    }
}

impl From<MarkerSet> for AnnotationInput {
    fn from(set: MarkerSet) -> Self {
        AnnotationInput::Markers(set.into_markers())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn coerces_unknown_categories_to_grammar() {
        assert_eq!(Category::coerce("Spelling"), Category::Spelling);
        assert_eq!(Category::coerce(" semantic "), Category::Semantic);
        assert_eq!(Category::coerce("punctuation"), Category::Grammar);
        assert_eq!(Category::coerce(""), Category::Grammar);

        let parsed: Category = serde_json::from_str("\"style\"").unwrap();
        assert_eq!(parsed, Category::Grammar);
    }

    #[test]
    fn location_key_uses_diagonal_points() {
        let quad = [
            Point::new(100.0, 200.0),
            Point::new(150.0, 200.0),
            Point::new(150.0, 220.0),
            Point::new(100.0, 220.0),
        ];
        let key = LocationKey::from_polygon(0, &quad).unwrap();
        assert_eq!(key, LocationKey::new(0, 100.0, 200.0, 150.0, 220.0));

        let pair = LocationKey::from_polygon(1, &quad[..2]).unwrap();
        assert_eq!(pair, LocationKey::new(1, 100.0, 200.0, 150.0, 200.0));
        assert!(LocationKey::from_polygon(0, &quad[..1]).is_none());
    }

    #[test]
    fn negative_zero_shares_a_key() {
        let a = LocationKey::new(0, -0.0, 0.0, 1.0, 1.0);
        let b = LocationKey::new(0, 0.0, 0.0, 1.0, 1.0);
        let mut set = MarkerSet::new();
        set.insert(a, Category::Spelling);
        set.insert(b, Category::Grammar);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn marker_set_keeps_first_seen_order_without_duplicates() {
        let key = LocationKey::new(0, 1.0, 2.0, 3.0, 4.0);
        let other = LocationKey::new(1, 1.0, 2.0, 3.0, 4.0);
        let mut set = MarkerSet::new();
        assert!(set.insert(key, Category::Semantic));
        assert!(set.insert(other, Category::Spelling));
        assert!(set.insert(key, Category::Spelling));
        assert!(!set.insert(key, Category::Semantic));

        assert_eq!(set.len(), 2);
        let markers = set.into_markers();
        assert_eq!(markers[0].key, key);
        assert_eq!(markers[0].categories, vec![Category::Semantic, Category::Spelling]);
        assert_eq!(markers[1].key, other);
    }

    #[test]
    fn marker_input_merges_repeated_keys_and_categories() {
        let input: AnnotationInput = serde_json::from_str(
            r#"[
                {"key": [0, 100, 200, 150, 220], "categories": ["grammar", "punctuation"]},
                {"key": [1, 5, 5, 9, 9], "categories": ["semantic"]},
                {"key": [0, 100, 200, 150, 220], "categories": ["grammar", "spelling"]}
            ]"#,
        )
        .unwrap();

        let records = input.into_records();
        let summary: Vec<(usize, Category)> =
            records.iter().map(|record| (record.page, record.category)).collect();
        assert_eq!(
            summary,
            vec![
                (0, Category::Grammar),
                (0, Category::Spelling),
                (1, Category::Semantic),
            ]
        );
    }

    #[test]
    fn markers_expand_to_one_record_per_category() {
        let key = LocationKey::new(2, 10.0, 20.0, 30.0, 40.0);
        let input = AnnotationInput::Markers(vec![Marker {
            key,
            categories: vec![Category::Spelling, Category::Grammar],
        }]);
        let records = input.into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].page, 2);
        assert_eq!(records[0].category, Category::Spelling);
        assert_eq!(records[1].category, Category::Grammar);
        assert_eq!(
            records[1].polygon,
            vec![Point::new(10.0, 20.0), Point::new(30.0, 40.0)]
        );
    }

    #[test]
    fn parses_both_input_shapes() {
        let markers: AnnotationInput =
            serde_json::from_str(r#"[{"key": [0, 1, 2, 3, 4], "categories": ["semantic"]}]"#)
                .unwrap();
        assert!(matches!(markers, AnnotationInput::Markers(ref m) if m.len() == 1));

        let flat: AnnotationInput = serde_json::from_str(
            r#"[{"page": 1, "box": [[0, 0], [5, 5]], "type": "Typo"}]"#,
        )
        .unwrap();
        match flat {
            AnnotationInput::Flat(records) => {
                assert_eq!(records[0].page, 1);
                assert_eq!(records[0].category, Category::Grammar);
            }
            other => panic!("expected flat records, got {other:?}"),
        }
    }
}
