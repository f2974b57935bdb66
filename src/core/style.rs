use serde::{Deserialize, Serialize};

use crate::core::model::Category;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Parses `#RRGGBB` (the leading `#` is optional).
    pub fn from_hex(color: &str) -> Option<Self> {
        let hex = color.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .ok()
                .map(|value| value as f32 / 255.0)
        };
        Some(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStyle {
    pub color: Rgb,
    pub label: String,
}

/// Colour and label for each category. Built once, passed to the renderer by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleSheet {
    styles: [CategoryStyle; 3],
}

impl Default for StyleSheet {
    fn default() -> Self {
        let style = |category: Category, color: Rgb| CategoryStyle {
            color,
            label: category.title().to_string(),
        };
        Self {
            styles: [
                style(Category::Spelling, Rgb::new(1.0, 0.3, 0.3)),
                style(Category::Grammar, Rgb::new(1.0, 0.8, 0.0)),
                style(Category::Semantic, Rgb::new(0.3, 0.3, 1.0)),
            ],
        }
    }
}

impl StyleSheet {
    pub fn get(&self, category: Category) -> &CategoryStyle {
        &self.styles[category.index()]
    }

    pub fn with_color(mut self, category: Category, color: Rgb) -> Self {
        self.styles[category.index()].color = color;
        self
    }

    pub fn with_label(mut self, category: Category, label: impl Into<String>) -> Self {
        self.styles[category.index()].label = label.into();
        self
    }

    /// Styles in legend order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &CategoryStyle)> {
        Category::ALL.iter().map(move |&category| (category, self.get(category)))
    }
}
