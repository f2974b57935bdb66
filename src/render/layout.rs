//! Draw plan for markers and legends, in top-left-origin document units.

use tracing::warn;

use crate::core::geometry::{BBox, Point};
use crate::core::model::AnnotationRecord;
use crate::core::style::{Rgb, StyleSheet};
use crate::render::counts::ErrorCounts;
use crate::render::DEFAULT_ZOOM;

pub const OUTLINE_WIDTH: f32 = 1.0;
pub const LABEL_FONT_SIZE: f32 = 8.0;
pub const LABEL_OFFSET: f32 = 10.0;

pub const LEGEND_X: f32 = 450.0;
pub const LEGEND_Y: f32 = 20.0;
pub const LEGEND_TITLE: &str = "Review Summary:";
pub const LEGEND_TITLE_SIZE: f32 = 10.0;
pub const LEGEND_LINE_SIZE: f32 = 9.0;
pub const LEGEND_LINE_SPACING: f32 = 15.0;
pub const LEGEND_PANEL_OPACITY: f32 = 0.8;

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Outline {
        rect: BBox,
        color: Rgb,
        width: f32,
    },
    Fill {
        rect: BBox,
        color: Rgb,
        opacity: f32,
    },
    Text {
        origin: Point,
        text: String,
        size: f32,
        color: Rgb,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageOverlay {
    pub shapes: Vec<Shape>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPlan {
    pub pages: Vec<PageOverlay>,
    pub counts: ErrorCounts,
    pub skipped: usize,
}

/// `zoom` when it is a usable divisor, otherwise the default raster zoom.
pub fn checked_zoom(zoom: f32) -> f32 {
    if zoom.is_finite() && zoom > 0.0 {
        zoom
    } else {
        warn!(zoom, default = DEFAULT_ZOOM, "invalid zoom; using default");
        DEFAULT_ZOOM
    }
}

/// Lays out marker outlines and labels, then a legend on every page.
pub fn plan_overlays(
    styles: &StyleSheet,
    zoom: f32,
    page_count: usize,
    records: &[AnnotationRecord],
) -> OverlayPlan {
    let zoom = checked_zoom(zoom);
    let mut pages = vec![PageOverlay::default(); page_count];
    let mut counts = ErrorCounts::new();
    let mut skipped = 0;

    for record in records {
        let Some(page) = pages.get_mut(record.page) else {
            warn!(
                page = record.page,
                page_count, "annotation targets a page outside the document; skipping"
            );
            skipped += 1;
            continue;
        };
        let Some(raw) = BBox::from_extremal(&record.polygon) else {
            warn!(page = record.page, "annotation box has fewer than two points; skipping");
            skipped += 1;
            continue;
        };

        let rect = raw.unzoom(zoom).normalized();
        let style = styles.get(record.category);
        page.shapes.push(Shape::Outline {
            rect,
            color: style.color,
            width: OUTLINE_WIDTH,
        });
        page.shapes.push(Shape::Text {
            origin: Point::new(rect.x0, rect.y0 - LABEL_OFFSET),
            text: style.label.clone(),
            size: LABEL_FONT_SIZE,
            color: style.color,
        });
        counts.increment(record.category);
    }

    for page in &mut pages {
        page.shapes.extend(legend(styles, &counts));
    }

    OverlayPlan {
        pages,
        counts,
        skipped,
    }
}

fn legend(styles: &StyleSheet, counts: &ErrorCounts) -> Vec<Shape> {
    let mut shapes = vec![
        Shape::Fill {
            rect: BBox::new(LEGEND_X, LEGEND_Y, LEGEND_X + 110.0, LEGEND_Y + 60.0).expand(5.0),
            color: Rgb::WHITE,
            opacity: LEGEND_PANEL_OPACITY,
        },
        Shape::Text {
            origin: Point::new(LEGEND_X, LEGEND_Y + 5.0),
            text: LEGEND_TITLE.to_string(),
            size: LEGEND_TITLE_SIZE,
            color: Rgb::BLACK,
        },
    ];

    for (i, (category, style)) in styles.iter().enumerate() {
        let y = LEGEND_Y + 20.0 + i as f32 * LEGEND_LINE_SPACING;
        shapes.push(Shape::Fill {
            rect: BBox::new(LEGEND_X, y - 8.0, LEGEND_X + 10.0, y + 2.0),
            color: style.color,
            opacity: 1.0,
        });
        shapes.push(Shape::Text {
            origin: Point::new(LEGEND_X + 15.0, y),
            text: format!("{}: {}", style.label, counts.get(category)),
            size: LEGEND_LINE_SIZE,
            color: Rgb::BLACK,
        });
    }

    shapes
}
