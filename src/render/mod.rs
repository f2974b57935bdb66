pub mod counts;
pub mod layout;
pub mod pdf;

use std::path::Path;

use tracing::{debug, info};

use crate::core::model::AnnotationInput;
use crate::core::style::StyleSheet;
use crate::document::PdfDocument;
use crate::error::DocumentError;

pub use counts::ErrorCounts;
pub use layout::{checked_zoom, plan_overlays, OverlayPlan, PageOverlay, Shape};
pub use pdf::OverlayWriter;

/// Raster pixels per document unit used by the OCR track.
pub const DEFAULT_ZOOM: f32 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSummary {
    pub pages: usize,
    pub counts: ErrorCounts,
    pub skipped: usize,
}

/// Draws markers and the per-page legend onto a document.
#[derive(Debug, Clone)]
pub struct Annotator {
    styles: StyleSheet,
    zoom: f32,
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new(StyleSheet::default(), DEFAULT_ZOOM)
    }
}

impl Annotator {
    /// Zoom values that are not finite and positive fall back to [`DEFAULT_ZOOM`].
    pub fn new(styles: StyleSheet, zoom: f32) -> Self {
        Self {
            styles,
            zoom: checked_zoom(zoom),
        }
    }

    pub fn annotate(
        &self,
        pdf: &mut PdfDocument,
        input: AnnotationInput,
    ) -> Result<RenderSummary, DocumentError> {
        let records = input.into_records();
        let page_count = pdf.page_count();
        let plan = plan_overlays(&self.styles, self.zoom, page_count, &records);

        let targets: Vec<_> = (0..page_count)
            .filter_map(|idx| pdf.page_id(idx).map(|id| (id, pdf.page_geometry(idx))))
            .collect();

        let mut writer = OverlayWriter::new(pdf.document_mut());
        for ((page_id, geometry), overlay) in targets.into_iter().zip(&plan.pages) {
            debug!(?page_id, shapes = overlay.shapes.len(), "writing page overlay");
            writer.write_page(page_id, geometry, overlay)?;
        }

        info!(
            document = %pdf.path().display(),
            pages = page_count,
            markers = plan.counts.total(),
            skipped = plan.skipped,
            "annotation overlay drawn"
        );
        Ok(RenderSummary {
            pages: page_count,
            counts: plan.counts,
            skipped: plan.skipped,
        })
    }

    /// Opens `input_path`, draws the overlay and writes the result to `output_path`.
    pub fn annotate_file(
        &self,
        input_path: &Path,
        output_path: &Path,
        input: AnnotationInput,
    ) -> Result<RenderSummary, DocumentError> {
        let mut pdf = PdfDocument::open(input_path)?;
        let summary = self.annotate(&mut pdf, input)?;
        pdf.save(output_path)?;
        info!(output = %output_path.display(), "annotated PDF saved");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::core::geometry::Point;
    use crate::core::model::{AnnotationRecord, Category, LocationKey, Marker};
    use crate::document::reader::tests::sample_document;
    use lopdf::content::Content;
    use lopdf::Object;
    use pretty_assertions::assert_eq;

    fn page_operations(pdf: &PdfDocument, page_idx: usize) -> Vec<(String, Vec<Object>)> {
        let page_id = pdf.page_id(page_idx).unwrap();
        let bytes = pdf.document().get_page_content(page_id).unwrap();
        Content::decode(&bytes)
            .unwrap()
            .operations
            .into_iter()
            .map(|op| (op.operator, op.operands))
            .collect()
    }

    fn shown_text(ops: &[(String, Vec<Object>)]) -> Vec<String> {
        ops.iter()
            .filter(|(operator, _)| operator == "Tj")
            .filter_map(|(_, operands)| match operands.first() {
                Some(Object::String(bytes, _)) => Some(String::from_utf8_lossy(bytes).into_owned()),
                _ => None,
            })
            .collect()
    }

    fn rectangles(ops: &[(String, Vec<Object>)]) -> Vec<Vec<f32>> {
        ops.iter()
            .filter(|(operator, _)| operator == "re")
            .map(|(_, operands)| {
                operands
                    .iter()
                    .filter_map(|operand| match operand {
                        Object::Real(value) => Some(*value as f32),
                        Object::Integer(value) => Some(*value as f32),
                        _ => None,
                    })
                    .collect()
            })
            .collect()
    }

    fn sample_pdf(pages: usize) -> PdfDocument {
        PdfDocument::from_document(PathBuf::from("essay.pdf"), sample_document(pages, 595, 842))
    }

    #[test]
    fn draws_marker_and_legend_over_existing_text() {
        let mut pdf = sample_pdf(1);
        let input = AnnotationInput::Markers(vec![Marker {
            key: LocationKey::new(0, 100.0, 200.0, 150.0, 220.0),
            categories: vec![Category::Spelling],
        }]);

        let summary = Annotator::default().annotate(&mut pdf, input).unwrap();
        assert_eq!(summary.counts.get(Category::Spelling), 1);
        assert_eq!(summary.counts.total(), 1);

        let ops = page_operations(&pdf, 0);
        let texts = shown_text(&ops);
        assert_eq!(
            texts,
            vec![
                "Essay page 1",
                "Spelling",
                "Review Summary:",
                "Spelling: 1",
                "Grammar: 0",
                "Semantic: 0",
            ]
        );
        assert_eq!(rectangles(&ops)[0], vec![50.0, 732.0, 25.0, 10.0]);
    }

    #[test]
    fn overlay_is_balanced_against_original_content() {
        let mut pdf = sample_pdf(1);
        Annotator::default()
            .annotate(&mut pdf, AnnotationInput::Flat(Vec::new()))
            .unwrap();

        let ops = page_operations(&pdf, 0);
        let saves = ops.iter().filter(|(op, _)| op == "q").count();
        let restores = ops.iter().filter(|(op, _)| op == "Q").count();
        assert_eq!(saves, restores);

        let head: Vec<&str> = ops.iter().take(7).map(|(op, _)| op.as_str()).collect();
        assert_eq!(head, vec!["q", "BT", "Tf", "Td", "Tj", "ET", "Q"]);
    }

    #[test]
    fn empty_input_keeps_pages_and_adds_zero_legend() {
        let mut pdf = sample_pdf(3);
        let summary = Annotator::default()
            .annotate(&mut pdf, AnnotationInput::Markers(Vec::new()))
            .unwrap();

        assert_eq!(summary.pages, 3);
        assert_eq!(summary.counts.total(), 0);
        for idx in 0..3 {
            let texts = shown_text(&page_operations(&pdf, idx));
            assert_eq!(texts[0], format!("Essay page {}", idx + 1));
            assert_eq!(&texts[2..], ["Spelling: 0", "Grammar: 0", "Semantic: 0"]);
        }
    }

    #[test]
    fn zero_zoom_draws_finite_geometry() {
        let mut pdf = sample_pdf(1);
        let input = AnnotationInput::Markers(vec![Marker {
            key: LocationKey::new(0, 100.0, 200.0, 150.0, 220.0),
            categories: vec![Category::Semantic],
        }]);
        Annotator::new(StyleSheet::default(), 0.0)
            .annotate(&mut pdf, input)
            .unwrap();

        let rects = rectangles(&page_operations(&pdf, 0));
        assert!(rects.iter().flatten().all(|value| value.is_finite()));
        assert_eq!(rects[0], vec![50.0, 732.0, 25.0, 10.0]);
    }

    #[test]
    fn out_of_range_records_are_skipped() {
        let mut pdf = sample_pdf(1);
        let records = vec![
            AnnotationRecord {
                page: 4,
                polygon: vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)],
                category: Category::Grammar,
            },
            AnnotationRecord {
                page: 0,
                polygon: vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)],
                category: Category::Semantic,
            },
        ];
        let summary = Annotator::default()
            .annotate(&mut pdf, AnnotationInput::Flat(records))
            .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.counts.get(Category::Semantic), 1);
        assert_eq!(summary.counts.get(Category::Grammar), 0);
    }

    #[test]
    fn annotate_file_writes_reloadable_copy() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("essay.pdf");
        let output = dir.path().join("essay_annotated.pdf");
        sample_pdf(2).save(&input).unwrap();

        let summary = Annotator::default()
            .annotate_file(&input, &output, AnnotationInput::Flat(Vec::new()))
            .unwrap();

        assert_eq!(summary.pages, 2);
        let reopened = PdfDocument::open(&output).unwrap();
        assert_eq!(reopened.page_count(), 2);
        assert_eq!(shown_text(&page_operations(&reopened, 1))[1], "Review Summary:");
    }
}
