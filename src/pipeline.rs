use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Config;
use crate::core::model::{AnnotationInput, DetectedError, PageTokens};
use crate::document::PdfDocument;
use crate::export::{AnnotationReport, Exporter, JsonReportExporter};
use crate::matching::{KeywordLocateEngine, LocateEngine};
use crate::nlp::LanguageChecker;
use crate::ocr::{PageRecognizer, PageRenderer, RasterOcrRecognizer};
use crate::render::{checked_zoom, Annotator, ErrorCounts, DEFAULT_ZOOM};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub zoom: f32,
    /// Directory for page rasters handed to the OCR bridge.
    pub work_dir: PathBuf,
    pub report: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn new(input: PathBuf, output: Option<PathBuf>) -> Self {
        let output = output.unwrap_or_else(|| default_output_path(&input));
        let work_dir = default_work_dir(&output);
        Self {
            input,
            output,
            zoom: DEFAULT_ZOOM,
            work_dir,
            report: None,
        }
    }

    pub fn with_zoom(mut self, zoom: f32) -> Self {
        self.zoom = checked_zoom(zoom);
        self
    }

    pub fn with_work_dir(mut self, work_dir: PathBuf) -> Self {
        self.work_dir = work_dir;
        self
    }

    pub fn with_report(mut self, report: Option<PathBuf>) -> Self {
        self.report = report;
        self
    }
}

/// `<stem>_annotated.pdf` next to the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    input.with_file_name(format!("{stem}_annotated.pdf"))
}

fn default_work_dir(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    output.with_file_name(format!("{stem}_pages"))
}

/// Text sent to the language model: each page's tokens joined by spaces, one
/// trailing space per page.
pub fn full_text(pages: &[PageTokens]) -> String {
    pages.iter().fold(String::new(), |mut text, page| {
        text.push_str(&page.text());
        text.push(' ');
        text
    })
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub pages: usize,
    pub errors_detected: usize,
    pub markers: usize,
    pub counts: ErrorCounts,
    pub unmatched: Vec<DetectedError>,
    pub output: PathBuf,
}

/// OCR, language check, location and rendering for one document.
pub struct Pipeline {
    recognizer: Box<dyn PageRecognizer>,
    checker: Box<dyn LanguageChecker>,
    locator: Box<dyn LocateEngine>,
    annotator: Annotator,
}

impl Pipeline {
    pub fn new(
        recognizer: Box<dyn PageRecognizer>,
        checker: Box<dyn LanguageChecker>,
        annotator: Annotator,
    ) -> Self {
        Self {
            recognizer,
            checker,
            locator: Box::new(KeywordLocateEngine::new()),
            annotator,
        }
    }

    /// Wires the pdftoppm + EasyOCR track and the Ollama client from `settings`.
    pub fn from_config(config: &PipelineConfig, settings: &Config) -> Result<Self> {
        let renderer = PageRenderer::new(config.work_dir.clone(), config.zoom);
        let recognizer = RasterOcrRecognizer::new(renderer, settings.ocr_bridge());
        let checker = settings.language_client()?;
        let annotator = Annotator::new(settings.style_sheet(), config.zoom);
        Ok(Self::new(Box::new(recognizer), Box::new(checker), annotator))
    }

    pub fn run(&self, config: &PipelineConfig) -> Result<RunSummary> {
        let mut pdf = PdfDocument::open(&config.input)
            .with_context(|| format!("Failed to process PDF: {}", config.input.display()))?;
        let page_count = pdf.page_count();
        info!(input = %config.input.display(), pages = page_count, "document opened");

        let pages = self.recognize_pages(&config.input, page_count);
        let text = full_text(&pages);

        let errors = self.checker.check(&text);
        info!(errors = errors.len(), "language errors detected");

        let located = self.locator.locate(&errors, &pages);
        if located.markers.is_empty() {
            warn!("no detected error could be located on the page; writing legend only");
        }
        for error in &located.unmatched {
            warn!(
                phrase = %error.original,
                category = %error.category,
                "error phrase matched no token"
            );
        }

        let markers = located.markers.into_markers();
        let marker_count = markers.len();
        let render = self
            .annotator
            .annotate(&mut pdf, AnnotationInput::Markers(markers.clone()))?;
        pdf.save(&config.output)?;
        info!(output = %config.output.display(), "annotated PDF saved");

        if let Some(report_path) = &config.report {
            let report = AnnotationReport::new(
                config.output.clone(),
                &render.counts,
                markers,
                &located.unmatched,
            );
            JsonReportExporter::new(report_path.clone()).export(&report)?;
        }

        Ok(RunSummary {
            pages: page_count,
            errors_detected: errors.len(),
            markers: marker_count,
            counts: render.counts,
            unmatched: located.unmatched,
            output: config.output.clone(),
        })
    }

    fn recognize_pages(&self, input: &Path, page_count: usize) -> Vec<PageTokens> {
        (0..page_count)
            .map(|page_idx| match self.recognizer.recognize_page(input, page_idx) {
                Ok(page) => {
                    info!(page = page_idx, tokens = page.tokens.len(), "page recognized");
                    page
                }
                Err(err) => {
                    warn!(
                        page = page_idx,
                        error = %format!("{err:#}"),
                        "OCR failed; page has no tokens"
                    );
                    PageTokens {
                        page_idx,
                        tokens: Vec::new(),
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::core::geometry::Point;
    use crate::core::model::{Category, RecognizedToken};
    use crate::document::reader::tests::sample_document;
    use pretty_assertions::assert_eq;

    struct FixedRecognizer(Vec<PageTokens>);

    impl PageRecognizer for FixedRecognizer {
        fn recognize_page(&self, _pdf_path: &Path, page_idx: usize) -> Result<PageTokens> {
            self.0
                .iter()
                .find(|page| page.page_idx == page_idx)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("pdftoppm exited with status 1"))
        }
    }

    struct FixedChecker(Vec<DetectedError>);

    impl LanguageChecker for FixedChecker {
        fn check(&self, _text: &str) -> Vec<DetectedError> {
            self.0.clone()
        }
    }

    fn token(text: &str, x0: f32, y0: f32, x1: f32, y1: f32) -> RecognizedToken {
        RecognizedToken::new(
            text,
            vec![
                Point::new(x0, y0),
                Point::new(x1, y0),
                Point::new(x1, y1),
                Point::new(x0, y1),
            ],
            0.9,
        )
    }

    fn write_sample(dir: &Path, pages: usize) -> PathBuf {
        let path = dir.join("essay.pdf");
        let mut pdf = PdfDocument::from_document(path.clone(), sample_document(pages, 595, 842));
        pdf.save(&path).unwrap();
        path
    }

    #[test]
    fn default_output_sits_next_to_input() {
        assert_eq!(
            default_output_path(Path::new("/data/essays/week1.pdf")),
            PathBuf::from("/data/essays/week1_annotated.pdf")
        );
        let config = PipelineConfig::new(PathBuf::from("/data/essays/week1.pdf"), None);
        assert_eq!(config.work_dir, PathBuf::from("/data/essays/week1_annotated_pages"));
    }

    #[test]
    fn full_text_joins_pages_with_trailing_spaces() {
        let pages = vec![
            PageTokens {
                page_idx: 0,
                tokens: vec![
                    token("Hello", 0.0, 0.0, 1.0, 1.0),
                    token("wrold", 2.0, 0.0, 3.0, 1.0),
                ],
            },
            PageTokens {
                page_idx: 1,
                tokens: vec![token("Bye", 0.0, 0.0, 1.0, 1.0)],
            },
        ];
        assert_eq!(full_text(&pages), "Hello wrold Bye ");
    }

    #[test]
    fn run_annotates_located_errors_and_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_sample(dir.path(), 1);
        let report = dir.path().join("report.json");
        let config = PipelineConfig::new(input, None).with_report(Some(report.clone()));

        let pipeline = Pipeline::new(
            Box::new(FixedRecognizer(vec![PageTokens {
                page_idx: 0,
                tokens: vec![token("wrold", 100.0, 200.0, 150.0, 220.0)],
            }])),
            Box::new(FixedChecker(vec![
                DetectedError::new("world", Category::Spelling),
                DetectedError::new("zebra crossing", Category::Semantic),
            ])),
            Annotator::default(),
        );
        let summary = pipeline.run(&config).unwrap();

        assert_eq!(summary.pages, 1);
        assert_eq!(summary.errors_detected, 2);
        assert_eq!(summary.markers, 1);
        assert_eq!(summary.counts.get(Category::Spelling), 1);
        assert_eq!(summary.counts.total(), 1);
        assert_eq!(summary.unmatched.len(), 1);
        assert_eq!(summary.output, dir.path().join("essay_annotated.pdf"));
        assert_eq!(PdfDocument::open(&summary.output).unwrap().page_count(), 1);

        let written: AnnotationReport =
            serde_json::from_str(&fs::read_to_string(report).unwrap()).unwrap();
        assert_eq!(written.total, 1);
        assert_eq!(written.unmatched, vec!["zebra crossing".to_string()]);
    }

    #[test]
    fn failed_pages_and_no_errors_still_write_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_sample(dir.path(), 2);
        let output = dir.path().join("out").join("marked.pdf");
        let config = PipelineConfig::new(input, Some(output.clone()));

        let pipeline = Pipeline::new(
            Box::new(FixedRecognizer(Vec::new())),
            Box::new(FixedChecker(Vec::new())),
            Annotator::default(),
        );
        let summary = pipeline.run(&config).unwrap();

        assert_eq!(summary.markers, 0);
        assert_eq!(summary.counts.total(), 0);
        assert_eq!(PdfDocument::open(&output).unwrap().page_count(), 2);
    }

    #[test]
    fn unreadable_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("missing.pdf");
        let pipeline = Pipeline::new(
            Box::new(FixedRecognizer(Vec::new())),
            Box::new(FixedChecker(Vec::new())),
            Annotator::default(),
        );
        let err = pipeline.run(&PipelineConfig::new(input, None)).unwrap_err();
        assert!(format!("{err:#}").contains("missing.pdf"));
    }
}
