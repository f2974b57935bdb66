pub mod bridge;
pub mod recognizer;
pub mod renderer;

pub use bridge::OcrBridge;
pub use recognizer::RasterOcrRecognizer;
pub use renderer::PageRenderer;

use anyhow::Result;
use std::path::Path;

use crate::core::model::PageTokens;

/// Produces the recognized tokens of one document page, in raster-pixel coordinates.
pub trait PageRecognizer {
    fn recognize_page(&self, pdf_path: &Path, page_idx: usize) -> Result<PageTokens>;
}
