use anyhow::Result;
use std::path::Path;
use tracing::debug;

use crate::core::model::PageTokens;
use crate::ocr::bridge::OcrBridge;
use crate::ocr::renderer::PageRenderer;
use crate::ocr::PageRecognizer;

/// Rasterizes a page and runs the OCR bridge over the image.
#[derive(Debug, Clone)]
pub struct RasterOcrRecognizer {
    renderer: PageRenderer,
    bridge: OcrBridge,
}

impl RasterOcrRecognizer {
    pub fn new(renderer: PageRenderer, bridge: OcrBridge) -> Self {
        Self { renderer, bridge }
    }
}

impl PageRecognizer for RasterOcrRecognizer {
    fn recognize_page(&self, pdf_path: &Path, page_idx: usize) -> Result<PageTokens> {
        let rendered = self.renderer.render_page(pdf_path, page_idx)?;
        debug!(
            page = page_idx,
            width = rendered.width,
            height = rendered.height,
            image = %rendered.path.display(),
            "rendered page for OCR"
        );
        let tokens = self.bridge.run(&rendered.path)?;
        Ok(PageTokens { page_idx, tokens })
    }
}
