use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// PDF user-space units per inch.
const POINTS_PER_INCH: f32 = 72.0;

#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Rasterizes pages with `pdftoppm` so that one document unit becomes `zoom` pixels.
#[derive(Debug, Clone)]
pub struct PageRenderer {
    out_dir: PathBuf,
    zoom: f32,
}

impl PageRenderer {
    pub fn new(out_dir: PathBuf, zoom: f32) -> Self {
        Self { out_dir, zoom }
    }

    pub fn dpi(&self) -> u32 {
        (POINTS_PER_INCH * self.zoom).round() as u32
    }

    pub fn render_page(&self, pdf_path: &Path, page_idx: usize) -> Result<RenderedPage> {
        fs::create_dir_all(&self.out_dir)?;

        // pdftoppm uses 1-based page indices
        let page_number = page_idx + 1;
        let prefix = self.out_dir.join(format!("page_{:03}", page_number));

        let status = Command::new("pdftoppm")
            .arg("-png")
            .arg("-r")
            .arg(self.dpi().to_string())
            .arg("-f")
            .arg(page_number.to_string())
            .arg("-l")
            .arg(page_number.to_string())
            .arg("-singlefile")
            .arg(pdf_path)
            .arg(&prefix)
            .status()
            .with_context(|| "failed to invoke pdftoppm; is poppler-utils installed?")?;

        if !status.success() {
            anyhow::bail!("pdftoppm failed with status: {status}");
        }

        let image_path = prefix.with_extension("png");
        if !image_path.exists() {
            anyhow::bail!(
                "expected rendered image not found: {}",
                image_path.display()
            );
        }

        let (width, height) = image::image_dimensions(&image_path)
            .with_context(|| format!("failed to read raster size of {}", image_path.display()))?;

        Ok(RenderedPage {
            path: image_path,
            width,
            height,
        })
    }
}
