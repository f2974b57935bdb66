use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::core::model::RecognizedToken;

pub const DEFAULT_SCRIPT: &str = "ocr/bridge/easyocr_bridge.py";

/// Runs the EasyOCR bridge script on one page image.
///
/// The script prints a JSON array of `{text, box, confidence}` objects, `box` being the
/// four corners in reading order (top-left, top-right, bottom-right, bottom-left).
#[derive(Debug, Clone)]
pub struct OcrBridge {
    python: String,
    script_path: PathBuf,
    langs: Vec<String>,
    gpu: bool,
}

impl OcrBridge {
    pub fn new() -> Self {
        Self {
            python: "python3".to_string(),
            script_path: PathBuf::from(DEFAULT_SCRIPT),
            langs: vec!["en".to_string()],
            gpu: false,
        }
    }

    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    pub fn with_script(mut self, script_path: PathBuf) -> Self {
        self.script_path = script_path;
        self
    }

    pub fn with_langs(mut self, langs: Vec<String>) -> Self {
        self.langs = langs;
        self
    }

    pub fn with_gpu(mut self, gpu: bool) -> Self {
        self.gpu = gpu;
        self
    }

    fn command(&self, image_path: &Path) -> Command {
        let mut cmd = Command::new(&self.python);
        cmd.arg(&self.script_path)
            .arg("--image")
            .arg(image_path)
            .arg("--lang")
            .arg(self.langs.join(","));
        if self.gpu {
            cmd.arg("--gpu");
        }
        cmd
    }

    pub fn run(&self, image_path: &Path) -> Result<Vec<RecognizedToken>> {
        let output = self
            .command(image_path)
            .output()
            .with_context(|| "failed to invoke python OCR bridge")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("OCR bridge failed: {stderr}");
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_tokens(&stdout)
    }
}

pub fn parse_tokens(json: &str) -> Result<Vec<RecognizedToken>> {
    serde_json::from_str(json).with_context(|| "failed to parse OCR JSON response")
}
