//! Optional TOML configuration for the annotate pipeline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::core::model::Category;
use crate::core::style::{Rgb, StyleSheet};
use crate::nlp::client::{DEFAULT_ENDPOINT, DEFAULT_MAX_CHARS, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use crate::nlp::OllamaClient;
use crate::ocr::OcrBridge;
use crate::render::DEFAULT_ZOOM;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    pub zoom: Option<f32>,
    pub ocr: Option<OcrConfig>,
    pub language_model: Option<LanguageModelConfig>,
    pub styles: Option<BTreeMap<String, StyleConfig>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct OcrConfig {
    pub python: Option<String>,
    pub script: Option<PathBuf>,
    pub gpu: Option<bool>,
    pub languages: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct LanguageModelConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub max_chars: Option<usize>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct StyleConfig {
    pub color: Option<String>,
    pub label: Option<String>,
}

impl Config {
    pub fn zoom(&self) -> f32 {
        self.zoom.filter(|z| *z > 0.0).unwrap_or(DEFAULT_ZOOM)
    }

    pub fn ocr_bridge(&self) -> OcrBridge {
        let mut bridge = OcrBridge::new();
        let Some(ocr) = &self.ocr else {
            return bridge;
        };
        if let Some(python) = &ocr.python {
            bridge = bridge.with_python(python.clone());
        }
        if let Some(script) = &ocr.script {
            bridge = bridge.with_script(script.clone());
        }
        if let Some(gpu) = ocr.gpu {
            bridge = bridge.with_gpu(gpu);
        }
        if let Some(languages) = ocr.languages.as_ref().filter(|l| !l.is_empty()) {
            bridge = bridge.with_langs(languages.clone());
        }
        bridge
    }

    pub fn endpoint(&self) -> &str {
        self.language_model
            .as_ref()
            .and_then(|lm| lm.endpoint.as_deref())
            .unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn model(&self) -> &str {
        self.language_model
            .as_ref()
            .and_then(|lm| lm.model.as_deref())
            .unwrap_or(DEFAULT_MODEL)
    }

    pub fn max_chars(&self) -> usize {
        self.language_model
            .as_ref()
            .and_then(|lm| lm.max_chars)
            .unwrap_or(DEFAULT_MAX_CHARS)
    }

    pub fn timeout(&self) -> Duration {
        let secs = self
            .language_model
            .as_ref()
            .and_then(|lm| lm.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    pub fn language_client(&self) -> Result<OllamaClient> {
        Ok(OllamaClient::with_timeout(self.endpoint(), self.model(), self.timeout())?
            .with_max_chars(self.max_chars()))
    }

    /// Default styles with any `[styles.<category>]` overrides applied.
    /// Unknown categories and unparseable colours are ignored with a warning.
    pub fn style_sheet(&self) -> StyleSheet {
        let mut sheet = StyleSheet::default();
        let Some(styles) = &self.styles else {
            return sheet;
        };
        for (name, style) in styles {
            let Some(category) = Category::ALL
                .iter()
                .copied()
                .find(|c| c.as_str() == name.trim().to_lowercase())
            else {
                warn!(category = %name, "unknown style category in config; ignoring");
                continue;
            };
            if let Some(color) = &style.color {
                match Rgb::from_hex(color) {
                    Some(rgb) => sheet = sheet.with_color(category, rgb),
                    None => warn!(%category, color = %color, "invalid style colour; keeping default"),
                }
            }
            if let Some(label) = &style.label {
                sheet = sheet.with_label(category, label.clone());
            }
        }
        sheet
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> Result<Config> {
    toml::from_str(contents).context("Failed to parse config file as TOML")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::default();
        assert_eq!(config.zoom(), DEFAULT_ZOOM);
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(config.model(), "phi3");
        assert_eq!(config.max_chars(), 1200);
        assert_eq!(config.style_sheet(), StyleSheet::default());
    }

    #[test]
    fn parses_all_sections() {
        let config = parse_config(
            r##"
            zoom = 3.0

            [ocr]
            python = "/usr/bin/python3.11"
            gpu = true
            languages = ["en", "fr"]

            [language_model]
            endpoint = "http://gpu-box:11434"
            model = "llama3"
            max_chars = 4000
            timeout_secs = 30

            [styles.spelling]
            color = "#00ff00"
            label = "Typo"
            "##,
        )
        .unwrap();

        assert_eq!(config.zoom(), 3.0);
        assert_eq!(config.endpoint(), "http://gpu-box:11434");
        assert_eq!(config.model(), "llama3");
        assert_eq!(config.max_chars(), 4000);
        assert_eq!(config.timeout(), Duration::from_secs(30));

        let sheet = config.style_sheet();
        let spelling = sheet.get(Category::Spelling);
        assert_eq!(spelling.label, "Typo");
        assert_eq!(spelling.color, Rgb::new(0.0, 1.0, 0.0));
        assert_eq!(sheet.get(Category::Grammar), StyleSheet::default().get(Category::Grammar));
    }

    #[test]
    fn bad_style_entries_are_ignored() {
        let config = parse_config(
            r#"
            [styles.punctuation]
            label = "Commas"

            [styles.semantic]
            color = "blue"
            "#,
        )
        .unwrap();
        assert_eq!(config.style_sheet(), StyleSheet::default());
    }

    #[test]
    fn non_positive_zoom_falls_back() {
        let config = parse_config("zoom = 0.0").unwrap();
        assert_eq!(config.zoom(), DEFAULT_ZOOM);
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(parse_config("zoom = [").is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("essaymark.toml");
        std::fs::write(&path, "[language_model]\nmodel = \"mistral\"\n").unwrap();
        assert_eq!(load_config(&path).unwrap().model(), "mistral");
    }
}
