use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::export::{AnnotationReport, Exporter};

#[derive(Debug, Clone)]
pub struct JsonReportExporter {
    path: PathBuf,
}

impl JsonReportExporter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Exporter for JsonReportExporter {
    fn export(&self, report: &AnnotationReport) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(report)?;
        fs::write(&self.path, data)
            .with_context(|| format!("failed to write report {}", self.path.display()))?;
        info!(path = %self.path.display(), "report written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{Category, DetectedError, LocationKey, Marker};
    use crate::render::ErrorCounts;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    #[test]
    fn writes_counts_markers_and_unmatched() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out").join("report.json");

        let mut counts = ErrorCounts::new();
        counts.increment(Category::Spelling);
        let markers = vec![Marker {
            key: LocationKey::new(0, 100.0, 200.0, 150.0, 220.0),
            categories: vec![Category::Spelling],
        }];
        let unmatched = vec![DetectedError::new("missing phrase", Category::Semantic)];
        let report = AnnotationReport::new(
            PathBuf::from("essay_annotated.pdf"),
            &counts,
            markers,
            &unmatched,
        );

        JsonReportExporter::new(path.clone()).export(&report)?;

        let written: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(
            written,
            json!({
                "output": "essay_annotated.pdf",
                "counts": {"spelling": 1, "grammar": 0, "semantic": 0},
                "total": 1,
                "markers": [
                    {"key": [0, 100.0, 200.0, 150.0, 220.0], "categories": ["spelling"]}
                ],
                "unmatched": ["missing phrase"]
            })
        );

        let reloaded: AnnotationReport = serde_json::from_value(written)?;
        assert_eq!(reloaded, report);
        Ok(())
    }
}
