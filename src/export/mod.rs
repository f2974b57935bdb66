pub mod json_export;

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::model::{Category, DetectedError, Marker};
use crate::render::ErrorCounts;

pub use json_export::JsonReportExporter;

/// Machine-readable account of one annotate run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnnotationReport {
    pub output: PathBuf,
    pub counts: BTreeMap<Category, usize>,
    pub total: usize,
    pub markers: Vec<Marker>,
    pub unmatched: Vec<String>,
}

impl AnnotationReport {
    pub fn new(
        output: PathBuf,
        counts: &ErrorCounts,
        markers: Vec<Marker>,
        unmatched: &[DetectedError],
    ) -> Self {
        Self {
            output,
            counts: counts.to_map(),
            total: counts.total(),
            markers,
            unmatched: unmatched.iter().map(|e| e.original.clone()).collect(),
        }
    }
}

pub trait Exporter {
    fn export(&self, report: &AnnotationReport) -> Result<()>;
}
