pub mod config;
pub mod core;
pub mod document;
pub mod error;
pub mod export;
pub mod matching;
pub mod nlp;
pub mod ocr;
pub mod pipeline;
pub mod render;

pub use core::model::{
    AnnotationInput, Category, DetectedError, Marker, PageTokens, RecognizedToken,
};
pub use error::DocumentError;
pub use pipeline::{Pipeline, PipelineConfig, RunSummary};
