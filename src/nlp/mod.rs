pub mod client;
pub mod normalize;

use crate::core::model::DetectedError;

pub use client::OllamaClient;
pub use normalize::{normalize_response, normalize_value, RawResponse};

/// Source of detected language errors for a document's text.
///
/// Implementations never fail the run: problems are logged and yield no errors.
pub trait LanguageChecker {
    fn check(&self, text: &str) -> Vec<DetectedError>;
}
