use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::model::DetectedError;
use crate::nlp::normalize::normalize_response;
use crate::nlp::LanguageChecker;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "phi3";
pub const DEFAULT_MAX_CHARS: usize = 1200;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    format: &'a str,
    stream: bool,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Client for an Ollama-compatible `/api/chat` endpoint in JSON mode.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    endpoint: String,
    model: String,
    max_chars: usize,
}

impl OllamaClient {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Self::with_timeout(endpoint, model, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            max_chars: DEFAULT_MAX_CHARS,
        })
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Sends the prompt and returns the raw message content.
    pub fn request(&self, text: &str) -> Result<String> {
        let prompt = build_prompt(truncate_chars(text, self.max_chars));
        let request = ChatRequest {
            model: &self.model,
            format: "json",
            stream: false,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
        };

        let url = format!("{}/api/chat", self.endpoint.trim_end_matches('/'));
        let response: ChatResponse = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .with_context(|| format!("failed to reach language model at {url}"))?
            .error_for_status()
            .context("language model returned an error status")?
            .json()
            .context("failed to decode language model response")?;

        Ok(response.message.content)
    }
}

impl LanguageChecker for OllamaClient {
    fn check(&self, text: &str) -> Vec<DetectedError> {
        info!(
            model = %self.model,
            chars = text.chars().count(),
            "asking language model for errors"
        );
        match self.request(text) {
            Ok(content) => {
                debug!(%content, "raw language model output");
                normalize_response(&content)
            }
            Err(err) => {
                warn!(
                    error = %format!("{err:#}"),
                    "language model request failed; continuing without errors"
                );
                Vec::new()
            }
        }
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

fn build_prompt(text: &str) -> String {
    format!(
        r#"List the English grammar or spelling errors in the following text.
Return the result as a JSON array of objects.
Each object MUST have:
1. "original": the incorrect phrase from the text.
2. "type": either "spelling", "grammar", or "semantic".

Text to analyze:
"{text}""#
    )
}
