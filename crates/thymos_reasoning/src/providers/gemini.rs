//! Gemini provider speaking the `generateContent` REST dialect.
//!
//! Holds the full configured key set and rotates to the next key when one
//! hits its quota (429 / RESOURCE_EXHAUSTED), trying each key at most once
//! per call. A key of `"mock"` short-circuits to a canned appraisal so the
//! engine runs without network access.

use crate::llm::{CompletionParams, LlmClient};
use crate::retry::{with_retry, RetryConfig};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thymos_core::LlmConfig;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug)]
pub struct GeminiClient {
    client: Client,
    keys: Vec<String>,
    key_index: AtomicUsize,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let keys = if config.api_keys.is_empty() {
            vec!["mock".to_string()]
        } else {
            config.api_keys.clone()
        };
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .context("Failed to build HTTP client")?,
            keys,
            key_index: AtomicUsize::new(0),
            base_url,
            model: config.model.clone(),
        })
    }

    fn current_key(&self) -> &str {
        let idx = self.key_index.load(Ordering::Relaxed) % self.keys.len();
        &self.keys[idx]
    }

    fn advance_key(&self) {
        self.key_index.fetch_add(1, Ordering::Relaxed);
    }

    async fn request_with_key(
        &self,
        key: &str,
        system: &str,
        user_text: &str,
        params: &CompletionParams,
    ) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, key
        );

        let request_body = json!({
            "systemInstruction": { "parts": [{ "text": system }] },
            "contents": [{ "role": "user", "parts": [{ "text": user_text }] }],
            "generationConfig": {
                "maxOutputTokens": params.max_tokens,
                "temperature": params.temperature,
                "responseMimeType": "application/json",
            },
        });

        let retry_config = RetryConfig::default();
        let client = &self.client;
        let response = with_retry(&retry_config, "Gemini", || async {
            let resp = client
                .post(&url)
                .json(&request_body)
                .send()
                .await
                .context("Failed to send request to Gemini")?;
            Ok(resp)
        })
        .await?;

        let resp_text = response.text().await?;
        tracing::debug!(
            "Gemini raw response (first 2000 chars): {}",
            &resp_text[..resp_text.len().min(2000)]
        );
        let parsed: GenerateContentResponse =
            serde_json::from_str(&resp_text).context("Failed to parse Gemini response")?;
        Ok(extract_text(&parsed))
    }
}

fn extract_text(response: &GenerateContentResponse) -> String {
    response
        .candidates
        .iter()
        .filter_map(|c| c.content.as_ref())
        .flat_map(|content| content.parts.iter())
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("")
}

/// Quota exhaustion shows up as a 429 status or RESOURCE_EXHAUSTED in the
/// error body; both mean "try the next key".
fn is_quota_error(err: &anyhow::Error) -> bool {
    let text = err.to_string();
    text.contains("429") || text.contains("RESOURCE_EXHAUSTED") || text.to_lowercase().contains("quota")
}

#[async_trait::async_trait]
impl LlmClient for GeminiClient {
    #[tracing::instrument(skip(self, system, user_text, params), fields(model = %self.model))]
    async fn complete(
        &self,
        system: &str,
        user_text: &str,
        params: CompletionParams,
    ) -> Result<String> {
        if self.current_key() == "mock" {
            tokio::time::sleep(Duration::from_millis(50)).await;
            return Ok(r#"{"interest": 0.4, "joy": 0.3}"#.to_string());
        }

        let mut rotations = 0;
        loop {
            let key = self.current_key().to_string();
            match self.request_with_key(&key, system, user_text, &params).await {
                Ok(text) => return Ok(text),
                Err(e) if rotations + 1 < self.keys.len() && is_quota_error(&e) => {
                    rotations += 1;
                    self.advance_key();
                    tracing::warn!(
                        "Gemini quota exhausted, rotating to key {}/{}: {}",
                        rotations + 1,
                        self.keys.len(),
                        e
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
