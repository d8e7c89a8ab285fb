use anyhow::Result;
use async_trait::async_trait;

/// Parameters for a single LLM completion call.
#[derive(Debug, Clone, Copy)]
pub struct CompletionParams {
    /// Maximum tokens to generate (will be clamped to provider limits).
    pub max_tokens: u32,
    /// Sampling temperature (0.0 - 2.0).
    pub temperature: f32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.3,
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single-turn completion request and return the raw response text.
    async fn complete(
        &self,
        system: &str,
        user_text: &str,
        params: CompletionParams,
    ) -> Result<String>;

    /// Short provider name used in logs.
    fn name(&self) -> &str;
}
