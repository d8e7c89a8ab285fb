pub mod gemini;
pub mod mock;

pub use gemini::GeminiClient;
pub use mock::MockClient;

use crate::llm::LlmClient;
use anyhow::Result;
use std::sync::Arc;
use thymos_core::LlmConfig;

/// Build the provider named in config. Unknown providers fail loudly rather
/// than silently degrading to the mock.
pub fn build_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiClient::new(config)?)),
        "mock" => Ok(Arc::new(MockClient::new())),
        other => anyhow::bail!("Unknown LLM provider: {}", other),
    }
}
