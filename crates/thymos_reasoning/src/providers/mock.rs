//! Mock LLM provider for tests: deterministic replies, no network.

use crate::llm::{CompletionParams, LlmClient};
use anyhow::Result;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MockClient {
    reply: String,
    fail: bool,
}

impl MockClient {
    pub fn new() -> Self {
        Self::with_reply(r#"{"interest": 0.4, "joy": 0.3}"#)
    }

    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            fail: false,
        }
    }

    /// A client whose every call errors, for exercising fallback paths.
    pub fn failing() -> Self {
        Self {
            reply: String::new(),
            fail: true,
        }
    }
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for MockClient {
    async fn complete(
        &self,
        _system: &str,
        _user_text: &str,
        _params: CompletionParams,
    ) -> Result<String> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if self.fail {
            anyhow::bail!("mock provider configured to fail");
        }
        Ok(self.reply.clone())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
