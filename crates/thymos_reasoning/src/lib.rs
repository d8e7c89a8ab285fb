pub mod appraisal;
pub mod llm;
pub mod providers;
pub mod retry;

pub use appraisal::{appraise, AppraisedEmotion};
pub use llm::{CompletionParams, LlmClient};
pub use providers::build_client;
