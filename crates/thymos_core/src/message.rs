//! Chat message rows — the recent window the detectors scan
//!
//! Each user message keeps a small snapshot of the emotional state measured
//! when it was processed, so later scans (inactivity tone, emotional
//! check-ins) can look back without replaying the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::plutchik::Emotion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageAuthor {
    User,
    Agent,
}

impl MessageAuthor {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageAuthor::User => "user",
            MessageAuthor::Agent => "agent",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(MessageAuthor::User),
            "agent" => Some(MessageAuthor::Agent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub agent_id: String,
    pub user_id: String,
    pub author: MessageAuthor,
    pub body: String,

    /// Emotional snapshot taken right after this message was processed.
    /// Only present on user messages that went through the engine.
    pub joy: Option<f32>,
    pub trust: Option<f32>,
    pub dominant_emotion: Option<Emotion>,
    pub dominant_intensity: Option<f32>,

    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(
        agent_id: impl Into<String>,
        user_id: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id: agent_id.into(),
            user_id: user_id.into(),
            author: MessageAuthor::User,
            body: body.into(),
            joy: None,
            trust: None,
            dominant_emotion: None,
            dominant_intensity: None,
            created_at: Utc::now(),
        }
    }

    /// Conversation-tone heuristic used by the inactivity trigger.
    pub fn is_positive(&self) -> bool {
        self.joy.map(|v| v > 0.5).unwrap_or(false) || self.trust.map(|v| v > 0.5).unwrap_or(false)
    }
}
