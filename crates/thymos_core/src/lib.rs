//! # Thymos Core
//!
//! Shared domain types for the behavioral/emotional state engine:
//!
//! - **Plutchik**: eight primary emotions with dyads (Plutchik's wheel)
//! - **PAD**: pleasure/arousal/dominance dimensional mood (Mehrabian & Russell)
//! - **Behavior**: per-agent psychological trait profiles with intensity dynamics
//! - **Bond**: user–agent relationships with activity-based decay
//! - **Proactive**: agent-initiated message configuration and audit rows
//!
//! Every intensity-like value is clamped at the type boundary; downstream
//! crates can assume `[0, 1]` (or `[-1, 1]` for valence) without re-checking.

pub mod behavior;
pub mod bond;
pub mod config;
pub mod message;
pub mod pad;
pub mod plutchik;
pub mod proactive;

pub use behavior::{
    BehaviorProfile, BehaviorType, PhaseHistoryEntry, SafetyFlag, TriggerEvent, TriggerType,
};
pub use bond::{
    BondLegacy, BondNotification, BondQueueEntry, BondRisk, BondStatus, BondTier, DecayPhase,
    DecaySettings, NotificationKind, QueueStatus, RarityTier, SymbolicBond, TierRequirements,
};
pub use config::{
    EngineConfig, GatewayConfig, LlmConfig, ProactiveDefaults, StoreConfig, ThymosConfig,
};
pub use message::{ChatMessage, MessageAuthor};
pub use pad::PadMood;
pub use plutchik::{sanitize_f32, Dyad, Emotion, EmotionDeltas, PlutchikState};
pub use proactive::{
    Commitment, LifeEvent, ProactiveConfig, ProactiveMessage, ProactiveTriggerKind,
    RelationshipStage, SpecialDate,
};
