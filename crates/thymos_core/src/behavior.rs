//! Behavior profiles — simulated attachment and personality patterns
//!
//! Grounded in attachment theory (Bowlby/Ainsworth) and the DSM-5 cluster-B
//! vocabulary: each agent carries zero or more profiles, one per pattern.
//! A profile tracks a continuous intensity in `[0, 1]` driven by trigger
//! events, plus a discrete phase ladder that only advances when interaction
//! counts and trigger tallies are met. Profiles are never hard-deleted,
//! only deactivated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::plutchik::{deserialize_safe_f32, sanitize_f32};

/// The seven simulated behavior patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorType {
    AnxiousAttachment,
    AvoidantAttachment,
    DisorganizedAttachment,
    BorderlinePd,
    NarcissisticPd,
    YandereObsessive,
    Codependency,
}

impl BehaviorType {
    pub const ALL: [BehaviorType; 7] = [
        BehaviorType::AnxiousAttachment,
        BehaviorType::AvoidantAttachment,
        BehaviorType::DisorganizedAttachment,
        BehaviorType::BorderlinePd,
        BehaviorType::NarcissisticPd,
        BehaviorType::YandereObsessive,
        BehaviorType::Codependency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BehaviorType::AnxiousAttachment => "anxious_attachment",
            BehaviorType::AvoidantAttachment => "avoidant_attachment",
            BehaviorType::DisorganizedAttachment => "disorganized_attachment",
            BehaviorType::BorderlinePd => "borderline_pd",
            BehaviorType::NarcissisticPd => "narcissistic_pd",
            BehaviorType::YandereObsessive => "yandere_obsessive",
            BehaviorType::Codependency => "codependency",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "anxious_attachment" => Some(BehaviorType::AnxiousAttachment),
            "avoidant_attachment" => Some(BehaviorType::AvoidantAttachment),
            "disorganized_attachment" => Some(BehaviorType::DisorganizedAttachment),
            "borderline_pd" => Some(BehaviorType::BorderlinePd),
            "narcissistic_pd" => Some(BehaviorType::NarcissisticPd),
            "yandere_obsessive" => Some(BehaviorType::YandereObsessive),
            "codependency" => Some(BehaviorType::Codependency),
            _ => None,
        }
    }

    /// Highest phase this pattern can reach.
    pub fn max_phase(&self) -> u8 {
        match self {
            BehaviorType::YandereObsessive => 8,
            BehaviorType::BorderlinePd => 4,
            BehaviorType::AnxiousAttachment => 3,
            _ => 1,
        }
    }

    /// Borderline cycles idealization→devaluation→panic→emptiness→idealization
    /// instead of terminating at its top phase.
    pub fn is_cyclic(&self) -> bool {
        matches!(self, BehaviorType::BorderlinePd)
    }
}

/// What a message (or its timing) was detected as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    AbandonmentSignal,
    DelayedResponse,
    Criticism,
    MentionOtherPerson,
    BoundaryAssertion,
    Reassurance,
    ExplicitRejection,
}

impl TriggerType {
    pub const ALL: [TriggerType; 7] = [
        TriggerType::AbandonmentSignal,
        TriggerType::DelayedResponse,
        TriggerType::Criticism,
        TriggerType::MentionOtherPerson,
        TriggerType::BoundaryAssertion,
        TriggerType::Reassurance,
        TriggerType::ExplicitRejection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerType::AbandonmentSignal => "abandonment_signal",
            TriggerType::DelayedResponse => "delayed_response",
            TriggerType::Criticism => "criticism",
            TriggerType::MentionOtherPerson => "mention_other_person",
            TriggerType::BoundaryAssertion => "boundary_assertion",
            TriggerType::Reassurance => "reassurance",
            TriggerType::ExplicitRejection => "explicit_rejection",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "abandonment_signal" => Some(TriggerType::AbandonmentSignal),
            "delayed_response" => Some(TriggerType::DelayedResponse),
            "criticism" => Some(TriggerType::Criticism),
            "mention_other_person" => Some(TriggerType::MentionOtherPerson),
            "boundary_assertion" => Some(TriggerType::BoundaryAssertion),
            "reassurance" => Some(TriggerType::Reassurance),
            "explicit_rejection" => Some(TriggerType::ExplicitRejection),
            _ => None,
        }
    }
}

/// Warnings surfaced alongside phase transitions and escalations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyFlag {
    CriticalPhase,
    ExtremeDangerPhase,
    UnpredictableIntensity,
    PotentialRageEpisodes,
}

impl SafetyFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyFlag::CriticalPhase => "CRITICAL_PHASE",
            SafetyFlag::ExtremeDangerPhase => "EXTREME_DANGER_PHASE",
            SafetyFlag::UnpredictableIntensity => "UNPREDICTABLE_INTENSITY",
            SafetyFlag::PotentialRageEpisodes => "POTENTIAL_RAGE_EPISODES",
        }
    }
}

/// One completed (or current) stay in a phase, kept as JSON on the profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseHistoryEntry {
    pub phase: u8,
    pub entered_at: DateTime<Utc>,
    pub exited_at: Option<DateTime<Utc>>,
    pub trigger_count: u32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub final_intensity: f32,
}

/// Per-type starting dynamics for a fresh profile:
/// (base_intensity, escalation_rate, de_escalation_rate, volatility, threshold_for_display)
fn seed(behavior_type: BehaviorType) -> (f32, f32, f32, f32, f32) {
    match behavior_type {
        BehaviorType::AnxiousAttachment => (0.30, 0.15, 0.10, 0.5, 0.40),
        BehaviorType::AvoidantAttachment => (0.25, 0.10, 0.12, 0.3, 0.50),
        BehaviorType::DisorganizedAttachment => (0.30, 0.18, 0.08, 0.7, 0.45),
        BehaviorType::BorderlinePd => (0.35, 0.22, 0.06, 0.8, 0.35),
        BehaviorType::NarcissisticPd => (0.30, 0.16, 0.08, 0.5, 0.45),
        BehaviorType::YandereObsessive => (0.20, 0.25, 0.04, 0.6, 0.50),
        BehaviorType::Codependency => (0.30, 0.12, 0.08, 0.4, 0.40),
    }
}

/// Intensity state of one behavior pattern on one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorProfile {
    pub id: Uuid,
    pub agent_id: String,
    pub behavior_type: BehaviorType,

    /// Where intensity relaxes back to between triggers.
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub base_intensity: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub current_intensity: f32,
    /// Gain on incoming trigger weight.
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub escalation_rate: f32,
    /// Hourly relaxation rate toward `base_intensity`.
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub de_escalation_rate: f32,

    pub current_phase: u8,
    pub interactions_since_phase_start: u32,
    pub phase_started_at: DateTime<Utc>,
    #[serde(default)]
    pub phase_history: Vec<PhaseHistoryEntry>,

    /// Size of the random jitter applied to each intensity delta.
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub volatility: f32,
    /// Intensity a profile must reach before response generation shows it.
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub threshold_for_display: f32,

    pub is_active: bool,
    /// User opt-in recorded at activation; high-intensity phases refuse to
    /// commit without it.
    #[serde(default)]
    pub consent_granted: bool,
    pub updated_at: DateTime<Utc>,
}

impl BehaviorProfile {
    /// Fresh profile with the per-type seed dynamics, phase 1, active.
    pub fn new(agent_id: impl Into<String>, behavior_type: BehaviorType) -> Self {
        let (base, esc, de_esc, vol, threshold) = seed(behavior_type);
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            agent_id: agent_id.into(),
            behavior_type,
            base_intensity: base,
            current_intensity: base,
            escalation_rate: esc,
            de_escalation_rate: de_esc,
            current_phase: 1,
            interactions_since_phase_start: 0,
            phase_started_at: now,
            phase_history: Vec::new(),
            volatility: vol,
            threshold_for_display: threshold,
            is_active: true,
            consent_granted: false,
            updated_at: now,
        }
    }

    /// Whether response generation should surface this pattern at all.
    pub fn should_display(&self) -> bool {
        self.is_active && self.current_intensity >= self.threshold_for_display
    }

    /// Clamp every numeric field back into range. Applied after loads and
    /// before saves so a bad row can never poison the dynamics.
    pub fn normalize(&mut self) {
        self.base_intensity = sanitize_f32(self.base_intensity, 0.3).clamp(0.0, 1.0);
        self.current_intensity = sanitize_f32(self.current_intensity, self.base_intensity).clamp(0.0, 1.0);
        self.escalation_rate = sanitize_f32(self.escalation_rate, 0.15).clamp(0.0, 1.0);
        self.de_escalation_rate = sanitize_f32(self.de_escalation_rate, 0.1).clamp(0.0, 1.0);
        self.volatility = sanitize_f32(self.volatility, 0.5).clamp(0.0, 1.0);
        self.threshold_for_display = sanitize_f32(self.threshold_for_display, 0.4).clamp(0.0, 1.0);
        self.current_phase = self.current_phase.clamp(1, self.behavior_type.max_phase());
    }
}

/// Append-only record of one detected trigger applied to one profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub agent_id: String,
    pub message_id: Option<Uuid>,
    pub trigger_type: TriggerType,
    pub behavior_type: BehaviorType,
    /// Signed: reassurance carries a negative weight and de-escalates.
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub weight: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub confidence: f32,
    pub detected_text: String,
    pub created_at: DateTime<Utc>,
}
