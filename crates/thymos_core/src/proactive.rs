//! Proactive messaging types — when an agent is allowed to speak first
//!
//! The per-(user, agent) config gates delivery windows and frequency; the
//! append-only `ProactiveMessage` log doubles as the rate-limit ledger.
//! Times are kept as `"HH:MM"` strings in the user's local clock, matching
//! what clients submit.

use anyhow::bail;
use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bond::BondTier;
use crate::plutchik::deserialize_safe_f32;

/// Parse `"HH:MM"` into minutes since midnight.
pub fn parse_hhmm(s: &str) -> Option<u16> {
    let (h, m) = s.split_once(':')?;
    let h: u16 = h.parse().ok()?;
    let m: u16 = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

/// Lowercase three-letter key used in `active_days`.
pub fn weekday_key(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

/// How advanced the relationship is, derived from the strongest bond tier.
/// Controls how quickly inactivity becomes worth acting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStage {
    Stranger,
    Acquaintance,
    Friend,
    CloseFriend,
}

impl RelationshipStage {
    pub fn from_tier(tier: Option<BondTier>) -> Self {
        match tier {
            None => RelationshipStage::Stranger,
            Some(BondTier::Acquaintance) => RelationshipStage::Acquaintance,
            Some(BondTier::Mentor)
            | Some(BondTier::Confidant)
            | Some(BondTier::CreativePartner)
            | Some(BondTier::AdventureCompanion) => RelationshipStage::Friend,
            Some(BondTier::BestFriend) | Some(BondTier::Romantic) => RelationshipStage::CloseFriend,
        }
    }

    /// Hours of silence before an inactivity trigger becomes a candidate.
    pub fn inactivity_threshold_hours(&self) -> i64 {
        match self {
            RelationshipStage::Stranger => 72,
            RelationshipStage::Acquaintance => 48,
            RelationshipStage::Friend => 24,
            RelationshipStage::CloseFriend => 12,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipStage::Stranger => "stranger",
            RelationshipStage::Acquaintance => "acquaintance",
            RelationshipStage::Friend => "friend",
            RelationshipStage::CloseFriend => "close_friend",
        }
    }
}

/// Why the agent wants to reach out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProactiveTriggerKind {
    Inactivity,
    FollowUp,
    EmotionalCheckin,
    Celebration,
    LifeEvent,
    SpecialDate,
}

impl ProactiveTriggerKind {
    pub const ALL: [ProactiveTriggerKind; 6] = [
        ProactiveTriggerKind::Inactivity,
        ProactiveTriggerKind::FollowUp,
        ProactiveTriggerKind::EmotionalCheckin,
        ProactiveTriggerKind::Celebration,
        ProactiveTriggerKind::LifeEvent,
        ProactiveTriggerKind::SpecialDate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProactiveTriggerKind::Inactivity => "inactivity",
            ProactiveTriggerKind::FollowUp => "follow_up",
            ProactiveTriggerKind::EmotionalCheckin => "emotional_checkin",
            ProactiveTriggerKind::Celebration => "celebration",
            ProactiveTriggerKind::LifeEvent => "life_event",
            ProactiveTriggerKind::SpecialDate => "special_date",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "inactivity" => Some(ProactiveTriggerKind::Inactivity),
            "follow_up" => Some(ProactiveTriggerKind::FollowUp),
            "emotional_checkin" => Some(ProactiveTriggerKind::EmotionalCheckin),
            "celebration" => Some(ProactiveTriggerKind::Celebration),
            "life_event" => Some(ProactiveTriggerKind::LifeEvent),
            "special_date" => Some(ProactiveTriggerKind::SpecialDate),
            _ => None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn all_days() -> Vec<String> {
    ["mon", "tue", "wed", "thu", "fri", "sat", "sun"]
        .iter()
        .map(|d| d.to_string())
        .collect()
}

fn default_quiet_start() -> String {
    "23:00".to_string()
}

fn default_quiet_end() -> String {
    "08:00".to_string()
}

fn default_max_per_day() -> u32 {
    3
}

fn default_min_hours_between() -> i64 {
    12
}

/// Per-(user, agent) delivery preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProactiveConfig {
    pub user_id: String,
    pub agent_id: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Start of the do-not-disturb window, local `"HH:MM"`.
    #[serde(default = "default_quiet_start")]
    pub quiet_start: String,
    /// End of the do-not-disturb window; equal to `quiet_start` disables it.
    #[serde(default = "default_quiet_end")]
    pub quiet_end: String,
    #[serde(default = "all_days")]
    pub active_days: Vec<String>,
    #[serde(default = "default_max_per_day")]
    pub max_per_day: u32,
    #[serde(default = "default_min_hours_between")]
    pub min_hours_between: i64,
    pub updated_at: DateTime<Utc>,
}

impl ProactiveConfig {
    pub fn defaults(user_id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            agent_id: agent_id.into(),
            enabled: true,
            quiet_start: default_quiet_start(),
            quiet_end: default_quiet_end(),
            active_days: all_days(),
            max_per_day: default_max_per_day(),
            min_hours_between: default_min_hours_between(),
            updated_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if parse_hhmm(&self.quiet_start).is_none() {
            bail!("quiet_start is not a valid HH:MM time: {:?}", self.quiet_start);
        }
        if parse_hhmm(&self.quiet_end).is_none() {
            bail!("quiet_end is not a valid HH:MM time: {:?}", self.quiet_end);
        }
        for day in &self.active_days {
            if !["mon", "tue", "wed", "thu", "fri", "sat", "sun"].contains(&day.as_str()) {
                bail!("unknown weekday in active_days: {:?}", day);
            }
        }
        if self.min_hours_between < 0 {
            bail!("min_hours_between must be non-negative");
        }
        Ok(())
    }
}

/// Append-only record of one proactive decision. Delivery happens elsewhere;
/// this row exists for cadence auditing and rate limiting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProactiveMessage {
    pub id: Uuid,
    pub user_id: String,
    pub agent_id: String,
    pub trigger_kind: ProactiveTriggerKind,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub priority: f32,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Something the user said they would do, worth asking about later.
/// Two follow-up attempts maximum, then the commitment goes quiet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commitment {
    pub id: Uuid,
    pub user_id: String,
    pub agent_id: String,
    pub description: String,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub importance: f32,
    pub mentioned_at: DateTime<Utc>,
    pub due_at: Option<DateTime<Utc>>,
    pub attempts: u32,
    pub completed: bool,
}

impl Commitment {
    pub const MAX_ATTEMPTS: u32 = 2;

    pub fn new(
        user_id: impl Into<String>,
        agent_id: impl Into<String>,
        description: impl Into<String>,
        importance: f32,
        due_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            agent_id: agent_id.into(),
            description: description.into(),
            importance: importance.clamp(0.0, 1.0),
            mentioned_at: Utc::now(),
            due_at,
            attempts: 0,
            completed: false,
        }
    }

    pub fn exhausted(&self) -> bool {
        self.completed || self.attempts >= Self::MAX_ATTEMPTS
    }
}

/// An upcoming event in the user's life (exam, interview, trip).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifeEvent {
    pub id: Uuid,
    pub user_id: String,
    pub agent_id: String,
    pub description: String,
    pub happens_at: DateTime<Utc>,
}

/// A recurring per-user date (birthday and the like); month/day only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialDate {
    pub id: Uuid,
    pub user_id: String,
    pub label: String,
    pub month: u32,
    pub day: u32,
}
