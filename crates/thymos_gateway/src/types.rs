//! Request and response bodies. Thin wrappers over core types; anything the
//! client should not be able to set (ids, timestamps, computed fields) is
//! filled in by the handler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use thymos_bonds::AffinityMetrics;
use thymos_core::behavior::{BehaviorProfile, BehaviorType, TriggerEvent};
use thymos_core::bond::{BondRisk, BondTier, DecaySettings, SymbolicBond};
use thymos_core::pad::PadMood;
use thymos_core::plutchik::{Dyad, PlutchikState};
use thymos_core::proactive::ProactiveConfig;

/// Body of `POST /v1/agents/{agent_id}/messages`.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestMessage {
    pub user_id: String,
    pub body: String,
}

/// Current emotional readout for one agent.
#[derive(Debug, Clone, Serialize)]
pub struct EmotionView {
    pub agent_id: String,
    pub state: PlutchikState,
    pub mood: PadMood,
    pub dyads: Vec<DyadView>,
    pub stability: f32,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DyadView {
    pub dyad: Dyad,
    pub level: f32,
}

/// A profile plus its computed display gate.
#[derive(Debug, Clone, Serialize)]
pub struct BehaviorView {
    #[serde(flatten)]
    pub profile: BehaviorProfile,
    pub should_display: bool,
}

impl From<BehaviorProfile> for BehaviorView {
    fn from(profile: BehaviorProfile) -> Self {
        Self {
            should_display: profile.should_display(),
            profile,
        }
    }
}

/// Body of `POST /v1/agents/{agent_id}/behaviors`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBehavior {
    pub behavior_type: BehaviorType,
    #[serde(default)]
    pub consent_granted: bool,
}

/// Pagination for the trigger-log slice.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage {
    pub behavior_type: BehaviorType,
    pub limit: i64,
    pub offset: i64,
    pub events: Vec<TriggerEvent>,
}

/// Body of `POST /v1/bonds`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBond {
    pub user_id: String,
    pub agent_id: String,
    pub tier: BondTier,
    pub metrics: AffinityMetrics,
}

/// A bond plus its decay classification at read time.
#[derive(Debug, Clone, Serialize)]
pub struct BondView {
    #[serde(flatten)]
    pub bond: SymbolicBond,
    pub risk: BondRisk,
    pub days_inactive: i64,
}

impl BondView {
    pub fn compute(bond: SymbolicBond, settings: &DecaySettings, now: DateTime<Utc>) -> Self {
        Self {
            risk: bond.risk(now, settings),
            days_inactive: bond.days_since_last_interaction(now),
            bond,
        }
    }
}

/// Query string of `GET /v1/users/{user_id}/proactive-config`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProactiveConfigQuery {
    pub agent_id: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_quiet_start() -> String {
    "23:00".to_string()
}

fn default_quiet_end() -> String {
    "08:00".to_string()
}

fn all_days() -> Vec<String> {
    ["mon", "tue", "wed", "thu", "fri", "sat", "sun"]
        .iter()
        .map(|d| d.to_string())
        .collect()
}

fn default_max_per_day() -> u32 {
    3
}

fn default_min_hours_between() -> i64 {
    12
}

/// Body of `PUT /v1/users/{user_id}/proactive-config`. Replaces the row for
/// the (path user, body agent) pair; omitted fields take the defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ProactiveConfigUpdate {
    pub agent_id: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_quiet_start")]
    pub quiet_start: String,
    #[serde(default = "default_quiet_end")]
    pub quiet_end: String,
    #[serde(default = "all_days")]
    pub active_days: Vec<String>,
    #[serde(default = "default_max_per_day")]
    pub max_per_day: u32,
    #[serde(default = "default_min_hours_between")]
    pub min_hours_between: i64,
}

impl ProactiveConfigUpdate {
    pub fn into_config(self, user_id: &str, now: DateTime<Utc>) -> ProactiveConfig {
        ProactiveConfig {
            user_id: user_id.to_string(),
            agent_id: self.agent_id,
            enabled: self.enabled,
            quiet_start: self.quiet_start,
            quiet_end: self.quiet_end,
            active_days: self.active_days,
            max_per_day: self.max_per_day,
            min_hours_between: self.min_hours_between,
            updated_at: now,
        }
    }
}
