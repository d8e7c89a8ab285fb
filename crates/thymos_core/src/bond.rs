//! Symbolic bonds — scarce, decaying user↔agent relationships
//!
//! A bond occupies one of a tier's limited slots and loses standing the
//! longer the user stays away. Risk classification is a pure function of
//! elapsed days so every scan recomputes it from scratch; `decay_phase` is
//! only a cursor that remembers which warning has already been sent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::plutchik::{deserialize_safe_f32, sanitize_f32};

/// Relationship tiers, scarcest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BondTier {
    Romantic,
    BestFriend,
    Mentor,
    Confidant,
    CreativePartner,
    AdventureCompanion,
    Acquaintance,
}

/// What a user must have earned before claiming a tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierRequirements {
    /// 0–100 affinity floor.
    pub min_affinity: f32,
    pub min_days: i64,
    pub min_interactions: u32,
}

impl BondTier {
    pub const ALL: [BondTier; 7] = [
        BondTier::Romantic,
        BondTier::BestFriend,
        BondTier::Mentor,
        BondTier::Confidant,
        BondTier::CreativePartner,
        BondTier::AdventureCompanion,
        BondTier::Acquaintance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BondTier::Romantic => "romantic",
            BondTier::BestFriend => "best_friend",
            BondTier::Mentor => "mentor",
            BondTier::Confidant => "confidant",
            BondTier::CreativePartner => "creative_partner",
            BondTier::AdventureCompanion => "adventure_companion",
            BondTier::Acquaintance => "acquaintance",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "romantic" => Some(BondTier::Romantic),
            "best_friend" => Some(BondTier::BestFriend),
            "mentor" => Some(BondTier::Mentor),
            "confidant" => Some(BondTier::Confidant),
            "creative_partner" => Some(BondTier::CreativePartner),
            "adventure_companion" => Some(BondTier::AdventureCompanion),
            "acquaintance" => Some(BondTier::Acquaintance),
            _ => None,
        }
    }

    /// Slots available per agent. `None` means unlimited.
    pub fn slots(&self) -> Option<u32> {
        match self {
            BondTier::Romantic => Some(1),
            BondTier::BestFriend => Some(5),
            BondTier::Mentor => Some(10),
            BondTier::Confidant => Some(50),
            BondTier::CreativePartner => Some(20),
            BondTier::AdventureCompanion => Some(30),
            BondTier::Acquaintance => None,
        }
    }

    pub fn requirements(&self) -> TierRequirements {
        let (min_affinity, min_days, min_interactions) = match self {
            BondTier::Romantic => (80.0, 30, 100),
            BondTier::BestFriend => (70.0, 20, 60),
            BondTier::Mentor => (60.0, 15, 40),
            BondTier::Confidant => (50.0, 10, 30),
            BondTier::CreativePartner => (55.0, 12, 35),
            BondTier::AdventureCompanion => (50.0, 10, 25),
            BondTier::Acquaintance => (20.0, 3, 10),
        };
        TierRequirements {
            min_affinity,
            min_days,
            min_interactions,
        }
    }
}

/// Persisted bond status (the terminal "released" state deletes the row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BondStatus {
    Active,
    Dormant,
    Fragile,
}

impl BondStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BondStatus::Active => "active",
            BondStatus::Dormant => "dormant",
            BondStatus::Fragile => "fragile",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(BondStatus::Active),
            "dormant" => Some(BondStatus::Dormant),
            "fragile" => Some(BondStatus::Fragile),
            _ => None,
        }
    }
}

/// Which decay warning has already been delivered. Forward-looking names:
/// `Dormant` means "warned that dormancy is coming", and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayPhase {
    None,
    Dormant,
    Fragile,
    Critical,
}

impl DecayPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecayPhase::None => "none",
            DecayPhase::Dormant => "dormant",
            DecayPhase::Fragile => "fragile",
            DecayPhase::Critical => "critical",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "none" => Some(DecayPhase::None),
            "dormant" => Some(DecayPhase::Dormant),
            "fragile" => Some(DecayPhase::Fragile),
            "critical" => Some(DecayPhase::Critical),
            _ => None,
        }
    }
}

/// Day thresholds for the decay ladder. Per-agent overridable via config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecaySettings {
    pub warning_days: i64,
    pub dormant_days: i64,
    pub fragile_days: i64,
    pub release_days: i64,
}

impl Default for DecaySettings {
    fn default() -> Self {
        Self {
            warning_days: 30,
            dormant_days: 60,
            fragile_days: 90,
            release_days: 120,
        }
    }
}

impl DecaySettings {
    /// Reject non-monotonic ladders, falling back to the defaults.
    pub fn sanitized(self) -> Self {
        let ordered = 0 < self.warning_days
            && self.warning_days < self.dormant_days
            && self.dormant_days < self.fragile_days
            && self.fragile_days < self.release_days;
        if ordered {
            self
        } else {
            tracing::warn!(?self, "non-monotonic decay thresholds, using defaults");
            Self::default()
        }
    }
}

/// Pure classification of a bond by days since last interaction.
/// Ordered so that more elapsed time never yields a lower risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BondRisk {
    Active,
    Warned,
    Dormant,
    Fragile,
    Released,
}

impl BondRisk {
    pub fn classify(elapsed_days: i64, settings: &DecaySettings) -> BondRisk {
        if elapsed_days >= settings.release_days {
            BondRisk::Released
        } else if elapsed_days >= settings.fragile_days {
            BondRisk::Fragile
        } else if elapsed_days >= settings.dormant_days {
            BondRisk::Dormant
        } else if elapsed_days >= settings.warning_days {
            BondRisk::Warned
        } else {
            BondRisk::Active
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BondRisk::Active => "active",
            BondRisk::Warned => "warned",
            BondRisk::Dormant => "dormant",
            BondRisk::Fragile => "fragile",
            BondRisk::Released => "released",
        }
    }
}

/// Rarity label derived from the rarity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RarityTier {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
    Mythic,
}

impl RarityTier {
    pub fn from_score(score: f32) -> RarityTier {
        let score = sanitize_f32(score, 0.0);
        if score >= 0.95 {
            RarityTier::Mythic
        } else if score >= 0.85 {
            RarityTier::Legendary
        } else if score >= 0.70 {
            RarityTier::Epic
        } else if score >= 0.50 {
            RarityTier::Rare
        } else if score >= 0.30 {
            RarityTier::Uncommon
        } else {
            RarityTier::Common
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RarityTier::Common => "common",
            RarityTier::Uncommon => "uncommon",
            RarityTier::Rare => "rare",
            RarityTier::Epic => "epic",
            RarityTier::Legendary => "legendary",
            RarityTier::Mythic => "mythic",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "common" => Some(RarityTier::Common),
            "uncommon" => Some(RarityTier::Uncommon),
            "rare" => Some(RarityTier::Rare),
            "epic" => Some(RarityTier::Epic),
            "legendary" => Some(RarityTier::Legendary),
            "mythic" => Some(RarityTier::Mythic),
            _ => None,
        }
    }
}

/// One user↔agent relationship occupying a tier slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolicBond {
    pub id: Uuid,
    pub user_id: String,
    pub agent_id: String,
    pub tier: BondTier,
    pub status: BondStatus,
    pub decay_phase: DecayPhase,

    /// 0–100 composite closeness score.
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub affinity: f32,
    pub duration_days: i64,
    pub total_interactions: u32,
    pub shared_experiences: u32,

    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub rarity_score: f32,
    pub rarity_tier: RarityTier,
    /// 1-based rank among active same-agent same-tier bonds.
    pub global_rank: u32,

    pub started_at: DateTime<Utc>,
    pub last_interaction_at: DateTime<Utc>,
}

impl SymbolicBond {
    pub fn new(user_id: impl Into<String>, agent_id: impl Into<String>, tier: BondTier) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            agent_id: agent_id.into(),
            tier,
            status: BondStatus::Active,
            decay_phase: DecayPhase::None,
            affinity: 0.0,
            duration_days: 0,
            total_interactions: 0,
            shared_experiences: 0,
            rarity_score: 0.0,
            rarity_tier: RarityTier::Common,
            global_rank: 1,
            started_at: now,
            last_interaction_at: now,
        }
    }

    pub fn days_since_last_interaction(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_interaction_at).num_days()
    }

    /// Chat activity pulls the bond back to full health.
    pub fn record_interaction(&mut self, now: DateTime<Utc>) {
        self.status = BondStatus::Active;
        self.decay_phase = DecayPhase::None;
        self.total_interactions = self.total_interactions.saturating_add(1);
        self.last_interaction_at = now;
        self.duration_days = (now - self.started_at).num_days().max(0);
    }

    pub fn risk(&self, now: DateTime<Utc>, settings: &DecaySettings) -> BondRisk {
        BondRisk::classify(self.days_since_last_interaction(now), settings)
    }
}

/// What a bond notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DecayWarning,
    BecameDormant,
    BecameFragile,
    Released,
    SlotOffer,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::DecayWarning => "decay_warning",
            NotificationKind::BecameDormant => "became_dormant",
            NotificationKind::BecameFragile => "became_fragile",
            NotificationKind::Released => "released",
            NotificationKind::SlotOffer => "slot_offer",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "decay_warning" => Some(NotificationKind::DecayWarning),
            "became_dormant" => Some(NotificationKind::BecameDormant),
            "became_fragile" => Some(NotificationKind::BecameFragile),
            "released" => Some(NotificationKind::Released),
            "slot_offer" => Some(NotificationKind::SlotOffer),
            _ => None,
        }
    }
}

/// Append-only notice row. Delivery transport is out of scope; rows exist so
/// decay warnings fire once per phase change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondNotification {
    pub id: Uuid,
    pub bond_id: Option<Uuid>,
    pub user_id: String,
    pub agent_id: String,
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl BondNotification {
    pub fn new(
        bond_id: Option<Uuid>,
        user_id: impl Into<String>,
        agent_id: impl Into<String>,
        kind: NotificationKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            bond_id,
            user_id: user_id.into(),
            agent_id: agent_id.into(),
            kind,
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

/// Snapshot written when a bond is released; the bond row itself is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondLegacy {
    pub id: Uuid,
    pub bond_id: Uuid,
    pub user_id: String,
    pub agent_id: String,
    pub tier: BondTier,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub affinity: f32,
    pub duration_days: i64,
    pub total_interactions: u32,
    pub rarity_tier: RarityTier,
    pub released_at: DateTime<Utc>,
}

impl BondLegacy {
    pub fn from_bond(bond: &SymbolicBond, released_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            bond_id: bond.id,
            user_id: bond.user_id.clone(),
            agent_id: bond.agent_id.clone(),
            tier: bond.tier,
            affinity: bond.affinity,
            duration_days: bond.duration_days,
            total_interactions: bond.total_interactions,
            rarity_tier: bond.rarity_tier,
            released_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Waiting,
    Offered,
    Expired,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Waiting => "waiting",
            QueueStatus::Offered => "offered",
            QueueStatus::Expired => "expired",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "waiting" => Some(QueueStatus::Waiting),
            "offered" => Some(QueueStatus::Offered),
            "expired" => Some(QueueStatus::Expired),
            _ => None,
        }
    }
}

/// A user waiting for a slot in a full tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondQueueEntry {
    pub id: Uuid,
    pub user_id: String,
    pub agent_id: String,
    pub tier: BondTier,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub eligibility_score: f32,
    pub status: QueueStatus,
    pub joined_at: DateTime<Utc>,
    pub offer_expires_at: Option<DateTime<Utc>>,
}

impl BondQueueEntry {
    pub fn new(
        user_id: impl Into<String>,
        agent_id: impl Into<String>,
        tier: BondTier,
        eligibility_score: f32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            agent_id: agent_id.into(),
            tier,
            eligibility_score: sanitize_f32(eligibility_score, 0.0).clamp(0.0, 1.0),
            status: QueueStatus::Waiting,
            joined_at: Utc::now(),
            offer_expires_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_classification_boundaries() {
        let s = DecaySettings::default();
        assert_eq!(BondRisk::classify(0, &s), BondRisk::Active);
        assert_eq!(BondRisk::classify(29, &s), BondRisk::Active);
        assert_eq!(BondRisk::classify(30, &s), BondRisk::Warned);
        assert_eq!(BondRisk::classify(59, &s), BondRisk::Warned);
        assert_eq!(BondRisk::classify(60, &s), BondRisk::Dormant);
        assert_eq!(BondRisk::classify(89, &s), BondRisk::Dormant);
        assert_eq!(BondRisk::classify(90, &s), BondRisk::Fragile);
        assert_eq!(BondRisk::classify(119, &s), BondRisk::Fragile);
        assert_eq!(BondRisk::classify(120, &s), BondRisk::Released);
        assert_eq!(BondRisk::classify(5000, &s), BondRisk::Released);
    }

    #[test]
    fn test_classification_monotonic() {
        let s = DecaySettings::default();
        let mut last = BondRisk::Active;
        for days in 0..200 {
            let risk = BondRisk::classify(days, &s);
            assert!(risk >= last, "risk regressed at day {days}");
            last = risk;
        }
    }

    #[test]
    fn test_sanitized_rejects_disorder() {
        let bad = DecaySettings {
            warning_days: 90,
            dormant_days: 60,
            fragile_days: 30,
            release_days: 120,
        };
        assert_eq!(bad.sanitized(), DecaySettings::default());

        let good = DecaySettings {
            warning_days: 7,
            dormant_days: 14,
            fragile_days: 21,
            release_days: 28,
        };
        assert_eq!(good.sanitized(), good);
    }

    #[test]
    fn test_rarity_tier_thresholds() {
        assert_eq!(RarityTier::from_score(0.96), RarityTier::Mythic);
        assert_eq!(RarityTier::from_score(0.95), RarityTier::Mythic);
        assert_eq!(RarityTier::from_score(0.85), RarityTier::Legendary);
        assert_eq!(RarityTier::from_score(0.70), RarityTier::Epic);
        assert_eq!(RarityTier::from_score(0.50), RarityTier::Rare);
        assert_eq!(RarityTier::from_score(0.30), RarityTier::Uncommon);
        assert_eq!(RarityTier::from_score(0.29), RarityTier::Common);
        assert_eq!(RarityTier::from_score(f32::NAN), RarityTier::Common);
    }

    #[test]
    fn test_record_interaction_resets_decay() {
        let mut bond = SymbolicBond::new("user-1", "agent-1", BondTier::BestFriend);
        bond.status = BondStatus::Fragile;
        bond.decay_phase = DecayPhase::Critical;
        bond.started_at = Utc::now() - Duration::days(45);
        bond.last_interaction_at = Utc::now() - Duration::days(95);

        bond.record_interaction(Utc::now());
        assert_eq!(bond.status, BondStatus::Active);
        assert_eq!(bond.decay_phase, DecayPhase::None);
        assert_eq!(bond.total_interactions, 1);
        assert_eq!(bond.duration_days, 45);
        assert_eq!(bond.risk(Utc::now(), &DecaySettings::default()), BondRisk::Active);
    }

    #[test]
    fn test_tier_tables() {
        assert_eq!(BondTier::Romantic.slots(), Some(1));
        assert_eq!(BondTier::Acquaintance.slots(), None);

        let req = BondTier::Romantic.requirements();
        assert_eq!(req.min_affinity, 80.0);
        assert_eq!(req.min_days, 30);
        assert_eq!(req.min_interactions, 100);

        for tier in BondTier::ALL {
            assert_eq!(BondTier::parse_str(tier.as_str()), Some(tier));
        }
    }

    #[test]
    fn test_legacy_snapshot_copies_bond() {
        let mut bond = SymbolicBond::new("user-1", "agent-1", BondTier::Mentor);
        bond.affinity = 72.5;
        bond.duration_days = 140;
        bond.total_interactions = 88;
        bond.rarity_tier = RarityTier::Epic;

        let legacy = BondLegacy::from_bond(&bond, Utc::now());
        assert_eq!(legacy.bond_id, bond.id);
        assert_eq!(legacy.tier, BondTier::Mentor);
        assert_eq!(legacy.affinity, 72.5);
        assert_eq!(legacy.total_interactions, 88);
        assert_eq!(legacy.rarity_tier, RarityTier::Epic);
    }

    #[test]
    fn test_queue_entry_clamps_eligibility() {
        let entry = BondQueueEntry::new("user-1", "agent-1", BondTier::Romantic, 3.0);
        assert_eq!(entry.eligibility_score, 1.0);
        assert_eq!(entry.status, QueueStatus::Waiting);
        assert!(entry.offer_expires_at.is_none());
    }
}
