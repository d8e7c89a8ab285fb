//! Trigger evaluation and firing.
//!
//! `evaluate_pair` scores every reason the agent might reach out to one
//! (user, agent) pair; `fire_best` takes the top candidate through the
//! delivery gates and appends the ProactiveMessage row; `scan_all` runs the
//! whole roster, which is what the scheduler loop calls.

use anyhow::Result;
use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use thymos_core::message::MessageAuthor;
use thymos_core::plutchik::Emotion;
use thymos_core::proactive::{
    Commitment, ProactiveConfig, ProactiveMessage, ProactiveTriggerKind, RelationshipStage,
};
use thymos_store::SqliteStore;

use crate::presence;

const MESSAGE_MILESTONES: [u64; 6] = [10, 50, 100, 250, 500, 1000];
const ANNIVERSARY_DAYS: [i64; 5] = [30, 60, 90, 180, 365];
const NEGATIVE_EMOTIONS: [Emotion; 4] =
    [Emotion::Sadness, Emotion::Fear, Emotion::Anger, Emotion::Disgust];

/// How far ahead the life-event lookout reaches.
const LIFE_EVENT_HORIZON_HOURS: i64 = 48;

/// One scored reason to reach out. `commitment_id` ties a follow-up back to
/// the commitment it asks about so firing can count the attempt.
#[derive(Debug, Clone, Serialize)]
pub struct TriggerCandidate {
    pub kind: ProactiveTriggerKind,
    pub priority: f32,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commitment_id: Option<Uuid>,
}

impl TriggerCandidate {
    fn new(kind: ProactiveTriggerKind, priority: f32, reason: String) -> Self {
        Self {
            kind,
            priority: priority.clamp(0.0, 1.0),
            reason,
            commitment_id: None,
        }
    }
}

/// Counters from one roster pass.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ScanSummary {
    pub pairs: u32,
    pub fired: u32,
}

/// Scores all trigger kinds for one pair, best first.
///
/// The cooldown is checked before any evaluator runs: if the last
/// ProactiveMessage is newer than `min_hours_between`, the pair yields
/// nothing no matter what the history looks like.
pub async fn evaluate_pair(
    store: &SqliteStore,
    user_id: &str,
    agent_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<TriggerCandidate>> {
    let config = store
        .get_proactive_config(user_id, agent_id)
        .await?
        .unwrap_or_else(|| ProactiveConfig::defaults(user_id, agent_id));

    if !config.enabled {
        return Ok(Vec::new());
    }

    if let Some(last) = store.last_proactive_at(user_id, agent_id).await? {
        if now.signed_duration_since(last).num_hours() < config.min_hours_between {
            return Ok(Vec::new());
        }
    }

    let mut candidates = Vec::new();
    if let Some(candidate) = inactivity(store, user_id, agent_id, now).await? {
        candidates.push(candidate);
    }
    candidates.extend(follow_ups(store, user_id, agent_id, now).await?);
    if let Some(candidate) = emotional_checkin(store, user_id, agent_id, now).await? {
        candidates.push(candidate);
    }
    candidates.extend(celebrations(store, user_id, agent_id, now).await?);
    candidates.extend(life_events(store, user_id, agent_id, now).await?);
    candidates.extend(special_dates(store, user_id, now).await?);

    candidates.sort_by(|a, b| b.priority.total_cmp(&a.priority));
    Ok(candidates)
}

/// Fires the top candidate for one pair, if the delivery gates allow it.
///
/// Appends the ProactiveMessage row and, for follow-ups, counts the attempt
/// against the commitment. Returns the appended row.
pub async fn fire_best(
    store: &SqliteStore,
    user_id: &str,
    agent_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<ProactiveMessage>> {
    let mut candidates = evaluate_pair(store, user_id, agent_id, now).await?;
    if candidates.is_empty() {
        return Ok(None);
    }
    let best = candidates.remove(0);

    let config = store
        .get_proactive_config(user_id, agent_id)
        .await?
        .unwrap_or_else(|| ProactiveConfig::defaults(user_id, agent_id));

    if !presence::delivery_allowed(&config, now) {
        debug!(user_id, agent_id, "candidate held back by delivery window");
        return Ok(None);
    }

    let sent_today = store
        .count_proactive_since(user_id, agent_id, start_of_day(now))
        .await?;
    if sent_today >= config.max_per_day {
        debug!(user_id, agent_id, sent_today, "daily proactive cap reached");
        return Ok(None);
    }

    let message = ProactiveMessage {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        agent_id: agent_id.to_string(),
        trigger_kind: best.kind,
        priority: best.priority,
        reason: best.reason,
        created_at: now,
    };
    store.append_proactive_message(&message).await?;

    if let Some(commitment_id) = best.commitment_id {
        store.bump_commitment_attempt(commitment_id).await?;
    }

    info!(
        user_id,
        agent_id,
        kind = message.trigger_kind.as_str(),
        priority = message.priority,
        reason = %message.reason,
        "proactive message queued"
    );
    Ok(Some(message))
}

/// One pass over every pair that has ever messaged or bonded.
/// Failures are logged per pair and do not stop the scan.
#[tracing::instrument(skip_all, fields(now = %now))]
pub async fn scan_all(store: &SqliteStore, now: DateTime<Utc>) -> Result<ScanSummary> {
    let mut summary = ScanSummary::default();

    for (user_id, agent_id) in store.active_pairs().await? {
        summary.pairs += 1;
        match fire_best(store, &user_id, &agent_id, now).await {
            Ok(Some(_)) => summary.fired += 1,
            Ok(None) => {}
            Err(error) => {
                warn!(%user_id, %agent_id, %error, "proactive evaluation failed for pair");
            }
        }
    }

    info!(pairs = summary.pairs, fired = summary.fired, "proactive scan finished");
    Ok(summary)
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(now.date_naive().and_time(NaiveTime::MIN), Utc)
}

// ============================================================================
// Evaluators
// ============================================================================

/// Silence past the stage threshold. The bond tier sets how soon the agent
/// gets restless; a warm last conversation makes the nudge more likely.
async fn inactivity(
    store: &SqliteStore,
    user_id: &str,
    agent_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<TriggerCandidate>> {
    let Some(last) = store.last_user_message_at(agent_id, user_id).await? else {
        return Ok(None);
    };

    let tier = store.find_bond(user_id, agent_id).await?.map(|b| b.tier);
    let stage = RelationshipStage::from_tier(tier);
    let threshold = stage.inactivity_threshold_hours();
    let elapsed = now.signed_duration_since(last).num_hours();
    if elapsed < threshold {
        return Ok(None);
    }

    let overshoot = (elapsed - threshold) as f32;
    let mut priority = (overshoot / threshold as f32).min(0.9);
    priority += match stage {
        RelationshipStage::CloseFriend => 0.1,
        RelationshipStage::Friend => 0.05,
        _ => 0.0,
    };

    let recent = store.recent_messages(agent_id, user_id, 3).await?;
    let positive = recent.iter().filter(|m| m.is_positive()).count() >= 2;
    if positive {
        priority += 0.1;
    }

    let reason = format!(
        "no user message for {}h, {} threshold is {}h{}",
        elapsed,
        stage.as_str(),
        threshold,
        if positive { ", last conversation was warm" } else { "" },
    );
    Ok(Some(TriggerCandidate::new(
        ProactiveTriggerKind::Inactivity,
        priority,
        reason,
    )))
}

async fn follow_ups(
    store: &SqliteStore,
    user_id: &str,
    agent_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<TriggerCandidate>> {
    let mut out = Vec::new();

    for commitment in store.open_commitments(user_id, agent_id).await? {
        let Some((priority, label)) = follow_up_priority(&commitment, now) else {
            continue;
        };
        let mut candidate = TriggerCandidate::new(
            ProactiveTriggerKind::FollowUp,
            priority,
            format!("{}: {}", label, commitment.description),
        );
        candidate.commitment_id = Some(commitment.id);
        out.push(candidate);
    }

    Ok(out)
}

/// First matching window wins. A commitment whose due time is long gone can
/// still earn a mention-based nudge if it mattered enough.
fn follow_up_priority(commitment: &Commitment, now: DateTime<Utc>) -> Option<(f32, &'static str)> {
    let bump = commitment.importance * 0.15;

    if let Some(due) = commitment.due_at {
        let hours_until = due.signed_duration_since(now).num_hours();
        if hours_until < 0 && hours_until >= -48 {
            return Some((0.85 + bump, "commitment is past due"));
        }
        if (-12..=24).contains(&hours_until) {
            return Some((0.75 + bump, "commitment is coming due"));
        }
    }

    let mentioned_hours = now.signed_duration_since(commitment.mentioned_at).num_hours();
    if mentioned_hours >= 48 && commitment.importance >= 0.6 {
        return Some((0.65 + bump, "mentioned a while back"));
    }

    None
}

/// A negative dominant emotion snapshotted 24–72h ago. Too recent and the
/// conversation is still live; too old and asking reads as odd.
async fn emotional_checkin(
    store: &SqliteStore,
    user_id: &str,
    agent_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<TriggerCandidate>> {
    let from = now - Duration::hours(72);
    let until = now - Duration::hours(24);

    // Newest first, so the first negative reading is the freshest.
    for message in store.messages_between(agent_id, user_id, from, until).await? {
        if message.author != MessageAuthor::User {
            continue;
        }
        let (Some(emotion), Some(intensity)) =
            (message.dominant_emotion, message.dominant_intensity)
        else {
            continue;
        };
        if !NEGATIVE_EMOTIONS.contains(&emotion) {
            continue;
        }

        let priority = 0.7 + intensity * 0.2;
        let reason = format!(
            "{} was running at {:.2} when we last talked",
            emotion.as_str(),
            intensity
        );
        return Ok(Some(TriggerCandidate::new(
            ProactiveTriggerKind::EmotionalCheckin,
            priority,
            reason,
        )));
    }

    Ok(None)
}

/// Message-count milestones and bond anniversaries, both exact-day checks
/// (anniversaries get a one-day grace on either side).
async fn celebrations(
    store: &SqliteStore,
    user_id: &str,
    agent_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<TriggerCandidate>> {
    let mut out = Vec::new();

    let total = store.count_messages(agent_id, user_id).await?;
    if MESSAGE_MILESTONES.contains(&total) {
        out.push(TriggerCandidate::new(
            ProactiveTriggerKind::Celebration,
            0.75,
            format!("reached {} messages together", total),
        ));
    }

    if let Some(bond) = store.find_bond(user_id, agent_id).await? {
        let days = now.signed_duration_since(bond.started_at).num_days();
        if let Some(anniversary) = ANNIVERSARY_DAYS.iter().find(|&&a| (days - a).abs() <= 1) {
            out.push(TriggerCandidate::new(
                ProactiveTriggerKind::Celebration,
                0.8,
                format!("{}-day bond anniversary", anniversary),
            ));
        }
    }

    Ok(out)
}

/// Stored events inside the lookout horizon. Nearer events score higher.
async fn life_events(
    store: &SqliteStore,
    user_id: &str,
    agent_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<TriggerCandidate>> {
    let until = now + Duration::hours(LIFE_EVENT_HORIZON_HOURS);
    let mut out = Vec::new();

    for event in store.upcoming_life_events(user_id, agent_id, now, until).await? {
        let hours_until = event.happens_at.signed_duration_since(now).num_hours();
        let priority = (0.8 - hours_until as f32 / 100.0).clamp(0.6, 0.95);
        out.push(TriggerCandidate::new(
            ProactiveTriggerKind::LifeEvent,
            priority,
            format!("{} in {}h", event.description, hours_until),
        ));
    }

    Ok(out)
}

async fn special_dates(
    store: &SqliteStore,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<TriggerCandidate>> {
    let mut out = Vec::new();

    for date in store.special_dates_for(user_id).await? {
        if date.month == now.month() && date.day == now.day() {
            out.push(TriggerCandidate::new(
                ProactiveTriggerKind::SpecialDate,
                0.8,
                format!("today is {}", date.label),
            ));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;
    use thymos_core::bond::{BondTier, SymbolicBond};
    use thymos_core::message::ChatMessage;
    use thymos_core::proactive::{LifeEvent, SpecialDate};
    use thymos_store::SlotClaim;

    const USER: &str = "user-1";
    const AGENT: &str = "agent-1";

    async fn store() -> (SqliteStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("thymos.db")).await.unwrap();
        (store, dir)
    }

    // Wednesday noon, outside the default quiet window.
    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap()
    }

    async fn plant_message(store: &SqliteStore, hours_ago: i64, now: DateTime<Utc>) {
        let mut message = ChatMessage::user(AGENT, USER, "hola");
        message.created_at = now - Duration::hours(hours_ago);
        store.save_message(&message).await.unwrap();
    }

    async fn fast_config(store: &SqliteStore) -> ProactiveConfig {
        let mut config = ProactiveConfig::defaults(USER, AGENT);
        config.min_hours_between = 0;
        store.upsert_proactive_config(&config).await.unwrap();
        config
    }

    #[tokio::test]
    async fn test_blank_pair_yields_nothing() {
        let (store, _dir) = store().await;

        let candidates = evaluate_pair(&store, USER, AGENT, noon()).await.unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_inactivity_priority_scales_with_overshoot() {
        let (store, _dir) = store().await;
        let now = noon();
        plant_message(&store, 80, now).await;

        let candidates = evaluate_pair(&store, USER, AGENT, now).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].kind, ProactiveTriggerKind::Inactivity);
        // Stranger threshold 72h, 8h over.
        assert!((candidates[0].priority - 8.0 / 72.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_inactivity_bonuses_cap_at_one() {
        let (store, _dir) = store().await;
        let now = noon();

        let mut bond = SymbolicBond::new(USER, AGENT, BondTier::Romantic);
        bond.started_at = now - Duration::days(5);
        assert!(matches!(
            store.try_claim_slot(&bond).await.unwrap(),
            SlotClaim::Created
        ));

        // Three warm messages 30h back; close_friend threshold is 12h.
        for i in 0..3 {
            let mut message = ChatMessage::user(AGENT, USER, "gracias");
            message.joy = Some(0.8);
            message.created_at = now - Duration::hours(30 + i);
            store.save_message(&message).await.unwrap();
        }

        let candidates = evaluate_pair(&store, USER, AGENT, now).await.unwrap();
        let nudge = candidates
            .iter()
            .find(|c| c.kind == ProactiveTriggerKind::Inactivity)
            .unwrap();
        // 18/12 overshoot saturates at 0.9, +0.1 stage, +0.1 warm, clamped.
        assert!((nudge.priority - 1.0).abs() < 1e-6);
        assert!(nudge.reason.contains("warm"));
    }

    #[tokio::test]
    async fn test_follow_up_windows() {
        let (store, _dir) = store().await;
        let now = noon();

        let mut past_due = Commitment::new(USER, AGENT, "llamar al médico", 1.0, Some(now - Duration::hours(5)));
        past_due.mentioned_at = now - Duration::hours(6);
        store.add_commitment(&past_due).await.unwrap();

        let mut coming_due = Commitment::new(USER, AGENT, "entregar el informe", 0.0, Some(now + Duration::hours(10)));
        coming_due.mentioned_at = now - Duration::hours(6);
        store.add_commitment(&coming_due).await.unwrap();

        let mut mentioned = Commitment::new(USER, AGENT, "escribir a la abuela", 0.8, None);
        mentioned.mentioned_at = now - Duration::hours(60);
        store.add_commitment(&mentioned).await.unwrap();

        let candidates = evaluate_pair(&store, USER, AGENT, now).await.unwrap();
        assert_eq!(candidates.len(), 3);
        assert!(candidates.iter().all(|c| c.kind == ProactiveTriggerKind::FollowUp));

        // Sorted by priority: past due 1.0, mentioned 0.77, coming due 0.75.
        assert!((candidates[0].priority - 1.0).abs() < 1e-6);
        assert!(candidates[0].reason.contains("past due"));
        assert!((candidates[1].priority - 0.77).abs() < 1e-4);
        assert!((candidates[2].priority - 0.75).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_fresh_low_importance_commitment_stays_quiet() {
        let (store, _dir) = store().await;
        let now = noon();

        // No due time, mentioned yesterday, mild importance.
        let mut commitment = Commitment::new(USER, AGENT, "ordenar el escritorio", 0.4, None);
        commitment.mentioned_at = now - Duration::hours(20);
        store.add_commitment(&commitment).await.unwrap();

        let candidates = evaluate_pair(&store, USER, AGENT, now).await.unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_emotional_checkin_reads_snapshots_in_window() {
        let (store, _dir) = store().await;
        let now = noon();

        let mut sad = ChatMessage::user(AGENT, USER, "fue un día horrible");
        sad.dominant_emotion = Some(Emotion::Sadness);
        sad.dominant_intensity = Some(0.9);
        sad.created_at = now - Duration::hours(48);
        store.save_message(&sad).await.unwrap();

        // Too recent to count; also keeps the inactivity trigger quiet.
        let mut recent = ChatMessage::user(AGENT, USER, "sigo triste");
        recent.dominant_emotion = Some(Emotion::Sadness);
        recent.dominant_intensity = Some(0.4);
        recent.created_at = now - Duration::hours(10);
        store.save_message(&recent).await.unwrap();

        let candidates = evaluate_pair(&store, USER, AGENT, now).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].kind, ProactiveTriggerKind::EmotionalCheckin);
        assert!((candidates[0].priority - 0.88).abs() < 1e-4);
        assert!(candidates[0].reason.contains("sadness"));
    }

    #[tokio::test]
    async fn test_celebration_milestone_and_anniversary() {
        let (store, _dir) = store().await;
        let now = noon();

        for i in 0..10 {
            plant_message(&store, 1 + i, now).await;
        }

        let mut bond = SymbolicBond::new(USER, AGENT, BondTier::BestFriend);
        bond.started_at = now - Duration::days(30);
        store.try_claim_slot(&bond).await.unwrap();

        let candidates = evaluate_pair(&store, USER, AGENT, now).await.unwrap();
        assert_eq!(candidates.len(), 2);
        assert!((candidates[0].priority - 0.8).abs() < 1e-6);
        assert!(candidates[0].reason.contains("anniversary"));
        assert!((candidates[1].priority - 0.75).abs() < 1e-6);
        assert!(candidates[1].reason.contains("10 messages"));
    }

    #[tokio::test]
    async fn test_life_event_priority_curve() {
        let (store, _dir) = store().await;
        let now = noon();

        let soon = LifeEvent {
            id: Uuid::new_v4(),
            user_id: USER.to_string(),
            agent_id: AGENT.to_string(),
            description: "examen de historia".to_string(),
            happens_at: now + Duration::hours(10),
        };
        store.add_life_event(&soon).await.unwrap();

        let far = LifeEvent {
            id: Uuid::new_v4(),
            user_id: USER.to_string(),
            agent_id: AGENT.to_string(),
            description: "mudanza".to_string(),
            happens_at: now + Duration::hours(47),
        };
        store.add_life_event(&far).await.unwrap();

        let candidates = evaluate_pair(&store, USER, AGENT, now).await.unwrap();
        assert_eq!(candidates.len(), 2);
        assert!((candidates[0].priority - 0.7).abs() < 1e-4);
        // 0.8 - 0.47 lands below the floor.
        assert!((candidates[1].priority - 0.6).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_special_date_matches_month_and_day() {
        let (store, _dir) = store().await;
        let now = noon();

        let birthday = SpecialDate {
            id: Uuid::new_v4(),
            user_id: USER.to_string(),
            label: "cumpleaños".to_string(),
            month: 3,
            day: 4,
        };
        store.add_special_date(&birthday).await.unwrap();

        let other = SpecialDate {
            id: Uuid::new_v4(),
            user_id: USER.to_string(),
            label: "aniversario de boda".to_string(),
            month: 7,
            day: 12,
        };
        store.add_special_date(&other).await.unwrap();

        let candidates = evaluate_pair(&store, USER, AGENT, now).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].kind, ProactiveTriggerKind::SpecialDate);
        assert!(candidates[0].reason.contains("cumpleaños"));
    }

    #[tokio::test]
    async fn test_cooldown_silences_the_pair() {
        let (store, _dir) = store().await;
        let now = noon();
        plant_message(&store, 80, now).await;

        let earlier = ProactiveMessage {
            id: Uuid::new_v4(),
            user_id: USER.to_string(),
            agent_id: AGENT.to_string(),
            trigger_kind: ProactiveTriggerKind::Inactivity,
            priority: 0.5,
            reason: "earlier nudge".to_string(),
            created_at: now - Duration::hours(2),
        };
        store.append_proactive_message(&earlier).await.unwrap();

        let candidates = evaluate_pair(&store, USER, AGENT, now).await.unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_config_silences_the_pair() {
        let (store, _dir) = store().await;
        let now = noon();
        plant_message(&store, 80, now).await;

        let mut config = ProactiveConfig::defaults(USER, AGENT);
        config.enabled = false;
        store.upsert_proactive_config(&config).await.unwrap();

        let candidates = evaluate_pair(&store, USER, AGENT, now).await.unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_fire_best_appends_and_respects_daily_cap() {
        let (store, _dir) = store().await;
        let now = noon();
        plant_message(&store, 80, now).await;

        let mut config = fast_config(&store).await;
        config.max_per_day = 1;
        store.upsert_proactive_config(&config).await.unwrap();

        let first = fire_best(&store, USER, AGENT, now).await.unwrap().unwrap();
        assert_eq!(first.trigger_kind, ProactiveTriggerKind::Inactivity);

        // Cooldown is zeroed, so only the cap stands in the way.
        let second = fire_best(&store, USER, AGENT, now + Duration::hours(1))
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_fire_best_holds_during_quiet_hours() {
        let (store, _dir) = store().await;
        let now = noon();
        plant_message(&store, 80, now).await;

        let mut config = ProactiveConfig::defaults(USER, AGENT);
        config.quiet_start = "00:00".to_string();
        config.quiet_end = "23:59".to_string();
        store.upsert_proactive_config(&config).await.unwrap();

        let candidates = evaluate_pair(&store, USER, AGENT, now).await.unwrap();
        assert!(!candidates.is_empty());

        let fired = fire_best(&store, USER, AGENT, now).await.unwrap();
        assert!(fired.is_none());
    }

    #[tokio::test]
    async fn test_follow_up_attempts_run_out() {
        let (store, _dir) = store().await;
        let now = noon();
        fast_config(&store).await;

        let commitment =
            Commitment::new(USER, AGENT, "llamar al médico", 1.0, Some(now - Duration::hours(5)));
        store.add_commitment(&commitment).await.unwrap();

        let first = fire_best(&store, USER, AGENT, now).await.unwrap().unwrap();
        assert_eq!(first.trigger_kind, ProactiveTriggerKind::FollowUp);

        let second = fire_best(&store, USER, AGENT, now + Duration::hours(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.trigger_kind, ProactiveTriggerKind::FollowUp);

        // Two attempts spent; the commitment goes quiet.
        assert!(store.open_commitments(USER, AGENT).await.unwrap().is_empty());
        let third = fire_best(&store, USER, AGENT, now + Duration::hours(2))
            .await
            .unwrap();
        assert!(third.is_none());
    }

    #[tokio::test]
    async fn test_scan_all_covers_the_roster() {
        let (store, _dir) = store().await;
        let now = noon();

        plant_message(&store, 80, now).await;

        let mut other = ChatMessage::user(AGENT, "user-2", "hola");
        other.created_at = now - Duration::hours(2);
        store.save_message(&other).await.unwrap();

        let summary = scan_all(&store, now).await.unwrap();
        assert_eq!(summary.pairs, 2);
        assert_eq!(summary.fired, 1);
    }
}
