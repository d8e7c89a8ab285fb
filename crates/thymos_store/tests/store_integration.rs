//! Integration tests for SqliteStore
//!
//! Uses tempfile::TempDir for isolated SQLite databases.

use chrono::{DateTime, Duration, Utc};
use thymos_core::{
    BehaviorProfile, BehaviorType, BondLegacy, BondQueueEntry, BondTier, ChatMessage, Commitment,
    MessageAuthor, PhaseHistoryEntry, PlutchikState, ProactiveConfig, ProactiveMessage,
    ProactiveTriggerKind, SymbolicBond, TriggerEvent, TriggerType,
};
use thymos_store::{SlotClaim, SqliteStore};
use uuid::Uuid;

async fn open_store(dir: &tempfile::TempDir) -> SqliteStore {
    let db_path = dir.path().join("test.db");
    SqliteStore::new(&db_path).await.unwrap()
}

fn event_for(profile: &BehaviorProfile, trigger_type: TriggerType, at: DateTime<Utc>) -> TriggerEvent {
    TriggerEvent {
        id: Uuid::new_v4(),
        profile_id: profile.id,
        agent_id: profile.agent_id.clone(),
        message_id: None,
        trigger_type,
        behavior_type: profile.behavior_type,
        weight: 0.7,
        confidence: 0.8,
        detected_text: "don't leave me".into(),
        created_at: at,
    }
}

/// Test 1: Profile upsert round-trip including phase history JSON
#[tokio::test]
async fn test_profile_roundtrip() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let mut profile = BehaviorProfile::new("agent-1", BehaviorType::YandereObsessive);
    profile.phase_history.push(PhaseHistoryEntry {
        phase: 1,
        entered_at: Utc::now() - Duration::days(2),
        exited_at: Some(Utc::now() - Duration::days(1)),
        trigger_count: 4,
        final_intensity: 0.55,
    });
    store.save_profile(&profile).await.unwrap();

    let loaded = store
        .get_profile("agent-1", BehaviorType::YandereObsessive)
        .await
        .unwrap()
        .expect("profile should exist");
    assert_eq!(loaded.id, profile.id);
    assert_eq!(loaded.behavior_type, BehaviorType::YandereObsessive);
    assert!((loaded.current_intensity - 0.20).abs() < 0.001);
    assert_eq!(loaded.phase_history.len(), 1);
    assert_eq!(loaded.phase_history[0].trigger_count, 4);

    // Upsert: bump intensity and phase, save again to the same row
    profile.current_intensity = 0.81;
    profile.current_phase = 3;
    store.save_profile(&profile).await.unwrap();

    let all = store.profiles_for_agent("agent-1").await.unwrap();
    assert_eq!(all.len(), 1, "upsert must not duplicate the row");
    assert!((all[0].current_intensity - 0.81).abs() < 0.001);
    assert_eq!(all[0].current_phase, 3);
}

/// Test 2: Active-profile filter honors the is_active toggle
#[tokio::test]
async fn test_active_profiles_filter() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let anxious = BehaviorProfile::new("agent-1", BehaviorType::AnxiousAttachment);
    let mut avoidant = BehaviorProfile::new("agent-1", BehaviorType::AvoidantAttachment);
    avoidant.is_active = false;
    store.save_profile(&anxious).await.unwrap();
    store.save_profile(&avoidant).await.unwrap();

    let active = store.active_profiles("agent-1").await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].behavior_type, BehaviorType::AnxiousAttachment);

    let all = store.profiles_for_agent("agent-1").await.unwrap();
    assert_eq!(all.len(), 2);
}

/// Test 3: Trigger log ordering and windowed counting
#[tokio::test]
async fn test_trigger_events_history_and_count() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let profile = BehaviorProfile::new("agent-1", BehaviorType::AnxiousAttachment);
    store.save_profile(&profile).await.unwrap();

    let now = Utc::now();
    let old = event_for(&profile, TriggerType::AbandonmentSignal, now - Duration::hours(30));
    let recent = event_for(&profile, TriggerType::AbandonmentSignal, now - Duration::hours(2));
    let other = event_for(&profile, TriggerType::Criticism, now - Duration::hours(1));
    store.append_trigger_event(&old).await.unwrap();
    store.append_trigger_event(&recent).await.unwrap();
    store.append_trigger_event(&other).await.unwrap();

    // Newest first
    let history = store
        .behavior_history("agent-1", BehaviorType::AnxiousAttachment, 10, 0)
        .await
        .unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].trigger_type, TriggerType::Criticism);
    assert_eq!(history[2].id, old.id);

    // Offset pagination
    let page = store
        .behavior_history("agent-1", BehaviorType::AnxiousAttachment, 1, 1)
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, recent.id);

    // Only the recent abandonment signal falls inside the window
    let count = store
        .count_triggers_since(profile.id, TriggerType::AbandonmentSignal, now - Duration::hours(12))
        .await
        .unwrap();
    assert_eq!(count, 1);
}

/// Test 4: Emotional state survives a restart (write → reopen → read)
#[tokio::test]
async fn test_emotional_state_persistence_roundtrip() {
    let dir = tempfile::TempDir::new().unwrap();
    let db_path = dir.path().join("test.db");

    // Phase 1: write a non-neutral state
    {
        let store = SqliteStore::new(&db_path).await.unwrap();
        let mut state = PlutchikState::neutral();
        state.joy = 0.9;
        state.sadness = 0.05;
        let mood = thymos_core::PadMood::from_plutchik(&state);
        store.save_emotional_state("agent-1", &state, &mood).await.unwrap();
    }

    // Phase 2: reopen and verify
    {
        let store = SqliteStore::new(&db_path).await.unwrap();
        let (state, mood) = store
            .load_emotional_state("agent-1")
            .await
            .unwrap()
            .expect("state should survive restart");
        assert!((state.joy - 0.9).abs() < 0.001);
        assert!(mood.valence > 0.0, "joyful state should project positive valence");
        assert!(store.load_emotional_state("agent-2").await.unwrap().is_none());
    }
}

/// Test 5: Message log ordering and author-scoped last-seen
#[tokio::test]
async fn test_messages_and_last_user_message() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let now = Utc::now();
    let mut first = ChatMessage::user("agent-1", "user-1", "hola");
    first.created_at = now - Duration::hours(3);
    let mut reply = ChatMessage::user("agent-1", "user-1", "aquí estoy");
    reply.author = MessageAuthor::Agent;
    reply.created_at = now - Duration::hours(1);
    store.save_message(&first).await.unwrap();
    store.save_message(&reply).await.unwrap();

    let recent = store.recent_messages("agent-1", "user-1", 10).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].author, MessageAuthor::Agent, "newest first");

    assert_eq!(store.count_messages("agent-1", "user-1").await.unwrap(), 2);
    assert_eq!(store.count_messages("agent-1", "user-2").await.unwrap(), 0);

    // The agent reply must not advance the user's last-seen time
    let last_user = store
        .last_user_message_at("agent-1", "user-1")
        .await
        .unwrap()
        .expect("user message exists");
    assert_eq!(last_user.timestamp(), first.created_at.timestamp());
}

/// Test 6: Dominant-emotion snapshot columns round-trip
#[tokio::test]
async fn test_message_snapshot_columns() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let mut message = ChatMessage::user("agent-1", "user-1", "qué día tan bueno");
    message.joy = Some(0.8);
    message.trust = Some(0.6);
    message.dominant_emotion = Some(thymos_core::Emotion::Joy);
    message.dominant_intensity = Some(0.8);
    store.save_message(&message).await.unwrap();

    let loaded = &store.recent_messages("agent-1", "user-1", 1).await.unwrap()[0];
    assert_eq!(loaded.dominant_emotion, Some(thymos_core::Emotion::Joy));
    assert!((loaded.joy.unwrap() - 0.8).abs() < 0.001);
    assert!(loaded.is_positive());
}

/// Test 7: Slot claiming is atomic and per-(agent, tier)
#[tokio::test]
async fn test_slot_claiming() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = open_store(&dir).await;

    // Romantic has a single slot per agent
    let first = SymbolicBond::new("user-1", "agent-1", BondTier::Romantic);
    assert_eq!(store.try_claim_slot(&first).await.unwrap(), SlotClaim::Created);

    let second = SymbolicBond::new("user-2", "agent-1", BondTier::Romantic);
    assert_eq!(store.try_claim_slot(&second).await.unwrap(), SlotClaim::TierFull);
    assert!(store.get_bond(second.id).await.unwrap().is_none());

    // A different agent has its own slot
    let elsewhere = SymbolicBond::new("user-2", "agent-2", BondTier::Romantic);
    assert_eq!(store.try_claim_slot(&elsewhere).await.unwrap(), SlotClaim::Created);

    // Unlimited tier never fills
    for i in 0..5 {
        let bond = SymbolicBond::new(format!("user-{i}"), "agent-1", BondTier::Acquaintance);
        assert_eq!(store.try_claim_slot(&bond).await.unwrap(), SlotClaim::Created);
    }

    assert_eq!(store.find_bond("user-1", "agent-1").await.unwrap().unwrap().id, first.id);
    assert_eq!(store.bonds_for_user("user-2").await.unwrap().len(), 2);
}

/// Test 8: Release archives the legacy and frees the slot in one step
#[tokio::test]
async fn test_release_archives_and_frees_slot() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let mut bond = SymbolicBond::new("user-1", "agent-1", BondTier::Romantic);
    bond.affinity = 85.0;
    bond.total_interactions = 120;
    assert_eq!(store.try_claim_slot(&bond).await.unwrap(), SlotClaim::Created);

    let legacy = BondLegacy::from_bond(&bond, Utc::now());
    store.archive_and_delete_bond(bond.id, &legacy).await.unwrap();

    assert!(store.get_bond(bond.id).await.unwrap().is_none());
    let legacies = store.legacies_for_user("user-1").await.unwrap();
    assert_eq!(legacies.len(), 1);
    assert_eq!(legacies[0].bond_id, bond.id);
    assert!((legacies[0].affinity - 85.0).abs() < 0.001);

    // Slot is free again
    let next = SymbolicBond::new("user-2", "agent-1", BondTier::Romantic);
    assert_eq!(store.try_claim_slot(&next).await.unwrap(), SlotClaim::Created);
}

/// Test 9: Decay scan working set filters by last interaction
#[tokio::test]
async fn test_bonds_inactive_since() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let now = Utc::now();
    let mut stale = SymbolicBond::new("user-1", "agent-1", BondTier::Mentor);
    stale.last_interaction_at = now - Duration::days(45);
    let mut fresh = SymbolicBond::new("user-2", "agent-1", BondTier::Mentor);
    fresh.last_interaction_at = now - Duration::days(2);
    store.try_claim_slot(&stale).await.unwrap();
    store.try_claim_slot(&fresh).await.unwrap();

    let inactive = store.bonds_inactive_since(now - Duration::days(30)).await.unwrap();
    assert_eq!(inactive.len(), 1);
    assert_eq!(inactive[0].id, stale.id);
}

/// Test 10: Queue candidate ordering and offer expiry
#[tokio::test]
async fn test_queue_ordering_and_expiry() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let base = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    let mut low = BondQueueEntry::new("user-1", "agent-1", BondTier::Romantic, 0.5);
    low.joined_at = base;
    let mut high_late = BondQueueEntry::new("user-2", "agent-1", BondTier::Romantic, 0.9);
    high_late.joined_at = base + Duration::hours(2);
    let mut high_early = BondQueueEntry::new("user-3", "agent-1", BondTier::Romantic, 0.9);
    high_early.joined_at = base + Duration::hours(1);
    store.join_queue(&low).await.unwrap();
    store.join_queue(&high_late).await.unwrap();
    store.join_queue(&high_early).await.unwrap();

    // Highest eligibility wins; earliest join breaks the tie
    let candidate = store
        .next_queue_candidate("agent-1", BondTier::Romantic)
        .await
        .unwrap()
        .expect("candidate should exist");
    assert_eq!(candidate.id, high_early.id);

    // Offer it a slot with an already-lapsed deadline
    store
        .mark_queue_offered(candidate.id, Utc::now() - Duration::hours(1))
        .await
        .unwrap();
    let next = store
        .next_queue_candidate("agent-1", BondTier::Romantic)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(next.id, high_late.id, "offered entry leaves the waiting pool");

    let lapsed = store.expire_stale_offers(Utc::now()).await.unwrap();
    assert_eq!(lapsed.len(), 1);
    assert_eq!(lapsed[0].id, high_early.id);

    // Second sweep finds nothing: the entry is now marked expired
    assert!(store.expire_stale_offers(Utc::now()).await.unwrap().is_empty());

    // Claiming removes the winner from the queue entirely
    store.delete_queue_entry(high_late.id).await.unwrap();
    let remaining = store
        .next_queue_candidate("agent-1", BondTier::Romantic)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(remaining.id, low.id);
}

/// Test 11: Proactive config upsert and send-log counters
#[tokio::test]
async fn test_proactive_config_and_log() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = open_store(&dir).await;

    assert!(store.get_proactive_config("user-1", "agent-1").await.unwrap().is_none());

    let mut config = ProactiveConfig::defaults("user-1", "agent-1");
    config.quiet_start = "22:30".into();
    config.max_per_day = 5;
    store.upsert_proactive_config(&config).await.unwrap();

    let loaded = store
        .get_proactive_config("user-1", "agent-1")
        .await
        .unwrap()
        .expect("config should exist");
    assert_eq!(loaded.quiet_start, "22:30");
    assert_eq!(loaded.max_per_day, 5);
    assert_eq!(loaded.active_days.len(), 7);

    config.enabled = false;
    store.upsert_proactive_config(&config).await.unwrap();
    let reloaded = store.get_proactive_config("user-1", "agent-1").await.unwrap().unwrap();
    assert!(!reloaded.enabled, "upsert should overwrite in place");

    // Send log drives cooldown and the daily cap
    assert!(store.last_proactive_at("user-1", "agent-1").await.unwrap().is_none());
    let now = Utc::now();
    for hours_ago in [30, 5] {
        let message = ProactiveMessage {
            id: Uuid::new_v4(),
            user_id: "user-1".into(),
            agent_id: "agent-1".into(),
            trigger_kind: ProactiveTriggerKind::Inactivity,
            priority: 0.7,
            reason: "no messages for a while".into(),
            created_at: now - Duration::hours(hours_ago),
        };
        store.append_proactive_message(&message).await.unwrap();
    }

    let last = store.last_proactive_at("user-1", "agent-1").await.unwrap().unwrap();
    assert_eq!(last.timestamp(), (now - Duration::hours(5)).timestamp());
    let today = store
        .count_proactive_since("user-1", "agent-1", now - Duration::hours(24))
        .await
        .unwrap();
    assert_eq!(today, 1);

    let log = store.recent_proactive_messages("user-1", "agent-1", 10).await.unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].trigger_kind, ProactiveTriggerKind::Inactivity);
}

/// Test 12: Commitment follow-up lifecycle
#[tokio::test]
async fn test_commitment_lifecycle() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let interview = Commitment::new("user-1", "agent-1", "job interview on Friday", 0.9, None);
    store.add_commitment(&interview).await.unwrap();

    let open = store.open_commitments("user-1", "agent-1").await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].description, "job interview on Friday");

    // Two follow-up attempts exhaust the commitment
    store.bump_commitment_attempt(interview.id).await.unwrap();
    assert_eq!(store.open_commitments("user-1", "agent-1").await.unwrap().len(), 1);
    store.bump_commitment_attempt(interview.id).await.unwrap();
    assert!(store.open_commitments("user-1", "agent-1").await.unwrap().is_empty());

    // Completion also closes it
    let dentist = Commitment::new("user-1", "agent-1", "dentist appointment", 0.5, None);
    store.add_commitment(&dentist).await.unwrap();
    store.complete_commitment(dentist.id).await.unwrap();
    assert!(store.open_commitments("user-1", "agent-1").await.unwrap().is_empty());
}

/// Test 13: active_pairs unions message and bond pairs without duplicates
#[tokio::test]
async fn test_active_pairs_union() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = open_store(&dir).await;

    store
        .save_message(&ChatMessage::user("agent-1", "user-1", "hey"))
        .await
        .unwrap();
    store
        .save_message(&ChatMessage::user("agent-1", "user-1", "you there?"))
        .await
        .unwrap();
    store
        .try_claim_slot(&SymbolicBond::new("user-1", "agent-1", BondTier::Acquaintance))
        .await
        .unwrap();
    store
        .try_claim_slot(&SymbolicBond::new("user-2", "agent-1", BondTier::Acquaintance))
        .await
        .unwrap();

    let mut pairs = store.active_pairs().await.unwrap();
    pairs.sort();
    assert_eq!(
        pairs,
        vec![
            ("user-1".to_string(), "agent-1".to_string()),
            ("user-2".to_string(), "agent-1".to_string()),
        ]
    );
}
