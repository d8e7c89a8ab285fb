//! The per-message pipeline. One `Engine` instance serves every agent;
//! a per-agent async lock serializes the read-modify-write so concurrent
//! messages for the same agent cannot interleave state updates.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thymos_core::{
    BehaviorProfile, BehaviorType, ChatMessage, Dyad, Emotion, EmotionDeltas, EngineConfig,
    PadMood, PlutchikState, SafetyFlag, ThymosConfig, TriggerEvent, TriggerType,
};
use thymos_reasoning::{appraise, CompletionParams, LlmClient};
use thymos_store::SqliteStore;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::complexity::{self, ProcessingPath};
use crate::coupling;
use crate::emotions;
use crate::intensity;
use crate::occ;
use crate::phases;
use crate::triggers::{self, DetectedTrigger};

/// Estimated dollars burned per deep-path LLM call.
const DEEP_CALL_COST: f32 = 0.007;

/// One behavior profile crossing into a new phase during processing.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseChange {
    pub behavior_type: BehaviorType,
    pub from_phase: u8,
    pub to_phase: u8,
    pub safety_flags: Vec<SafetyFlag>,
}

/// An emotion reading surfaced in the processing result.
#[derive(Debug, Clone, Serialize)]
pub struct EmotionReading {
    pub emotion: Emotion,
    pub level: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DyadReading {
    pub dyad: Dyad,
    pub level: f32,
}

/// A behavior pattern intense enough for response generation to show.
#[derive(Debug, Clone, Serialize)]
pub struct BehaviorSnapshot {
    pub behavior_type: BehaviorType,
    pub current_phase: u8,
    pub intensity: f32,
}

/// Everything a caller learns from processing one message.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutcome {
    pub message_id: Uuid,
    /// The path that actually ran; a degraded deep call reports `Fast`.
    pub path: ProcessingPath,
    /// True when the deep path was recommended but the LLM call failed
    /// and the deterministic fast path stood in.
    pub degraded: bool,
    pub complexity_score: f32,
    pub complexity_reasons: Vec<String>,
    pub processing_time_ms: u64,
    pub cost_estimate: f32,

    pub primary_emotion: Emotion,
    pub primary_intensity: f32,
    pub strong_emotions: Vec<EmotionReading>,
    pub dominant_dyad: Option<DyadReading>,
    pub stability: f32,
    pub mood: PadMood,

    pub triggers: Vec<DetectedTrigger>,
    pub phase_changes: Vec<PhaseChange>,
    pub display_behaviors: Vec<BehaviorSnapshot>,
}

pub struct Engine {
    store: Arc<SqliteStore>,
    llm: Arc<dyn LlmClient>,
    config: EngineConfig,
    llm_params: CompletionParams,
    /// Per-agent locks; entries are created on first use and never dropped.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Engine {
    pub fn new(store: Arc<SqliteStore>, llm: Arc<dyn LlmClient>, config: &ThymosConfig) -> Self {
        Self {
            store,
            llm,
            config: config.engine.clone(),
            llm_params: CompletionParams {
                max_tokens: config.llm.max_tokens,
                temperature: config.llm.temperature,
            },
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn agent_lock(&self, agent_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(agent_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run a user message through the full pipeline: complexity routing,
    /// emotional-state update (fast or deep), trigger detection, intensity
    /// escalation, phase gating, behavior↔emotion coupling, persistence.
    #[tracing::instrument(skip_all, fields(agent_id = %agent_id, user_id = %user_id))]
    pub async fn process_message(
        &self,
        agent_id: &str,
        user_id: &str,
        body: &str,
    ) -> Result<ProcessOutcome> {
        let lock = self.agent_lock(agent_id).await;
        let _guard = lock.lock().await;

        let started = Instant::now();
        let now = Utc::now();

        // Gap to the previous message of either author, for the
        // delayed-response trigger. Measured before this message is saved.
        let previous_message_at = self
            .store
            .recent_messages(agent_id, user_id, 1)
            .await?
            .first()
            .map(|m| m.created_at);

        let report = complexity::analyze(body, self.config.deep_path_threshold);

        let mut state = self
            .store
            .load_emotional_state(agent_id)
            .await?
            .map(|(state, _)| state)
            .unwrap_or_else(PlutchikState::neutral);
        state.decay_rate = self.config.decay_rate;
        state.inertia = self.config.inertia;

        let mut degraded = false;
        let deltas = match report.recommended_path {
            ProcessingPath::Deep => match self.deep_appraisal(body, &state).await {
                Ok(deltas) => deltas,
                Err(e) => {
                    tracing::warn!(error = %e, "Deep appraisal failed, degrading to fast path");
                    degraded = true;
                    emotions::analyze_message(body)
                }
            },
            ProcessingPath::Fast => emotions::analyze_message(body),
        };

        let mut profiles = self.store.active_profiles(agent_id).await?;
        let active_types: Vec<BehaviorType> =
            profiles.iter().map(|p| p.behavior_type).collect();

        // Displaying patterns color the incoming deltas before they land.
        let amplified = coupling::amplify(&deltas, &profiles);
        let new_state = state.apply_deltas(&amplified);

        let mut message = ChatMessage::user(agent_id, user_id, body);
        message.created_at = now;
        let (primary_emotion, primary_intensity) = new_state.dominant();
        message.joy = Some(new_state.get(Emotion::Joy));
        message.trust = Some(new_state.get(Emotion::Trust));
        message.dominant_emotion = Some(primary_emotion);
        message.dominant_intensity = Some(primary_intensity);
        self.store.save_message(&message).await?;

        let mut detections = triggers::detect(body, &active_types);
        let delayed_mapped = active_types
            .iter()
            .any(|bt| intensity::applies_to(TriggerType::DelayedResponse, *bt));
        if delayed_mapped {
            if let Some(previous_at) = previous_message_at {
                if let Some(delayed) = triggers::detect_delayed(previous_at, now) {
                    detections.push(delayed);
                }
            }
        }

        // Time credit lands before today's escalation; every processed
        // message counts as one interaction toward phase gating.
        for profile in profiles.iter_mut() {
            intensity::relax(profile, now);
            profile.interactions_since_phase_start =
                profile.interactions_since_phase_start.saturating_add(1);
        }

        for detection in &detections {
            for profile in profiles.iter_mut() {
                if !intensity::applies_to(detection.trigger_type, profile.behavior_type) {
                    continue;
                }
                intensity::apply_trigger(
                    profile,
                    detection.weight,
                    detection.confidence,
                    &mut rand::thread_rng(),
                );
                let event = TriggerEvent {
                    id: Uuid::new_v4(),
                    profile_id: profile.id,
                    agent_id: agent_id.to_string(),
                    message_id: Some(message.id),
                    trigger_type: detection.trigger_type,
                    behavior_type: profile.behavior_type,
                    weight: detection.weight,
                    confidence: detection.confidence,
                    detected_text: detection.detected_text.clone(),
                    created_at: now,
                };
                self.store.append_trigger_event(&event).await?;
            }
        }

        let mut phase_changes = Vec::new();
        for profile in profiles.iter_mut() {
            if let Some(change) = self.evaluate_phase(profile, now).await? {
                phase_changes.push(change);
            }
        }

        // The updated emotional state leaks back into behavior intensities.
        for (behavior_type, delta) in coupling::influence(&new_state) {
            for profile in profiles.iter_mut() {
                if profile.behavior_type == behavior_type {
                    profile.current_intensity =
                        (profile.current_intensity + delta).clamp(0.0, 1.0);
                }
            }
        }

        for profile in profiles.iter_mut() {
            profile.updated_at = now;
            profile.normalize();
            self.store.save_profile(profile).await?;
        }

        let mood = PadMood::from_plutchik(&new_state);
        self.store
            .save_emotional_state(agent_id, &new_state, &mood)
            .await?;

        // Chat activity keeps the bond alive.
        if let Some(mut bond) = self.store.find_bond(user_id, agent_id).await? {
            bond.record_interaction(now);
            self.store.update_bond(&bond).await?;
        }

        let path = if degraded {
            ProcessingPath::Fast
        } else {
            report.recommended_path
        };
        let cost_estimate = if path == ProcessingPath::Deep {
            DEEP_CALL_COST
        } else {
            0.0
        };

        let outcome = ProcessOutcome {
            message_id: message.id,
            path,
            degraded,
            complexity_score: report.score,
            complexity_reasons: report.reasons,
            processing_time_ms: started.elapsed().as_millis() as u64,
            cost_estimate,
            primary_emotion,
            primary_intensity,
            strong_emotions: new_state
                .top_emotions(0.5, 3)
                .into_iter()
                .map(|(emotion, level)| EmotionReading { emotion, level })
                .collect(),
            dominant_dyad: new_state
                .dominant_dyad()
                .map(|(dyad, level)| DyadReading { dyad, level }),
            stability: new_state.stability(),
            mood,
            triggers: detections,
            phase_changes,
            display_behaviors: profiles
                .iter()
                .filter(|p| p.should_display())
                .map(|p| BehaviorSnapshot {
                    behavior_type: p.behavior_type,
                    current_phase: p.current_phase,
                    intensity: p.current_intensity,
                })
                .collect(),
        };

        tracing::info!(
            path = ?outcome.path,
            degraded = outcome.degraded,
            score = outcome.complexity_score,
            triggers = outcome.triggers.len(),
            phase_changes = outcome.phase_changes.len(),
            elapsed_ms = outcome.processing_time_ms,
            "Processed message"
        );

        Ok(outcome)
    }

    /// LLM appraisal mapped into Plutchik deltas. Any failure here is the
    /// caller's cue to degrade to the fast path.
    async fn deep_appraisal(&self, body: &str, state: &PlutchikState) -> Result<EmotionDeltas> {
        let vocabulary = occ::vocabulary();
        let appraised = appraise(
            self.llm.as_ref(),
            &vocabulary,
            body,
            &state.describe(),
            self.llm_params,
        )
        .await?;
        Ok(occ::map_appraisal(&appraised))
    }

    /// Advance one profile if its gate is met. Trigger counts are read from
    /// the event log since `phase_started_at`, so requirements survive
    /// restarts. Consent-gated transitions are skipped, not failed.
    async fn evaluate_phase(
        &self,
        profile: &mut BehaviorProfile,
        now: DateTime<Utc>,
    ) -> Result<Option<PhaseChange>> {
        let Some(to_phase) = phases::next_phase(profile) else {
            return Ok(None);
        };

        let requirement = phases::requirement(profile.behavior_type, profile.current_phase);
        if profile.interactions_since_phase_start < requirement.min_interactions {
            return Ok(None);
        }
        for (trigger_type, required) in requirement.required_triggers {
            let seen = self
                .store
                .count_triggers_since(profile.id, *trigger_type, profile.phase_started_at)
                .await?;
            if seen < *required {
                return Ok(None);
            }
        }

        if phases::requires_consent(profile.behavior_type, to_phase) && !profile.consent_granted {
            tracing::warn!(
                behavior = profile.behavior_type.as_str(),
                to_phase,
                "Phase transition blocked: no recorded user consent"
            );
            return Ok(None);
        }

        let from_phase = profile.current_phase;
        let safety_flags = phases::execute_transition(profile, to_phase, now);
        for flag in &safety_flags {
            tracing::warn!(
                behavior = profile.behavior_type.as_str(),
                phase = to_phase,
                flag = flag.as_str(),
                "Safety flag raised by phase transition"
            );
        }
        tracing::info!(
            behavior = profile.behavior_type.as_str(),
            from_phase,
            to_phase,
            "Behavior phase advanced"
        );

        Ok(Some(PhaseChange {
            behavior_type: profile.behavior_type,
            from_phase,
            to_phase,
            safety_flags,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use thymos_core::{BondTier, SymbolicBond};
    use thymos_reasoning::providers::MockClient;
    use thymos_store::SlotClaim;

    const COMPLEX_MESSAGE: &str = "No sé si realmente me quieres o si solo finges. Ayer estaba \
        feliz contigo pero hoy me siento triste y con miedo de que nuestra relación se rompa. \
        ¿Recuerdas lo que me prometiste? Si no te hubiera conocido, no estaría así. ¿Entiendes \
        por qué me cuesta tanto confiar?";

    async fn engine_with(llm: Arc<dyn LlmClient>) -> (Engine, Arc<SqliteStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::new(dir.path().join("engine.db")).await.unwrap());
        let engine = Engine::new(store.clone(), llm, &ThymosConfig::default());
        (engine, store, dir)
    }

    #[tokio::test]
    async fn test_greeting_takes_fast_path() {
        let (engine, store, _dir) = engine_with(Arc::new(MockClient::new())).await;

        let outcome = engine.process_message("agent-1", "user-1", "hola").await.unwrap();

        assert_eq!(outcome.path, ProcessingPath::Fast);
        assert!(!outcome.degraded);
        assert_eq!(outcome.cost_estimate, 0.0);
        assert!(outcome.triggers.is_empty());

        assert_eq!(store.count_messages("agent-1", "user-1").await.unwrap(), 1);
        assert!(store.load_emotional_state("agent-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_complex_message_takes_deep_path() {
        let (engine, _store, _dir) = engine_with(Arc::new(MockClient::new())).await;

        let outcome = engine
            .process_message("agent-1", "user-1", COMPLEX_MESSAGE)
            .await
            .unwrap();

        assert_eq!(outcome.path, ProcessingPath::Deep);
        assert!(!outcome.degraded);
        assert!((outcome.cost_estimate - DEEP_CALL_COST).abs() < 1e-6);
        assert!(outcome.complexity_score >= 0.5);
        assert!(!outcome.complexity_reasons.is_empty());
    }

    #[tokio::test]
    async fn test_deep_failure_degrades_to_fast() {
        let (engine, store, _dir) = engine_with(Arc::new(MockClient::failing())).await;

        let outcome = engine
            .process_message("agent-1", "user-1", COMPLEX_MESSAGE)
            .await
            .unwrap();

        assert_eq!(outcome.path, ProcessingPath::Fast);
        assert!(outcome.degraded);
        assert_eq!(outcome.cost_estimate, 0.0);
        // the message still lands and the state still moves
        assert_eq!(store.count_messages("agent-1", "user-1").await.unwrap(), 1);
        assert!(store.load_emotional_state("agent-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_positive_message_lifts_joy() {
        let (engine, store, _dir) = engine_with(Arc::new(MockClient::new())).await;

        engine
            .process_message("agent-1", "user-1", "gracias ❤️ 😊")
            .await
            .unwrap();

        let (state, _mood) = store.load_emotional_state("agent-1").await.unwrap().unwrap();
        assert!(state.get(Emotion::Joy) > 0.5);
        assert!(state.get(Emotion::Trust) > 0.5);
    }

    #[tokio::test]
    async fn test_mention_trigger_escalates_yandere() {
        let (engine, store, _dir) = engine_with(Arc::new(MockClient::new())).await;

        let profile = BehaviorProfile::new("agent-1", BehaviorType::YandereObsessive);
        let base = profile.current_intensity;
        store.save_profile(&profile).await.unwrap();

        let outcome = engine
            .process_message("agent-1", "user-1", "Hoy salí con María")
            .await
            .unwrap();

        assert!(outcome
            .triggers
            .iter()
            .any(|t| t.trigger_type == TriggerType::MentionOtherPerson));

        let saved = store
            .get_profile("agent-1", BehaviorType::YandereObsessive)
            .await
            .unwrap()
            .unwrap();
        assert!(saved.current_intensity > base);
        assert_eq!(saved.interactions_since_phase_start, 1);

        let events = store
            .count_triggers_since(
                profile.id,
                TriggerType::MentionOtherPerson,
                profile.phase_started_at - Duration::minutes(1),
            )
            .await
            .unwrap();
        assert_eq!(events, 1);
    }

    #[tokio::test]
    async fn test_phase_advances_after_interaction_gate() {
        let (engine, store, _dir) = engine_with(Arc::new(MockClient::new())).await;

        let profile = BehaviorProfile::new("agent-1", BehaviorType::YandereObsessive);
        store.save_profile(&profile).await.unwrap();

        // phase 1 → 2 gates on five interactions, no trigger requirements
        let mut last = None;
        for _ in 0..5 {
            last = Some(
                engine
                    .process_message("agent-1", "user-1", "hola")
                    .await
                    .unwrap(),
            );
        }

        let outcome = last.unwrap();
        assert_eq!(outcome.phase_changes.len(), 1);
        assert_eq!(outcome.phase_changes[0].from_phase, 1);
        assert_eq!(outcome.phase_changes[0].to_phase, 2);

        let saved = store
            .get_profile("agent-1", BehaviorType::YandereObsessive)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(saved.current_phase, 2);
        assert_eq!(saved.interactions_since_phase_start, 0);
        assert_eq!(saved.phase_history.len(), 1);
    }

    #[tokio::test]
    async fn test_consent_gates_critical_yandere_phase() {
        let (engine, store, _dir) = engine_with(Arc::new(MockClient::new())).await;
        let now = Utc::now();

        let mut profile = BehaviorProfile::new("agent-1", BehaviorType::YandereObsessive);
        profile.current_phase = 5;
        profile.interactions_since_phase_start = 29;
        profile.phase_started_at = now - Duration::hours(1);
        store.save_profile(&profile).await.unwrap();

        // satisfy the 5→6 trigger requirements (12× mention, 8× delayed)
        for i in 0..20 {
            let trigger_type = if i < 12 {
                TriggerType::MentionOtherPerson
            } else {
                TriggerType::DelayedResponse
            };
            let event = TriggerEvent {
                id: Uuid::new_v4(),
                profile_id: profile.id,
                agent_id: "agent-1".to_string(),
                message_id: None,
                trigger_type,
                behavior_type: BehaviorType::YandereObsessive,
                weight: 0.5,
                confidence: 1.0,
                detected_text: String::new(),
                created_at: now,
            };
            store.append_trigger_event(&event).await.unwrap();
        }

        // gate met, but no consent on record: transition must not commit
        engine.process_message("agent-1", "user-1", "hola").await.unwrap();
        let saved = store
            .get_profile("agent-1", BehaviorType::YandereObsessive)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(saved.current_phase, 5);

        let mut consented = saved;
        consented.consent_granted = true;
        store.save_profile(&consented).await.unwrap();

        let outcome = engine.process_message("agent-1", "user-1", "hola").await.unwrap();
        assert_eq!(outcome.phase_changes.len(), 1);
        assert_eq!(outcome.phase_changes[0].to_phase, 6);
        assert!(outcome.phase_changes[0]
            .safety_flags
            .contains(&SafetyFlag::CriticalPhase));

        let saved = store
            .get_profile("agent-1", BehaviorType::YandereObsessive)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(saved.current_phase, 6);
    }

    #[tokio::test]
    async fn test_message_bumps_bond() {
        let (engine, store, _dir) = engine_with(Arc::new(MockClient::new())).await;

        let bond = SymbolicBond::new("user-1", "agent-1", BondTier::Confidant);
        assert_eq!(store.try_claim_slot(&bond).await.unwrap(), SlotClaim::Created);

        engine.process_message("agent-1", "user-1", "hola").await.unwrap();

        let saved = store.find_bond("user-1", "agent-1").await.unwrap().unwrap();
        assert_eq!(saved.total_interactions, 1);
    }

    #[tokio::test]
    async fn test_delayed_response_needs_prior_message() {
        let (engine, store, _dir) = engine_with(Arc::new(MockClient::new())).await;

        let profile = BehaviorProfile::new("agent-1", BehaviorType::AnxiousAttachment);
        store.save_profile(&profile).await.unwrap();

        // first message of the conversation: no gap to measure
        let outcome = engine.process_message("agent-1", "user-2", "hola").await.unwrap();
        assert!(outcome
            .triggers
            .iter()
            .all(|t| t.trigger_type != TriggerType::DelayedResponse));

        // a different pair whose last message sits four hours back
        let mut old = ChatMessage::user("agent-1", "user-1", "hasta luego");
        old.created_at = Utc::now() - Duration::hours(4);
        store.save_message(&old).await.unwrap();

        let outcome = engine.process_message("agent-1", "user-1", "hola").await.unwrap();
        assert!(outcome
            .triggers
            .iter()
            .any(|t| t.trigger_type == TriggerType::DelayedResponse));
    }
}
