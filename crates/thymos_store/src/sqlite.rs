use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use std::path::Path;
use thymos_core::{
    BehaviorProfile, BehaviorType, BondLegacy, BondNotification, BondQueueEntry, BondStatus,
    BondTier, ChatMessage, Commitment, DecayPhase, Emotion, LifeEvent, MessageAuthor,
    NotificationKind, PadMood, PlutchikState, ProactiveConfig, ProactiveMessage,
    ProactiveTriggerKind, QueueStatus, RarityTier, SpecialDate, SymbolicBond, TriggerEvent,
    TriggerType,
};
use uuid::Uuid;

/// Outcome of trying to occupy a tier slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotClaim {
    Created,
    TierFull,
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_url = format!("sqlite://{}?mode=rwc", db_path.as_ref().display());
        let pool = SqlitePoolOptions::new()
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON").execute(conn).await?;
                    Ok(())
                })
            })
            .connect(&db_url)
            .await
            .context("Failed to connect to SQLite database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS behavior_profiles (
                id TEXT PRIMARY KEY,
                agent_id TEXT NOT NULL,
                behavior_type TEXT NOT NULL,
                base_intensity REAL NOT NULL,
                current_intensity REAL NOT NULL,
                escalation_rate REAL NOT NULL,
                de_escalation_rate REAL NOT NULL,
                current_phase INTEGER NOT NULL,
                interactions_since_phase_start INTEGER NOT NULL,
                phase_started_at INTEGER NOT NULL,
                phase_history_json TEXT NOT NULL DEFAULT '[]',
                volatility REAL NOT NULL,
                threshold_for_display REAL NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                consent_granted INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create behavior_profiles table")?;

        // One profile row per (agent, pattern); activation is a toggle.
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_profiles_agent_type
             ON behavior_profiles(agent_id, behavior_type)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create behavior_profiles index")?;

        // Consent column (v1 -> v2 migration, gates high-intensity phases).
        if let Err(e) =
            sqlx::query("ALTER TABLE behavior_profiles ADD COLUMN consent_granted INTEGER NOT NULL DEFAULT 0")
                .execute(&self.pool)
                .await
        {
            tracing::debug!("Column 'consent_granted' likely exists or migration skipped: {}", e);
        }

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trigger_events (
                id TEXT PRIMARY KEY,
                profile_id TEXT NOT NULL,
                agent_id TEXT NOT NULL,
                message_id TEXT,
                trigger_type TEXT NOT NULL,
                behavior_type TEXT NOT NULL,
                weight REAL NOT NULL,
                confidence REAL NOT NULL,
                detected_text TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                FOREIGN KEY(profile_id) REFERENCES behavior_profiles(id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create trigger_events table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_trigger_events_profile
             ON trigger_events(profile_id, created_at)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create trigger_events profile index")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_trigger_events_agent_type
             ON trigger_events(agent_id, behavior_type, created_at)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create trigger_events agent index")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS emotional_states (
                agent_id TEXT PRIMARY KEY,
                state_json TEXT NOT NULL,
                mood_json TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create emotional_states table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                agent_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                author TEXT NOT NULL,
                body TEXT NOT NULL,
                joy REAL,
                trust REAL,
                created_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create messages table")?;

        // Dominant-emotion snapshot columns (v1 -> v2 migration, used by the
        // emotional check-in trigger).
        if let Err(e) = sqlx::query("ALTER TABLE messages ADD COLUMN dominant_emotion TEXT")
            .execute(&self.pool)
            .await
        {
            tracing::debug!("Column 'dominant_emotion' likely exists or migration skipped: {}", e);
        }
        if let Err(e) = sqlx::query("ALTER TABLE messages ADD COLUMN dominant_intensity REAL")
            .execute(&self.pool)
            .await
        {
            tracing::debug!("Column 'dominant_intensity' likely exists or migration skipped: {}", e);
        }

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_pair
             ON messages(agent_id, user_id, created_at)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create messages index")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bonds (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                agent_id TEXT NOT NULL,
                tier TEXT NOT NULL,
                status TEXT NOT NULL,
                decay_phase TEXT NOT NULL,
                affinity REAL NOT NULL,
                duration_days INTEGER NOT NULL,
                total_interactions INTEGER NOT NULL,
                shared_experiences INTEGER NOT NULL,
                rarity_score REAL NOT NULL,
                rarity_tier TEXT NOT NULL,
                global_rank INTEGER NOT NULL,
                started_at INTEGER NOT NULL,
                last_interaction_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create bonds table")?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_bonds_pair ON bonds(user_id, agent_id)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create bonds pair index")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_bonds_agent_tier ON bonds(agent_id, tier)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create bonds tier index")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bond_notifications (
                id TEXT PRIMARY KEY,
                bond_id TEXT,
                user_id TEXT NOT NULL,
                agent_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                message TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create bond_notifications table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bond_legacies (
                id TEXT PRIMARY KEY,
                bond_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                agent_id TEXT NOT NULL,
                tier TEXT NOT NULL,
                affinity REAL NOT NULL,
                duration_days INTEGER NOT NULL,
                total_interactions INTEGER NOT NULL,
                rarity_tier TEXT NOT NULL,
                released_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create bond_legacies table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bond_queue (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                agent_id TEXT NOT NULL,
                tier TEXT NOT NULL,
                eligibility_score REAL NOT NULL,
                status TEXT NOT NULL,
                joined_at INTEGER NOT NULL,
                offer_expires_at INTEGER
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create bond_queue table")?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_queue_entry
             ON bond_queue(user_id, agent_id, tier)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create bond_queue index")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS proactive_configs (
                user_id TEXT NOT NULL,
                agent_id TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                quiet_start TEXT NOT NULL,
                quiet_end TEXT NOT NULL,
                active_days_json TEXT NOT NULL,
                max_per_day INTEGER NOT NULL,
                min_hours_between INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (user_id, agent_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create proactive_configs table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS proactive_messages (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                agent_id TEXT NOT NULL,
                trigger_kind TEXT NOT NULL,
                priority REAL NOT NULL,
                reason TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create proactive_messages table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_proactive_pair
             ON proactive_messages(user_id, agent_id, created_at)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create proactive_messages index")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS commitments (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                agent_id TEXT NOT NULL,
                description TEXT NOT NULL,
                importance REAL NOT NULL,
                mentioned_at INTEGER NOT NULL,
                due_at INTEGER,
                attempts INTEGER NOT NULL DEFAULT 0,
                completed INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create commitments table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS life_events (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                agent_id TEXT NOT NULL,
                description TEXT NOT NULL,
                happens_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create life_events table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS special_dates (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                label TEXT NOT NULL,
                month INTEGER NOT NULL,
                day INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create special_dates table")?;

        Ok(())
    }

    // ========================================================================
    // Behavior profiles
    // ========================================================================

    /// Insert or fully replace a profile row.
    pub async fn save_profile(&self, profile: &BehaviorProfile) -> Result<()> {
        let history_json = serde_json::to_string(&profile.phase_history)
            .context("Failed to serialize phase history")?;

        sqlx::query(
            r#"
            INSERT INTO behavior_profiles
                (id, agent_id, behavior_type, base_intensity, current_intensity,
                 escalation_rate, de_escalation_rate, current_phase,
                 interactions_since_phase_start, phase_started_at, phase_history_json,
                 volatility, threshold_for_display, is_active, consent_granted, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                base_intensity = excluded.base_intensity,
                current_intensity = excluded.current_intensity,
                escalation_rate = excluded.escalation_rate,
                de_escalation_rate = excluded.de_escalation_rate,
                current_phase = excluded.current_phase,
                interactions_since_phase_start = excluded.interactions_since_phase_start,
                phase_started_at = excluded.phase_started_at,
                phase_history_json = excluded.phase_history_json,
                volatility = excluded.volatility,
                threshold_for_display = excluded.threshold_for_display,
                is_active = excluded.is_active,
                consent_granted = excluded.consent_granted,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(profile.id.to_string())
        .bind(&profile.agent_id)
        .bind(profile.behavior_type.as_str())
        .bind(profile.base_intensity)
        .bind(profile.current_intensity)
        .bind(profile.escalation_rate)
        .bind(profile.de_escalation_rate)
        .bind(profile.current_phase as i64)
        .bind(profile.interactions_since_phase_start as i64)
        .bind(profile.phase_started_at.timestamp())
        .bind(history_json)
        .bind(profile.volatility)
        .bind(profile.threshold_for_display)
        .bind(profile.is_active as i32)
        .bind(profile.consent_granted as i32)
        .bind(profile.updated_at.timestamp())
        .execute(&self.pool)
        .await
        .context("Failed to save behavior profile")?;

        Ok(())
    }

    pub async fn get_profile(
        &self,
        agent_id: &str,
        behavior_type: BehaviorType,
    ) -> Result<Option<BehaviorProfile>> {
        let row = sqlx::query(
            "SELECT * FROM behavior_profiles WHERE agent_id = ? AND behavior_type = ?",
        )
        .bind(agent_id)
        .bind(behavior_type.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to query behavior profile")?;

        row.map(|r| profile_from_row(&r)).transpose()
    }

    pub async fn profiles_for_agent(&self, agent_id: &str) -> Result<Vec<BehaviorProfile>> {
        let rows = sqlx::query(
            "SELECT * FROM behavior_profiles WHERE agent_id = ? ORDER BY behavior_type",
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query behavior profiles")?;

        rows.iter().map(profile_from_row).collect()
    }

    pub async fn active_profiles(&self, agent_id: &str) -> Result<Vec<BehaviorProfile>> {
        let rows = sqlx::query(
            "SELECT * FROM behavior_profiles
             WHERE agent_id = ? AND is_active = 1 ORDER BY behavior_type",
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query active behavior profiles")?;

        rows.iter().map(profile_from_row).collect()
    }

    // ========================================================================
    // Trigger events — append-only: no update or delete surface exists
    // ========================================================================

    pub async fn append_trigger_event(&self, event: &TriggerEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO trigger_events
                (id, profile_id, agent_id, message_id, trigger_type, behavior_type,
                 weight, confidence, detected_text, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.id.to_string())
        .bind(event.profile_id.to_string())
        .bind(&event.agent_id)
        .bind(event.message_id.map(|id| id.to_string()))
        .bind(event.trigger_type.as_str())
        .bind(event.behavior_type.as_str())
        .bind(event.weight)
        .bind(event.confidence)
        .bind(&event.detected_text)
        .bind(event.created_at.timestamp())
        .execute(&self.pool)
        .await
        .context("Failed to append trigger event")?;

        Ok(())
    }

    /// Trigger log slice for one behavior on one agent, newest first.
    pub async fn behavior_history(
        &self,
        agent_id: &str,
        behavior_type: BehaviorType,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TriggerEvent>> {
        let rows = sqlx::query(
            "SELECT * FROM trigger_events
             WHERE agent_id = ? AND behavior_type = ?
             ORDER BY created_at DESC LIMIT ? OFFSET ?",
        )
        .bind(agent_id)
        .bind(behavior_type.as_str())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query behavior history")?;

        rows.iter().map(trigger_event_from_row).collect()
    }

    /// How many triggers of one type hit a profile since `since`.
    /// Phase gating counts from the start of the current phase.
    pub async fn count_triggers_since(
        &self,
        profile_id: Uuid,
        trigger_type: TriggerType,
        since: DateTime<Utc>,
    ) -> Result<u32> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM trigger_events
             WHERE profile_id = ? AND trigger_type = ? AND created_at >= ?",
        )
        .bind(profile_id.to_string())
        .bind(trigger_type.as_str())
        .bind(since.timestamp())
        .fetch_one(&self.pool)
        .await
        .context("Failed to count trigger events")?;

        Ok(row.get::<i64, _>("n") as u32)
    }

    // ========================================================================
    // Emotional state (one row per agent)
    // ========================================================================

    pub async fn save_emotional_state(
        &self,
        agent_id: &str,
        state: &PlutchikState,
        mood: &PadMood,
    ) -> Result<()> {
        let state_json =
            serde_json::to_string(state).context("Failed to serialize emotional state")?;
        let mood_json = serde_json::to_string(mood).context("Failed to serialize mood")?;

        sqlx::query(
            "INSERT INTO emotional_states (agent_id, state_json, mood_json, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(agent_id) DO UPDATE SET
                state_json = excluded.state_json,
                mood_json = excluded.mood_json,
                updated_at = excluded.updated_at",
        )
        .bind(agent_id)
        .bind(&state_json)
        .bind(&mood_json)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .context("Failed to save emotional state")?;

        Ok(())
    }

    pub async fn load_emotional_state(
        &self,
        agent_id: &str,
    ) -> Result<Option<(PlutchikState, PadMood)>> {
        let row = sqlx::query(
            "SELECT state_json, mood_json FROM emotional_states WHERE agent_id = ?",
        )
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to query emotional state")?;

        match row {
            Some(row) => {
                let state_json: String = row.get("state_json");
                let mood_json: String = row.get("mood_json");
                let state: PlutchikState = serde_json::from_str(&state_json)
                    .context("Failed to parse emotional state")?;
                let mood: PadMood =
                    serde_json::from_str(&mood_json).context("Failed to parse mood")?;
                Ok(Some((state, mood)))
            }
            None => Ok(None),
        }
    }

    // ========================================================================
    // Messages
    // ========================================================================

    pub async fn save_message(&self, message: &ChatMessage) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO messages
                (id, agent_id, user_id, author, body, joy, trust,
                 dominant_emotion, dominant_intensity, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(message.id.to_string())
        .bind(&message.agent_id)
        .bind(&message.user_id)
        .bind(message.author.as_str())
        .bind(&message.body)
        .bind(message.joy)
        .bind(message.trust)
        .bind(message.dominant_emotion.map(|e| e.as_str()))
        .bind(message.dominant_intensity)
        .bind(message.created_at.timestamp())
        .execute(&self.pool)
        .await
        .context("Failed to save message")?;

        Ok(())
    }

    /// Newest first.
    pub async fn recent_messages(
        &self,
        agent_id: &str,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<ChatMessage>> {
        let rows = sqlx::query(
            "SELECT * FROM messages WHERE agent_id = ? AND user_id = ?
             ORDER BY created_at DESC LIMIT ?",
        )
        .bind(agent_id)
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query recent messages")?;

        rows.iter().map(message_from_row).collect()
    }

    /// Messages in a time window, newest first.
    pub async fn messages_between(
        &self,
        agent_id: &str,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ChatMessage>> {
        let rows = sqlx::query(
            "SELECT * FROM messages
             WHERE agent_id = ? AND user_id = ? AND created_at >= ? AND created_at <= ?
             ORDER BY created_at DESC",
        )
        .bind(agent_id)
        .bind(user_id)
        .bind(from.timestamp())
        .bind(to.timestamp())
        .fetch_all(&self.pool)
        .await
        .context("Failed to query messages in window")?;

        rows.iter().map(message_from_row).collect()
    }

    pub async fn count_messages(&self, agent_id: &str, user_id: &str) -> Result<u64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM messages WHERE agent_id = ? AND user_id = ?",
        )
        .bind(agent_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count messages")?;

        Ok(row.get::<i64, _>("n") as u64)
    }

    pub async fn last_user_message_at(
        &self,
        agent_id: &str,
        user_id: &str,
    ) -> Result<Option<DateTime<Utc>>> {
        let row = sqlx::query(
            "SELECT MAX(created_at) AS ts FROM messages
             WHERE agent_id = ? AND user_id = ? AND author = 'user'",
        )
        .bind(agent_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to query last user message time")?;

        let ts: Option<i64> = row.get("ts");
        Ok(ts.and_then(|t| DateTime::from_timestamp(t, 0)))
    }

    /// When the pair first talked; feeds relationship-age checks.
    pub async fn first_message_at(
        &self,
        agent_id: &str,
        user_id: &str,
    ) -> Result<Option<DateTime<Utc>>> {
        let row = sqlx::query(
            "SELECT MIN(created_at) AS ts FROM messages
             WHERE agent_id = ? AND user_id = ?",
        )
        .bind(agent_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to query first message time")?;

        let ts: Option<i64> = row.get("ts");
        Ok(ts.and_then(|t| DateTime::from_timestamp(t, 0)))
    }

    /// Every (user, agent) pair that has either messaged or bonded.
    pub async fn active_pairs(&self) -> Result<Vec<(String, String)>> {
        let rows = sqlx::query(
            "SELECT DISTINCT user_id, agent_id FROM messages
             UNION
             SELECT DISTINCT user_id, agent_id FROM bonds",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to query active pairs")?;

        Ok(rows
            .iter()
            .map(|r| (r.get("user_id"), r.get("agent_id")))
            .collect())
    }

    // ========================================================================
    // Bonds
    // ========================================================================

    /// Check slot availability and insert atomically. Every bond row of a
    /// tier occupies a slot regardless of status; only release frees one.
    pub async fn try_claim_slot(&self, bond: &SymbolicBond) -> Result<SlotClaim> {
        let mut tx = self.pool.begin().await.context("Failed to begin claim")?;

        if let Some(slots) = bond.tier.slots() {
            let row = sqlx::query(
                "SELECT COUNT(*) AS n FROM bonds WHERE agent_id = ? AND tier = ?",
            )
            .bind(&bond.agent_id)
            .bind(bond.tier.as_str())
            .fetch_one(&mut *tx)
            .await
            .context("Failed to count tier bonds")?;

            if row.get::<i64, _>("n") >= slots as i64 {
                return Ok(SlotClaim::TierFull);
            }
        }

        insert_bond(&mut tx, bond).await?;
        tx.commit().await.context("Failed to commit claim")?;
        Ok(SlotClaim::Created)
    }

    pub async fn get_bond(&self, id: Uuid) -> Result<Option<SymbolicBond>> {
        let row = sqlx::query("SELECT * FROM bonds WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to query bond")?;

        row.map(|r| bond_from_row(&r)).transpose()
    }

    pub async fn find_bond(&self, user_id: &str, agent_id: &str) -> Result<Option<SymbolicBond>> {
        let row = sqlx::query("SELECT * FROM bonds WHERE user_id = ? AND agent_id = ?")
            .bind(user_id)
            .bind(agent_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to query bond by pair")?;

        row.map(|r| bond_from_row(&r)).transpose()
    }

    pub async fn bonds_for_user(&self, user_id: &str) -> Result<Vec<SymbolicBond>> {
        let rows = sqlx::query(
            "SELECT * FROM bonds WHERE user_id = ? ORDER BY started_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query user bonds")?;

        rows.iter().map(bond_from_row).collect()
    }

    pub async fn update_bond(&self, bond: &SymbolicBond) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE bonds SET
                tier = ?, status = ?, decay_phase = ?, affinity = ?,
                duration_days = ?, total_interactions = ?, shared_experiences = ?,
                rarity_score = ?, rarity_tier = ?, global_rank = ?,
                last_interaction_at = ?
            WHERE id = ?
            "#,
        )
        .bind(bond.tier.as_str())
        .bind(bond.status.as_str())
        .bind(bond.decay_phase.as_str())
        .bind(bond.affinity)
        .bind(bond.duration_days)
        .bind(bond.total_interactions as i64)
        .bind(bond.shared_experiences as i64)
        .bind(bond.rarity_score)
        .bind(bond.rarity_tier.as_str())
        .bind(bond.global_rank as i64)
        .bind(bond.last_interaction_at.timestamp())
        .bind(bond.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update bond")?;

        Ok(())
    }

    /// Bonds whose last interaction is at or before `cutoff` — the decay
    /// scan's working set.
    pub async fn bonds_inactive_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<SymbolicBond>> {
        let rows = sqlx::query(
            "SELECT * FROM bonds WHERE last_interaction_at <= ? ORDER BY last_interaction_at",
        )
        .bind(cutoff.timestamp())
        .fetch_all(&self.pool)
        .await
        .context("Failed to query inactive bonds")?;

        rows.iter().map(bond_from_row).collect()
    }

    pub async fn count_active_tier_bonds(&self, agent_id: &str, tier: BondTier) -> Result<u32> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM bonds
             WHERE agent_id = ? AND tier = ? AND status = 'active'",
        )
        .bind(agent_id)
        .bind(tier.as_str())
        .fetch_one(&self.pool)
        .await
        .context("Failed to count active tier bonds")?;

        Ok(row.get::<i64, _>("n") as u32)
    }

    pub async fn count_higher_rarity(
        &self,
        agent_id: &str,
        tier: BondTier,
        rarity_score: f32,
    ) -> Result<u32> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM bonds
             WHERE agent_id = ? AND tier = ? AND status = 'active' AND rarity_score > ?",
        )
        .bind(agent_id)
        .bind(tier.as_str())
        .bind(rarity_score)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count higher-rarity bonds")?;

        Ok(row.get::<i64, _>("n") as u32)
    }

    /// Release step one: write the legacy snapshot and delete the bond in a
    /// single transaction so the snapshot can never be lost.
    pub async fn archive_and_delete_bond(
        &self,
        bond_id: Uuid,
        legacy: &BondLegacy,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin release")?;

        sqlx::query(
            r#"
            INSERT INTO bond_legacies
                (id, bond_id, user_id, agent_id, tier, affinity, duration_days,
                 total_interactions, rarity_tier, released_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(legacy.id.to_string())
        .bind(legacy.bond_id.to_string())
        .bind(&legacy.user_id)
        .bind(&legacy.agent_id)
        .bind(legacy.tier.as_str())
        .bind(legacy.affinity)
        .bind(legacy.duration_days)
        .bind(legacy.total_interactions as i64)
        .bind(legacy.rarity_tier.as_str())
        .bind(legacy.released_at.timestamp())
        .execute(&mut *tx)
        .await
        .context("Failed to insert bond legacy")?;

        sqlx::query("DELETE FROM bonds WHERE id = ?")
            .bind(bond_id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to delete released bond")?;

        tx.commit().await.context("Failed to commit release")?;
        Ok(())
    }

    pub async fn legacies_for_user(&self, user_id: &str) -> Result<Vec<BondLegacy>> {
        let rows = sqlx::query(
            "SELECT * FROM bond_legacies WHERE user_id = ? ORDER BY released_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query bond legacies")?;

        rows.iter().map(legacy_from_row).collect()
    }

    // ========================================================================
    // Bond notifications (append-only)
    // ========================================================================

    pub async fn append_notification(&self, notification: &BondNotification) -> Result<()> {
        sqlx::query(
            "INSERT INTO bond_notifications (id, bond_id, user_id, agent_id, kind, message, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(notification.id.to_string())
        .bind(notification.bond_id.map(|id| id.to_string()))
        .bind(&notification.user_id)
        .bind(&notification.agent_id)
        .bind(notification.kind.as_str())
        .bind(&notification.message)
        .bind(notification.created_at.timestamp())
        .execute(&self.pool)
        .await
        .context("Failed to append bond notification")?;

        Ok(())
    }

    pub async fn notifications_for_user(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<BondNotification>> {
        let rows = sqlx::query(
            "SELECT * FROM bond_notifications WHERE user_id = ?
             ORDER BY created_at DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query bond notifications")?;

        rows.iter().map(notification_from_row).collect()
    }

    // ========================================================================
    // Bond queue
    // ========================================================================

    /// Join (or refresh standing in) the wait queue for a full tier.
    pub async fn join_queue(&self, entry: &BondQueueEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bond_queue
                (id, user_id, agent_id, tier, eligibility_score, status, joined_at, offer_expires_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, agent_id, tier) DO UPDATE SET
                eligibility_score = excluded.eligibility_score
            "#,
        )
        .bind(entry.id.to_string())
        .bind(&entry.user_id)
        .bind(&entry.agent_id)
        .bind(entry.tier.as_str())
        .bind(entry.eligibility_score)
        .bind(entry.status.as_str())
        .bind(entry.joined_at.timestamp())
        .bind(entry.offer_expires_at.map(|t| t.timestamp()))
        .execute(&self.pool)
        .await
        .context("Failed to join bond queue")?;

        Ok(())
    }

    /// Best waiting candidate: highest eligibility, earliest join breaks ties.
    pub async fn next_queue_candidate(
        &self,
        agent_id: &str,
        tier: BondTier,
    ) -> Result<Option<BondQueueEntry>> {
        let row = sqlx::query(
            "SELECT * FROM bond_queue
             WHERE agent_id = ? AND tier = ? AND status = 'waiting'
             ORDER BY eligibility_score DESC, joined_at ASC LIMIT 1",
        )
        .bind(agent_id)
        .bind(tier.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to query queue candidate")?;

        row.map(|r| queue_entry_from_row(&r)).transpose()
    }

    pub async fn mark_queue_offered(&self, id: Uuid, expires_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE bond_queue SET status = 'offered', offer_expires_at = ? WHERE id = ?",
        )
        .bind(expires_at.timestamp())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to mark queue entry offered")?;

        Ok(())
    }

    /// Expire overdue offers, returning the entries that lapsed so the
    /// caller can offer their slots to the next candidates.
    pub async fn expire_stale_offers(&self, now: DateTime<Utc>) -> Result<Vec<BondQueueEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM bond_queue
             WHERE status = 'offered' AND offer_expires_at IS NOT NULL AND offer_expires_at <= ?",
        )
        .bind(now.timestamp())
        .fetch_all(&self.pool)
        .await
        .context("Failed to query stale offers")?;

        let stale: Result<Vec<BondQueueEntry>> =
            rows.iter().map(queue_entry_from_row).collect();
        let stale = stale?;

        for entry in &stale {
            sqlx::query("UPDATE bond_queue SET status = 'expired' WHERE id = ?")
                .bind(entry.id.to_string())
                .execute(&self.pool)
                .await
                .context("Failed to expire queue entry")?;
        }

        Ok(stale)
    }

    pub async fn queue_entry_for(
        &self,
        user_id: &str,
        agent_id: &str,
        tier: BondTier,
    ) -> Result<Option<BondQueueEntry>> {
        let row = sqlx::query(
            "SELECT * FROM bond_queue WHERE user_id = ? AND agent_id = ? AND tier = ?",
        )
        .bind(user_id)
        .bind(agent_id)
        .bind(tier.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to query queue entry")?;

        row.map(|r| queue_entry_from_row(&r)).transpose()
    }

    /// Remove an entry once its owner claims a bond.
    pub async fn delete_queue_entry(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM bond_queue WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete queue entry")?;

        Ok(())
    }

    // ========================================================================
    // Proactive config and log
    // ========================================================================

    pub async fn get_proactive_config(
        &self,
        user_id: &str,
        agent_id: &str,
    ) -> Result<Option<ProactiveConfig>> {
        let row = sqlx::query(
            "SELECT * FROM proactive_configs WHERE user_id = ? AND agent_id = ?",
        )
        .bind(user_id)
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to query proactive config")?;

        row.map(|r| proactive_config_from_row(&r)).transpose()
    }

    pub async fn upsert_proactive_config(&self, config: &ProactiveConfig) -> Result<()> {
        let days_json = serde_json::to_string(&config.active_days)
            .context("Failed to serialize active days")?;

        sqlx::query(
            r#"
            INSERT INTO proactive_configs
                (user_id, agent_id, enabled, quiet_start, quiet_end,
                 active_days_json, max_per_day, min_hours_between, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, agent_id) DO UPDATE SET
                enabled = excluded.enabled,
                quiet_start = excluded.quiet_start,
                quiet_end = excluded.quiet_end,
                active_days_json = excluded.active_days_json,
                max_per_day = excluded.max_per_day,
                min_hours_between = excluded.min_hours_between,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&config.user_id)
        .bind(&config.agent_id)
        .bind(config.enabled as i32)
        .bind(&config.quiet_start)
        .bind(&config.quiet_end)
        .bind(days_json)
        .bind(config.max_per_day as i64)
        .bind(config.min_hours_between)
        .bind(config.updated_at.timestamp())
        .execute(&self.pool)
        .await
        .context("Failed to upsert proactive config")?;

        Ok(())
    }

    pub async fn append_proactive_message(&self, message: &ProactiveMessage) -> Result<()> {
        sqlx::query(
            "INSERT INTO proactive_messages (id, user_id, agent_id, trigger_kind, priority, reason, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(message.id.to_string())
        .bind(&message.user_id)
        .bind(&message.agent_id)
        .bind(message.trigger_kind.as_str())
        .bind(message.priority)
        .bind(&message.reason)
        .bind(message.created_at.timestamp())
        .execute(&self.pool)
        .await
        .context("Failed to append proactive message")?;

        Ok(())
    }

    pub async fn last_proactive_at(
        &self,
        user_id: &str,
        agent_id: &str,
    ) -> Result<Option<DateTime<Utc>>> {
        let row = sqlx::query(
            "SELECT MAX(created_at) AS ts FROM proactive_messages
             WHERE user_id = ? AND agent_id = ?",
        )
        .bind(user_id)
        .bind(agent_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to query last proactive time")?;

        let ts: Option<i64> = row.get("ts");
        Ok(ts.and_then(|t| DateTime::from_timestamp(t, 0)))
    }

    pub async fn count_proactive_since(
        &self,
        user_id: &str,
        agent_id: &str,
        since: DateTime<Utc>,
    ) -> Result<u32> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM proactive_messages
             WHERE user_id = ? AND agent_id = ? AND created_at >= ?",
        )
        .bind(user_id)
        .bind(agent_id)
        .bind(since.timestamp())
        .fetch_one(&self.pool)
        .await
        .context("Failed to count proactive messages")?;

        Ok(row.get::<i64, _>("n") as u32)
    }

    // ========================================================================
    // Commitments, life events, special dates
    // ========================================================================

    pub async fn add_commitment(&self, commitment: &Commitment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO commitments
                (id, user_id, agent_id, description, importance, mentioned_at,
                 due_at, attempts, completed)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(commitment.id.to_string())
        .bind(&commitment.user_id)
        .bind(&commitment.agent_id)
        .bind(&commitment.description)
        .bind(commitment.importance)
        .bind(commitment.mentioned_at.timestamp())
        .bind(commitment.due_at.map(|t| t.timestamp()))
        .bind(commitment.attempts as i64)
        .bind(commitment.completed as i32)
        .execute(&self.pool)
        .await
        .context("Failed to add commitment")?;

        Ok(())
    }

    /// Incomplete commitments with follow-up attempts remaining.
    pub async fn open_commitments(&self, user_id: &str, agent_id: &str) -> Result<Vec<Commitment>> {
        let rows = sqlx::query(
            "SELECT * FROM commitments
             WHERE user_id = ? AND agent_id = ? AND completed = 0 AND attempts < ?
             ORDER BY mentioned_at",
        )
        .bind(user_id)
        .bind(agent_id)
        .bind(Commitment::MAX_ATTEMPTS as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query open commitments")?;

        rows.iter().map(commitment_from_row).collect()
    }

    pub async fn bump_commitment_attempt(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE commitments SET attempts = attempts + 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to bump commitment attempts")?;

        Ok(())
    }

    pub async fn complete_commitment(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE commitments SET completed = 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to complete commitment")?;

        Ok(())
    }

    pub async fn add_life_event(&self, event: &LifeEvent) -> Result<()> {
        sqlx::query(
            "INSERT INTO life_events (id, user_id, agent_id, description, happens_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(event.id.to_string())
        .bind(&event.user_id)
        .bind(&event.agent_id)
        .bind(&event.description)
        .bind(event.happens_at.timestamp())
        .execute(&self.pool)
        .await
        .context("Failed to add life event")?;

        Ok(())
    }

    pub async fn upcoming_life_events(
        &self,
        user_id: &str,
        agent_id: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<LifeEvent>> {
        let rows = sqlx::query(
            "SELECT * FROM life_events
             WHERE user_id = ? AND agent_id = ? AND happens_at >= ? AND happens_at <= ?
             ORDER BY happens_at",
        )
        .bind(user_id)
        .bind(agent_id)
        .bind(from.timestamp())
        .bind(until.timestamp())
        .fetch_all(&self.pool)
        .await
        .context("Failed to query upcoming life events")?;

        rows.iter().map(life_event_from_row).collect()
    }

    pub async fn add_special_date(&self, date: &SpecialDate) -> Result<()> {
        sqlx::query(
            "INSERT INTO special_dates (id, user_id, label, month, day) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(date.id.to_string())
        .bind(&date.user_id)
        .bind(&date.label)
        .bind(date.month as i64)
        .bind(date.day as i64)
        .execute(&self.pool)
        .await
        .context("Failed to add special date")?;

        Ok(())
    }

    pub async fn special_dates_for(&self, user_id: &str) -> Result<Vec<SpecialDate>> {
        let rows = sqlx::query("SELECT * FROM special_dates WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to query special dates")?;

        rows.iter().map(special_date_from_row).collect()
    }

    /// Recent proactive log rows, newest first.
    pub async fn recent_proactive_messages(
        &self,
        user_id: &str,
        agent_id: &str,
        limit: i64,
    ) -> Result<Vec<ProactiveMessage>> {
        let rows = sqlx::query(
            "SELECT * FROM proactive_messages WHERE user_id = ? AND agent_id = ?
             ORDER BY created_at DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(agent_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query proactive messages")?;

        rows.iter().map(proactive_message_from_row).collect()
    }
}

async fn insert_bond(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    bond: &SymbolicBond,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO bonds
            (id, user_id, agent_id, tier, status, decay_phase, affinity,
             duration_days, total_interactions, shared_experiences,
             rarity_score, rarity_tier, global_rank, started_at, last_interaction_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(bond.id.to_string())
    .bind(&bond.user_id)
    .bind(&bond.agent_id)
    .bind(bond.tier.as_str())
    .bind(bond.status.as_str())
    .bind(bond.decay_phase.as_str())
    .bind(bond.affinity)
    .bind(bond.duration_days)
    .bind(bond.total_interactions as i64)
    .bind(bond.shared_experiences as i64)
    .bind(bond.rarity_score)
    .bind(bond.rarity_tier.as_str())
    .bind(bond.global_rank as i64)
    .bind(bond.started_at.timestamp())
    .bind(bond.last_interaction_at.timestamp())
    .execute(&mut **tx)
    .await
    .context("Failed to insert bond")?;

    Ok(())
}

// ============================================================================
// Row mapping
// ============================================================================

fn parse_uuid(row: &sqlx::sqlite::SqliteRow, col: &str) -> Result<Uuid> {
    let s: String = row.get(col);
    Uuid::parse_str(&s).with_context(|| format!("Invalid uuid in column {col}"))
}

fn parse_time(row: &sqlx::sqlite::SqliteRow, col: &str) -> DateTime<Utc> {
    DateTime::from_timestamp(row.get::<i64, _>(col), 0).unwrap_or_default()
}

fn profile_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<BehaviorProfile> {
    let behavior_type_str: String = row.get("behavior_type");
    let behavior_type = BehaviorType::parse_str(&behavior_type_str)
        .ok_or_else(|| anyhow!("Unknown behavior type: {behavior_type_str}"))?;
    let history_json: String = row.get("phase_history_json");
    let phase_history =
        serde_json::from_str(&history_json).context("Failed to parse phase history")?;

    let mut profile = BehaviorProfile {
        id: parse_uuid(row, "id")?,
        agent_id: row.get("agent_id"),
        behavior_type,
        base_intensity: row.get("base_intensity"),
        current_intensity: row.get("current_intensity"),
        escalation_rate: row.get("escalation_rate"),
        de_escalation_rate: row.get("de_escalation_rate"),
        current_phase: row.get::<i64, _>("current_phase") as u8,
        interactions_since_phase_start: row.get::<i64, _>("interactions_since_phase_start") as u32,
        phase_started_at: parse_time(row, "phase_started_at"),
        phase_history,
        volatility: row.get("volatility"),
        threshold_for_display: row.get("threshold_for_display"),
        is_active: row.get::<i32, _>("is_active") != 0,
        consent_granted: row.get::<i32, _>("consent_granted") != 0,
        updated_at: parse_time(row, "updated_at"),
    };
    profile.normalize();
    Ok(profile)
}

fn trigger_event_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<TriggerEvent> {
    let trigger_type_str: String = row.get("trigger_type");
    let behavior_type_str: String = row.get("behavior_type");
    let message_id: Option<String> = row.get("message_id");

    Ok(TriggerEvent {
        id: parse_uuid(row, "id")?,
        profile_id: parse_uuid(row, "profile_id")?,
        agent_id: row.get("agent_id"),
        message_id: message_id
            .map(|s| Uuid::parse_str(&s).context("Invalid message id"))
            .transpose()?,
        trigger_type: TriggerType::parse_str(&trigger_type_str)
            .ok_or_else(|| anyhow!("Unknown trigger type: {trigger_type_str}"))?,
        behavior_type: BehaviorType::parse_str(&behavior_type_str)
            .ok_or_else(|| anyhow!("Unknown behavior type: {behavior_type_str}"))?,
        weight: row.get("weight"),
        confidence: row.get("confidence"),
        detected_text: row.get("detected_text"),
        created_at: parse_time(row, "created_at"),
    })
}

fn message_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ChatMessage> {
    let author_str: String = row.get("author");
    let dominant: Option<String> = row.get("dominant_emotion");

    Ok(ChatMessage {
        id: parse_uuid(row, "id")?,
        agent_id: row.get("agent_id"),
        user_id: row.get("user_id"),
        author: MessageAuthor::parse_str(&author_str)
            .ok_or_else(|| anyhow!("Unknown message author: {author_str}"))?,
        body: row.get("body"),
        joy: row.get("joy"),
        trust: row.get("trust"),
        dominant_emotion: dominant.and_then(|s| {
            Emotion::ALL.iter().copied().find(|e| e.as_str() == s)
        }),
        dominant_intensity: row.get("dominant_intensity"),
        created_at: parse_time(row, "created_at"),
    })
}

fn bond_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<SymbolicBond> {
    let tier_str: String = row.get("tier");
    let status_str: String = row.get("status");
    let phase_str: String = row.get("decay_phase");
    let rarity_str: String = row.get("rarity_tier");

    Ok(SymbolicBond {
        id: parse_uuid(row, "id")?,
        user_id: row.get("user_id"),
        agent_id: row.get("agent_id"),
        tier: BondTier::parse_str(&tier_str)
            .ok_or_else(|| anyhow!("Unknown bond tier: {tier_str}"))?,
        status: BondStatus::parse_str(&status_str)
            .ok_or_else(|| anyhow!("Unknown bond status: {status_str}"))?,
        decay_phase: DecayPhase::parse_str(&phase_str)
            .ok_or_else(|| anyhow!("Unknown decay phase: {phase_str}"))?,
        affinity: row.get("affinity"),
        duration_days: row.get("duration_days"),
        total_interactions: row.get::<i64, _>("total_interactions") as u32,
        shared_experiences: row.get::<i64, _>("shared_experiences") as u32,
        rarity_score: row.get("rarity_score"),
        rarity_tier: RarityTier::parse_str(&rarity_str)
            .ok_or_else(|| anyhow!("Unknown rarity tier: {rarity_str}"))?,
        global_rank: row.get::<i64, _>("global_rank") as u32,
        started_at: parse_time(row, "started_at"),
        last_interaction_at: parse_time(row, "last_interaction_at"),
    })
}

fn notification_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<BondNotification> {
    let kind_str: String = row.get("kind");
    let bond_id: Option<String> = row.get("bond_id");

    Ok(BondNotification {
        id: parse_uuid(row, "id")?,
        bond_id: bond_id
            .map(|s| Uuid::parse_str(&s).context("Invalid bond id"))
            .transpose()?,
        user_id: row.get("user_id"),
        agent_id: row.get("agent_id"),
        kind: NotificationKind::parse_str(&kind_str)
            .ok_or_else(|| anyhow!("Unknown notification kind: {kind_str}"))?,
        message: row.get("message"),
        created_at: parse_time(row, "created_at"),
    })
}

fn legacy_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<BondLegacy> {
    let tier_str: String = row.get("tier");
    let rarity_str: String = row.get("rarity_tier");

    Ok(BondLegacy {
        id: parse_uuid(row, "id")?,
        bond_id: parse_uuid(row, "bond_id")?,
        user_id: row.get("user_id"),
        agent_id: row.get("agent_id"),
        tier: BondTier::parse_str(&tier_str)
            .ok_or_else(|| anyhow!("Unknown bond tier: {tier_str}"))?,
        affinity: row.get("affinity"),
        duration_days: row.get("duration_days"),
        total_interactions: row.get::<i64, _>("total_interactions") as u32,
        rarity_tier: RarityTier::parse_str(&rarity_str)
            .ok_or_else(|| anyhow!("Unknown rarity tier: {rarity_str}"))?,
        released_at: parse_time(row, "released_at"),
    })
}

fn queue_entry_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<BondQueueEntry> {
    let tier_str: String = row.get("tier");
    let status_str: String = row.get("status");
    let expires: Option<i64> = row.get("offer_expires_at");

    Ok(BondQueueEntry {
        id: parse_uuid(row, "id")?,
        user_id: row.get("user_id"),
        agent_id: row.get("agent_id"),
        tier: BondTier::parse_str(&tier_str)
            .ok_or_else(|| anyhow!("Unknown bond tier: {tier_str}"))?,
        eligibility_score: row.get("eligibility_score"),
        status: QueueStatus::parse_str(&status_str)
            .ok_or_else(|| anyhow!("Unknown queue status: {status_str}"))?,
        joined_at: parse_time(row, "joined_at"),
        offer_expires_at: expires.and_then(|t| DateTime::from_timestamp(t, 0)),
    })
}

fn proactive_config_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ProactiveConfig> {
    let days_json: String = row.get("active_days_json");
    let active_days =
        serde_json::from_str(&days_json).context("Failed to parse active days")?;

    Ok(ProactiveConfig {
        user_id: row.get("user_id"),
        agent_id: row.get("agent_id"),
        enabled: row.get::<i32, _>("enabled") != 0,
        quiet_start: row.get("quiet_start"),
        quiet_end: row.get("quiet_end"),
        active_days,
        max_per_day: row.get::<i64, _>("max_per_day") as u32,
        min_hours_between: row.get("min_hours_between"),
        updated_at: parse_time(row, "updated_at"),
    })
}

fn commitment_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Commitment> {
    let due: Option<i64> = row.get("due_at");

    Ok(Commitment {
        id: parse_uuid(row, "id")?,
        user_id: row.get("user_id"),
        agent_id: row.get("agent_id"),
        description: row.get("description"),
        importance: row.get("importance"),
        mentioned_at: parse_time(row, "mentioned_at"),
        due_at: due.and_then(|t| DateTime::from_timestamp(t, 0)),
        attempts: row.get::<i64, _>("attempts") as u32,
        completed: row.get::<i32, _>("completed") != 0,
    })
}

fn life_event_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<LifeEvent> {
    Ok(LifeEvent {
        id: parse_uuid(row, "id")?,
        user_id: row.get("user_id"),
        agent_id: row.get("agent_id"),
        description: row.get("description"),
        happens_at: parse_time(row, "happens_at"),
    })
}

fn special_date_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<SpecialDate> {
    Ok(SpecialDate {
        id: parse_uuid(row, "id")?,
        user_id: row.get("user_id"),
        label: row.get("label"),
        month: row.get::<i64, _>("month") as u32,
        day: row.get::<i64, _>("day") as u32,
    })
}

fn proactive_message_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ProactiveMessage> {
    let kind_str: String = row.get("trigger_kind");

    Ok(ProactiveMessage {
        id: parse_uuid(row, "id")?,
        user_id: row.get("user_id"),
        agent_id: row.get("agent_id"),
        trigger_kind: ProactiveTriggerKind::parse_str(&kind_str)
            .ok_or_else(|| anyhow!("Unknown proactive trigger kind: {kind_str}"))?,
        priority: row.get("priority"),
        reason: row.get("reason"),
        created_at: parse_time(row, "created_at"),
    })
}
