//! Tier eligibility and slot claiming.
//!
//! Eligibility is judged before slot availability: an unqualified user is
//! told what is missing even when the tier happens to be full. A full tier
//! turns the attempt into a queue entry ordered by eligibility.

use anyhow::Result;
use chrono::{DateTime, Utc};
use thymos_core::{BondQueueEntry, BondTier, SymbolicBond};
use thymos_store::{SlotClaim, SqliteStore};

use crate::affinity::{affinity_score, AffinityMetrics};
use crate::rarity;

#[derive(Debug, Clone)]
pub struct EstablishRequest {
    pub user_id: String,
    pub agent_id: String,
    pub tier: BondTier,
    pub metrics: AffinityMetrics,
}

#[derive(Debug, Clone)]
pub enum EstablishOutcome {
    Created(SymbolicBond),
    /// Tier full; the user now waits in line.
    Queued(BondQueueEntry),
    /// The pair already holds a bond (one per user↔agent).
    AlreadyBonded(SymbolicBond),
    /// Requirements not met; reasons name each shortfall.
    Ineligible(Vec<String>),
}

pub async fn establish(
    store: &SqliteStore,
    request: &EstablishRequest,
    now: DateTime<Utc>,
) -> Result<EstablishOutcome> {
    if let Some(existing) = store.find_bond(&request.user_id, &request.agent_id).await? {
        return Ok(EstablishOutcome::AlreadyBonded(existing));
    }

    let affinity = affinity_score(&request.metrics);
    let requirements = request.tier.requirements();

    let interactions = store
        .count_messages(&request.agent_id, &request.user_id)
        .await? as u32;
    let relationship_days = match store
        .first_message_at(&request.agent_id, &request.user_id)
        .await?
    {
        Some(first) => (now - first).num_days().max(0),
        None => 0,
    };

    let mut reasons = Vec::new();
    if affinity < requirements.min_affinity {
        reasons.push(format!(
            "affinity {:.0} is below the required {:.0}",
            affinity, requirements.min_affinity
        ));
    }
    if relationship_days < requirements.min_days {
        reasons.push(format!(
            "relationship is {} days old, {} required",
            relationship_days, requirements.min_days
        ));
    }
    if interactions < requirements.min_interactions {
        reasons.push(format!(
            "{} interactions recorded, {} required",
            interactions, requirements.min_interactions
        ));
    }
    if !reasons.is_empty() {
        return Ok(EstablishOutcome::Ineligible(reasons));
    }

    let mut bond = SymbolicBond::new(
        request.user_id.clone(),
        request.agent_id.clone(),
        request.tier,
    );
    bond.started_at = now;
    bond.last_interaction_at = now;
    bond.affinity = affinity;
    bond.shared_experiences = request.metrics.shared_experiences;
    rarity::refresh(store, &mut bond).await?;

    match store.try_claim_slot(&bond).await? {
        SlotClaim::Created => {
            // a queued user who claims their slot leaves the line
            if let Some(entry) = store
                .queue_entry_for(&request.user_id, &request.agent_id, request.tier)
                .await?
            {
                store.delete_queue_entry(entry.id).await?;
            }
            tracing::info!(
                user_id = %request.user_id,
                agent_id = %request.agent_id,
                tier = request.tier.as_str(),
                affinity = bond.affinity,
                rarity = bond.rarity_tier.as_str(),
                "Bond established"
            );
            Ok(EstablishOutcome::Created(bond))
        }
        SlotClaim::TierFull => {
            let entry = BondQueueEntry::new(
                &request.user_id,
                &request.agent_id,
                request.tier,
                affinity / 100.0,
            );
            store.join_queue(&entry).await?;
            tracing::info!(
                user_id = %request.user_id,
                agent_id = %request.agent_id,
                tier = request.tier.as_str(),
                "Tier full, joined queue"
            );
            Ok(EstablishOutcome::Queued(entry))
        }
    }
}
