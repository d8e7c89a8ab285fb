//! Waiting line for full tiers.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use thymos_core::{BondNotification, BondQueueEntry, BondTier, NotificationKind};
use thymos_store::SqliteStore;

/// How long a freed-slot offer stays open.
pub const OFFER_VALID_HOURS: i64 = 48;

/// Offer a freed slot to the best waiting candidate (highest eligibility,
/// earliest join breaks ties). Returns the candidate, if any.
pub async fn offer_next(
    store: &SqliteStore,
    agent_id: &str,
    tier: BondTier,
    now: DateTime<Utc>,
) -> Result<Option<BondQueueEntry>> {
    let Some(candidate) = store.next_queue_candidate(agent_id, tier).await? else {
        return Ok(None);
    };

    let expires_at = now + Duration::hours(OFFER_VALID_HOURS);
    store.mark_queue_offered(candidate.id, expires_at).await?;
    store
        .append_notification(&BondNotification::new(
            None,
            &candidate.user_id,
            agent_id,
            NotificationKind::SlotOffer,
            format!(
                "A {} slot has opened up. The offer expires in {} hours.",
                tier.as_str(),
                OFFER_VALID_HOURS
            ),
        ))
        .await?;

    tracing::info!(
        user_id = %candidate.user_id,
        agent_id = %agent_id,
        tier = tier.as_str(),
        "Offered freed slot to queue candidate"
    );
    Ok(Some(candidate))
}

/// Expire lapsed offers and pass each slot on to the next candidate.
/// Returns how many offers expired.
pub async fn expire_stale_offers(store: &SqliteStore, now: DateTime<Utc>) -> Result<u32> {
    let stale = store.expire_stale_offers(now).await?;
    let mut expired = 0u32;
    for entry in stale {
        expired += 1;
        tracing::info!(
            user_id = %entry.user_id,
            tier = entry.tier.as_str(),
            "Slot offer expired unanswered"
        );
        if let Err(e) = offer_next(store, &entry.agent_id, entry.tier, now).await {
            tracing::warn!(
                agent_id = %entry.agent_id,
                tier = entry.tier.as_str(),
                error = %e,
                "Failed to re-offer slot, continuing"
            );
        }
    }
    Ok(expired)
}
