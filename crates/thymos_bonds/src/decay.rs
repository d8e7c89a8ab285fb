//! Inactivity decay scan.
//!
//! Risk is recomputed from elapsed days on every run; `decay_phase` only
//! remembers which notice already went out, so a bond sitting in the same
//! band across runs is not re-notified. Failures are per-bond: one broken
//! row never stops the sweep.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thymos_core::{
    BondLegacy, BondNotification, BondRisk, BondStatus, DecayPhase, DecaySettings,
    NotificationKind, SymbolicBond,
};
use thymos_store::SqliteStore;

use crate::queue;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DecaySummary {
    pub processed: u32,
    pub warned: u32,
    pub dormant: u32,
    pub fragile: u32,
    pub released: u32,
}

/// Sweep every bond past the warning threshold.
#[tracing::instrument(skip_all, fields(now = %now))]
pub async fn scan_all(
    store: &SqliteStore,
    settings: &DecaySettings,
    now: DateTime<Utc>,
) -> Result<DecaySummary> {
    let cutoff = now - Duration::days(settings.warning_days);
    let bonds = store.bonds_inactive_since(cutoff).await?;

    let mut summary = DecaySummary::default();
    for bond in bonds {
        let bond_id = bond.id;
        match scan_one(store, settings, bond, now, &mut summary).await {
            Ok(()) => summary.processed += 1,
            Err(e) => {
                tracing::warn!(bond_id = %bond_id, error = %e, "Decay scan failed for bond, continuing");
            }
        }
    }

    tracing::info!(
        processed = summary.processed,
        warned = summary.warned,
        dormant = summary.dormant,
        fragile = summary.fragile,
        released = summary.released,
        "Bond decay scan complete"
    );
    Ok(summary)
}

async fn scan_one(
    store: &SqliteStore,
    settings: &DecaySettings,
    mut bond: SymbolicBond,
    now: DateTime<Utc>,
    summary: &mut DecaySummary,
) -> Result<()> {
    let days = bond.days_since_last_interaction(now);
    match BondRisk::classify(days, settings) {
        BondRisk::Active => {}
        BondRisk::Warned => {
            let message = format!(
                "Your {} bond has gone quiet for {} days and will become dormant without contact.",
                bond.tier.as_str(),
                days
            );
            if mark(store, &mut bond, BondStatus::Active, DecayPhase::Dormant,
                NotificationKind::DecayWarning, message).await?
            {
                summary.warned += 1;
            }
        }
        BondRisk::Dormant => {
            let message = format!(
                "Your {} bond is now dormant after {} days of silence.",
                bond.tier.as_str(),
                days
            );
            if mark(store, &mut bond, BondStatus::Dormant, DecayPhase::Fragile,
                NotificationKind::BecameDormant, message).await?
            {
                summary.dormant += 1;
            }
        }
        BondRisk::Fragile => {
            let message = format!(
                "Your {} bond is fragile; {} days without contact. Release is near.",
                bond.tier.as_str(),
                days
            );
            if mark(store, &mut bond, BondStatus::Fragile, DecayPhase::Critical,
                NotificationKind::BecameFragile, message).await?
            {
                summary.fragile += 1;
            }
        }
        BondRisk::Released => {
            release(store, &bond, now).await?;
            summary.released += 1;
        }
    }
    Ok(())
}

/// Move the bond one decay notch and notify, unless this notice already
/// went out on an earlier run.
async fn mark(
    store: &SqliteStore,
    bond: &mut SymbolicBond,
    status: BondStatus,
    phase: DecayPhase,
    kind: NotificationKind,
    message: String,
) -> Result<bool> {
    if bond.decay_phase == phase {
        return Ok(false);
    }
    bond.status = status;
    bond.decay_phase = phase;
    store.update_bond(bond).await?;
    store
        .append_notification(&BondNotification::new(
            Some(bond.id),
            &bond.user_id,
            &bond.agent_id,
            kind,
            message,
        ))
        .await?;
    Ok(true)
}

/// Terminal decay: snapshot to a legacy, delete the bond, hand the freed
/// slot to the best queue candidate.
async fn release(store: &SqliteStore, bond: &SymbolicBond, now: DateTime<Utc>) -> Result<()> {
    let legacy = BondLegacy::from_bond(bond, now);
    store.archive_and_delete_bond(bond.id, &legacy).await?;
    store
        .append_notification(&BondNotification::new(
            Some(bond.id),
            &bond.user_id,
            &bond.agent_id,
            NotificationKind::Released,
            format!(
                "Your {} bond was released after {} days of silence. Its legacy is preserved.",
                bond.tier.as_str(),
                bond.days_since_last_interaction(now)
            ),
        ))
        .await?;

    queue::offer_next(store, &bond.agent_id, bond.tier, now).await?;

    tracing::info!(
        bond_id = %bond.id,
        tier = bond.tier.as_str(),
        "Bond released, slot freed"
    );
    Ok(())
}
