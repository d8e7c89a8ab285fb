//! Rarity scoring and ranking.
//!
//! Scarcity is the fraction of a tier's slots still free, so bonds claimed
//! while a tier is empty score highest. Unlimited tiers carry no scarcity.

use anyhow::Result;
use thymos_core::{BondTier, RarityTier, SymbolicBond};
use thymos_store::SqliteStore;

pub fn scarcity(tier: BondTier, active_of_tier: u32) -> f32 {
    match tier.slots() {
        Some(slots) => {
            let taken = active_of_tier as f32 / slots.max(1) as f32;
            (1.0 - taken).clamp(0.0, 1.0)
        }
        None => 0.0,
    }
}

/// `0.3·scarcity + 0.25·longevity + 0.25·closeness + 0.2·experiences`,
/// every term saturating at 1.
pub fn rarity_score(bond: &SymbolicBond, active_of_tier: u32) -> f32 {
    let scarcity = scarcity(bond.tier, active_of_tier);
    let longevity = (bond.duration_days.max(0) as f32 / 365.0).min(1.0);
    let closeness = (bond.affinity / 100.0).clamp(0.0, 1.0);
    let experiences = (bond.shared_experiences as f32 / 20.0).min(1.0);

    (0.3 * scarcity + 0.25 * longevity + 0.25 * closeness + 0.2 * experiences).clamp(0.0, 1.0)
}

/// Recompute the bond's rarity score, label and rank against the current
/// same-agent same-tier population. The caller persists the bond.
pub async fn refresh(store: &SqliteStore, bond: &mut SymbolicBond) -> Result<()> {
    let active = store.count_active_tier_bonds(&bond.agent_id, bond.tier).await?;
    bond.rarity_score = rarity_score(bond, active);
    bond.rarity_tier = RarityTier::from_score(bond.rarity_score);
    bond.global_rank = 1 + store
        .count_higher_rarity(&bond.agent_id, bond.tier, bond.rarity_score)
        .await?;
    Ok(())
}
