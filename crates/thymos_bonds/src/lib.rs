//! # Thymos Bonds
//!
//! Scarce-slot relationship management: tier eligibility and slot claiming,
//! affinity and rarity scoring, the inactivity decay scan, and the waiting
//! queue for full tiers. Everything operates on store rows; the scheduler in
//! the CLI decides when scans run.

pub mod affinity;
pub mod decay;
pub mod queue;
pub mod rarity;
pub mod tiers;

pub use affinity::{affinity_score, AffinityMetrics};
pub use decay::{scan_all, DecaySummary};
pub use tiers::{establish, EstablishOutcome, EstablishRequest};
