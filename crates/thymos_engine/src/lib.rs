//! # Thymos Engine
//!
//! The per-message pipeline: a user message comes in, gets scored for
//! complexity, takes either the deterministic fast path or the LLM-appraisal
//! deep path to an emotional-state update, then runs behavior trigger
//! detection, phase gating, and the behavior↔emotion coupling. Everything is
//! loaded fresh from the store and written back inside a per-agent lock.

pub mod complexity;
pub mod coupling;
pub mod emotions;
pub mod intensity;
pub mod occ;
pub mod phases;
pub mod router;
pub mod triggers;

pub use complexity::{ComplexityReport, ProcessingPath};
pub use router::{Engine, PhaseChange, ProcessOutcome};
pub use triggers::DetectedTrigger;
