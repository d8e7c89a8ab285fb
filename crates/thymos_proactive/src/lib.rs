//! # Thymos Proactive
//!
//! Agent-initiated outreach. The detector walks every (user, agent) pair,
//! scores the six trigger kinds against store history, and appends a
//! ProactiveMessage row for the best candidate that survives the delivery
//! gates (cooldown, quiet hours, daily cap). Actually sending the message is
//! someone else's job.

pub mod detector;
pub mod presence;

pub use detector::{evaluate_pair, fire_best, scan_all, ScanSummary, TriggerCandidate};
pub use presence::delivery_allowed;
