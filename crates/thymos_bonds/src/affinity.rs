//! Composite closeness score, 0–100.

use serde::{Deserialize, Serialize};
use thymos_core::sanitize_f32;

/// Relationship qualities feeding the affinity score, each in [0, 1]
/// except the raw experience count.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AffinityMetrics {
    pub message_quality: f32,
    pub consistency: f32,
    pub mutual_disclosure: f32,
    pub emotional_resonance: f32,
    pub shared_experiences: u32,
}

/// Weighted affinity: resonance and quality dominate, shared experiences
/// saturate at ten.
pub fn affinity_score(metrics: &AffinityMetrics) -> f32 {
    let quality = sanitize_f32(metrics.message_quality, 0.0).clamp(0.0, 1.0);
    let consistency = sanitize_f32(metrics.consistency, 0.0).clamp(0.0, 1.0);
    let disclosure = sanitize_f32(metrics.mutual_disclosure, 0.0).clamp(0.0, 1.0);
    let resonance = sanitize_f32(metrics.emotional_resonance, 0.0).clamp(0.0, 1.0);
    let experiences = (metrics.shared_experiences as f32 / 10.0).min(1.0);

    let score = 25.0 * quality
        + 20.0 * consistency
        + 20.0 * disclosure
        + 25.0 * resonance
        + 10.0 * experiences;
    score.clamp(0.0, 100.0)
}
