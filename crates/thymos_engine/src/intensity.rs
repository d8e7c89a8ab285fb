//! Intensity dynamics: how trigger events move a profile's intensity and how
//! it relaxes back toward baseline between events.

use chrono::{DateTime, Utc};
use rand::Rng;
use thymos_core::{sanitize_f32, BehaviorProfile, BehaviorType, TriggerType};

/// Base weight per trigger type. Reassurance is the one de-escalating
/// trigger; delayed_response is a placeholder overridden by the elapsed-time
/// thresholds in [`crate::triggers::detect_delayed`].
pub fn base_weight(trigger_type: TriggerType) -> f32 {
    match trigger_type {
        TriggerType::AbandonmentSignal => 0.7,
        TriggerType::DelayedResponse => 0.5,
        TriggerType::Criticism => 0.8,
        TriggerType::MentionOtherPerson => 0.65,
        TriggerType::BoundaryAssertion => 0.75,
        TriggerType::Reassurance => -0.3,
        TriggerType::ExplicitRejection => 1.0,
    }
}

/// Which behavior patterns a trigger type touches.
pub fn affected_behaviors(trigger_type: TriggerType) -> &'static [BehaviorType] {
    use BehaviorType::*;
    match trigger_type {
        TriggerType::AbandonmentSignal => &[
            AnxiousAttachment,
            DisorganizedAttachment,
            BorderlinePd,
            YandereObsessive,
            Codependency,
        ],
        TriggerType::DelayedResponse => &[
            AnxiousAttachment,
            DisorganizedAttachment,
            BorderlinePd,
            YandereObsessive,
        ],
        TriggerType::Criticism => &[NarcissisticPd, BorderlinePd, AvoidantAttachment],
        TriggerType::MentionOtherPerson => &[YandereObsessive, NarcissisticPd, BorderlinePd],
        TriggerType::BoundaryAssertion => &[YandereObsessive, NarcissisticPd, Codependency],
        TriggerType::Reassurance => &[
            AnxiousAttachment,
            DisorganizedAttachment,
            BorderlinePd,
            YandereObsessive,
        ],
        TriggerType::ExplicitRejection => &[
            AnxiousAttachment,
            AvoidantAttachment,
            DisorganizedAttachment,
            BorderlinePd,
            NarcissisticPd,
            YandereObsessive,
            Codependency,
        ],
    }
}

/// Whether `trigger_type` applies to `behavior_type`.
pub fn applies_to(trigger_type: TriggerType, behavior_type: BehaviorType) -> bool {
    affected_behaviors(trigger_type).contains(&behavior_type)
}

/// Apply one trigger to a profile's intensity:
/// `delta = escalation_rate × weight × confidence`, plus a bounded random
/// jitter of `±volatility × 0.1`. Negative weights de-escalate through the
/// same formula. Result clamped to [0, 1].
pub fn apply_trigger<R: Rng>(
    profile: &mut BehaviorProfile,
    weight: f32,
    confidence: f32,
    rng: &mut R,
) {
    let weight = sanitize_f32(weight, 0.0).clamp(-1.0, 1.0);
    let confidence = sanitize_f32(confidence, 0.5).clamp(0.0, 1.0);

    let delta = profile.escalation_rate * weight * confidence;
    let jitter_bound = profile.volatility * 0.1;
    let jitter = if jitter_bound > 0.0 {
        rng.gen_range(-jitter_bound..=jitter_bound)
    } else {
        0.0
    };

    profile.current_intensity =
        sanitize_f32(profile.current_intensity + delta + jitter, profile.base_intensity)
            .clamp(0.0, 1.0);
}

/// Relax intensity toward `base_intensity` for the time elapsed since the
/// profile was last touched: exponential with `de_escalation_rate` per hour,
/// so it approaches baseline asymptotically and can never overshoot it.
/// Stamps `updated_at` so a second call in the same instant is a no-op.
pub fn relax(profile: &mut BehaviorProfile, now: DateTime<Utc>) {
    let elapsed_ms = (now - profile.updated_at).num_milliseconds();
    if elapsed_ms <= 0 {
        return;
    }
    let hours = elapsed_ms as f32 / 3_600_000.0;
    let factor = (-profile.de_escalation_rate * hours).exp();
    let relaxed =
        profile.base_intensity + (profile.current_intensity - profile.base_intensity) * factor;

    profile.current_intensity = sanitize_f32(relaxed, profile.base_intensity).clamp(0.0, 1.0);
    profile.updated_at = now;
}
