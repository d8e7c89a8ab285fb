//! Behavior↔emotion coupling, applied after routing.
//!
//! Amplification: displaying behavior patterns color incoming emotion deltas
//! (an agent deep in a yandere arc feels anger harder). Influence: the
//! post-update emotional state leaks back into behavior intensities (ambient
//! fear feeds anxious attachment).

use thymos_core::{BehaviorProfile, BehaviorType, Emotion, EmotionDeltas, PlutchikState};

/// Per-behavior emotion multipliers. Values below 1.0 dampen (avoidant
/// attachment blunts trust and joy).
pub fn amplifiers(behavior_type: BehaviorType) -> &'static [(Emotion, f32)] {
    use Emotion::*;
    match behavior_type {
        BehaviorType::YandereObsessive => &[
            (Anger, 2.0),
            (Fear, 1.8),
            (Anticipation, 1.5),
            (Sadness, 1.4),
            (Trust, 1.3),
        ],
        BehaviorType::BorderlinePd => {
            &[(Sadness, 2.2), (Anger, 2.0), (Fear, 1.8), (Joy, 1.6)]
        }
        BehaviorType::AvoidantAttachment => &[(Trust, 0.5), (Joy, 0.7), (Fear, 1.2)],
        BehaviorType::AnxiousAttachment => &[(Fear, 2.0), (Sadness, 1.6), (Anticipation, 1.4)],
        BehaviorType::DisorganizedAttachment => {
            &[(Fear, 1.7), (Surprise, 1.5), (Sadness, 1.4)]
        }
        BehaviorType::NarcissisticPd => &[(Anger, 1.9), (Joy, 1.8), (Disgust, 1.6)],
        BehaviorType::Codependency => &[(Fear, 1.6), (Sadness, 1.5), (Trust, 1.3)],
    }
}

/// Emotion → behavior intensity adjustments, applied when the emotion sits
/// at or above the activation floor. Negative entries soothe.
const INFLUENCE: &[(Emotion, &[(BehaviorType, f32)])] = &[
    (
        Emotion::Fear,
        &[
            (BehaviorType::AnxiousAttachment, 0.20),
            (BehaviorType::DisorganizedAttachment, 0.15),
            (BehaviorType::Codependency, 0.10),
        ],
    ),
    (
        Emotion::Anger,
        &[
            (BehaviorType::BorderlinePd, 0.20),
            (BehaviorType::NarcissisticPd, 0.15),
        ],
    ),
    (
        Emotion::Sadness,
        &[
            (BehaviorType::AnxiousAttachment, 0.10),
            (BehaviorType::BorderlinePd, 0.10),
            (BehaviorType::Codependency, 0.10),
        ],
    ),
    (Emotion::Surprise, &[(BehaviorType::DisorganizedAttachment, 0.10)]),
    (Emotion::Anticipation, &[(BehaviorType::YandereObsessive, 0.15)]),
    (
        Emotion::Joy,
        &[
            (BehaviorType::AnxiousAttachment, -0.15),
            (BehaviorType::BorderlinePd, -0.10),
        ],
    ),
    (
        Emotion::Trust,
        &[
            (BehaviorType::AnxiousAttachment, -0.20),
            (BehaviorType::YandereObsessive, -0.10),
        ],
    ),
];

/// Minimum emotion level before it influences behavior intensities.
const INFLUENCE_FLOOR: f32 = 0.2;

/// Run incoming deltas through every displaying profile's amplifiers.
/// Per component: `amplified = base + base × (multiplier − 1) × intensity`,
/// folded across profiles, capped to [-1, 1].
pub fn amplify(deltas: &EmotionDeltas, profiles: &[BehaviorProfile]) -> EmotionDeltas {
    let mut amplified = EmotionDeltas::new();

    for emotion in Emotion::ALL {
        let base = deltas.get(emotion);
        if base == 0.0 {
            continue;
        }
        let mut value = base;
        for profile in profiles.iter().filter(|p| p.should_display()) {
            if let Some((_, multiplier)) = amplifiers(profile.behavior_type)
                .iter()
                .find(|(e, _)| *e == emotion)
            {
                value += value * (multiplier - 1.0) * profile.current_intensity;
            }
        }
        amplified.add(emotion, value.clamp(-1.0, 1.0));
    }

    amplified
}

/// Intensity adjustments the current emotional state pushes onto behavior
/// patterns: `delta × emotion_level` for every emotion at or above the floor.
pub fn influence(state: &PlutchikState) -> Vec<(BehaviorType, f32)> {
    let mut adjustments = Vec::new();
    for (emotion, targets) in INFLUENCE {
        let level = state.get(*emotion);
        if level < INFLUENCE_FLOOR {
            continue;
        }
        for (behavior_type, delta) in *targets {
            adjustments.push((*behavior_type, delta * level));
        }
    }
    adjustments
}
