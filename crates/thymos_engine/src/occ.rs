//! OCC appraisal vocabulary → Plutchik deltas.
//!
//! The deep path's LLM names emotions from a fixed appraisal vocabulary; this
//! table translates each into weighted contributions on the eight primaries.
//! Negative weights subtract (relief discharges anticipation, boredom kills
//! it). Unknown names are logged and skipped so a drifting LLM cannot inject
//! arbitrary state.

use thymos_core::{Emotion, EmotionDeltas};
use thymos_reasoning::AppraisedEmotion;

use Emotion::*;

/// Fixed mapping rules: OCC name → weighted Plutchik components.
pub const OCC_RULES: &[(&str, &[(Emotion, f32)])] = &[
    ("joy", &[(Joy, 1.0)]),
    ("distress", &[(Sadness, 0.8), (Fear, 0.3)]),
    ("hope", &[(Anticipation, 0.8), (Joy, 0.4)]),
    ("fear", &[(Fear, 1.0)]),
    ("satisfaction", &[(Joy, 0.7), (Trust, 0.4)]),
    ("disappointment", &[(Sadness, 0.7), (Surprise, 0.5)]),
    ("relief", &[(Joy, 0.6), (Trust, 0.3), (Anticipation, -0.4)]),
    ("fears_confirmed", &[(Fear, 0.8), (Sadness, 0.6), (Surprise, 0.3)]),
    ("happy_for", &[(Joy, 0.6), (Trust, 0.5)]),
    ("resentment", &[(Anger, 0.7), (Sadness, 0.4), (Disgust, 0.3)]),
    ("pity", &[(Sadness, 0.6), (Trust, 0.4), (Fear, 0.3)]),
    ("gloating", &[(Joy, 0.5), (Disgust, 0.6), (Anticipation, 0.3)]),
    ("pride", &[(Joy, 0.7), (Trust, 0.5), (Anticipation, 0.4)]),
    ("shame", &[(Sadness, 0.7), (Disgust, 0.6), (Fear, 0.5)]),
    ("admiration", &[(Trust, 0.8), (Joy, 0.4), (Surprise, 0.3)]),
    ("reproach", &[(Disgust, 0.7), (Anger, 0.5)]),
    ("gratitude", &[(Joy, 0.7), (Trust, 0.8)]),
    ("anger", &[(Anger, 1.0)]),
    ("liking", &[(Joy, 0.5), (Trust, 0.4)]),
    ("disliking", &[(Disgust, 0.7)]),
    ("interest", &[(Anticipation, 0.6), (Surprise, 0.3)]),
    ("curiosity", &[(Surprise, 0.6), (Trust, 0.5)]),
    ("affection", &[(Joy, 0.6), (Trust, 0.7)]),
    ("love", &[(Joy, 0.8), (Trust, 0.9)]),
    ("anxiety", &[(Fear, 0.7), (Anticipation, 0.6)]),
    ("concern", &[(Fear, 0.5), (Trust, 0.4), (Sadness, 0.3)]),
    ("boredom", &[(Disgust, 0.4), (Sadness, 0.3), (Anticipation, -0.3)]),
    ("excitement", &[(Joy, 0.8), (Anticipation, 0.7), (Surprise, 0.4)]),
];

/// The appraisal vocabulary, in table order. Fed to the deep-path prompt.
pub fn vocabulary() -> Vec<&'static str> {
    OCC_RULES.iter().map(|(name, _)| *name).collect()
}

fn components_for(name: &str) -> Option<&'static [(Emotion, f32)]> {
    OCC_RULES
        .iter()
        .find(|(rule_name, _)| *rule_name == name)
        .map(|(_, components)| *components)
}

/// Translate an appraisal into Plutchik deltas: each emotion of intensity `i`
/// contributes `i × weight` per listed component, summed across the appraisal.
pub fn map_appraisal(appraised: &[AppraisedEmotion]) -> EmotionDeltas {
    let mut deltas = EmotionDeltas::new();
    for emotion in appraised {
        match components_for(&emotion.name) {
            Some(components) => {
                for (primary, weight) in components {
                    deltas.add(*primary, emotion.intensity * weight);
                }
            }
            None => {
                tracing::warn!("Unknown appraisal emotion '{}', skipping", emotion.name);
            }
        }
    }
    deltas
}
