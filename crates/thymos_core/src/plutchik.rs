//! Emotional state based on Plutchik's Wheel of Emotions
//!
//! Eight primary emotions arranged as four opposite pairs (joy↔sadness,
//! trust↔disgust, fear↔anger, surprise↔anticipation). Adjacent primaries
//! combine into dyads (joy+trust = love). Intensities are continuous in
//! `[0, 1]` rather than discrete labels, which lets the fast path nudge
//! the state deterministically and the deep path merge LLM appraisals
//! through the same arithmetic.

use serde::{Deserialize, Serialize};

/// Guard against NaN and Infinity in state values.
/// If the value is NaN or Inf, replace with the provided fallback (homeostatic default).
#[inline]
pub fn sanitize_f32(v: f32, fallback: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        tracing::warn!("NaN/Inf detected in state, resetting to fallback {}", fallback);
        fallback
    }
}

/// Serde helper: non-finite floats deserialize to 0.0 instead of poisoning state.
pub fn deserialize_safe_f32<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = f32::deserialize(deserializer)?;
    Ok(if v.is_finite() { v } else { 0.0 })
}

/// The eight Plutchik primaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Joy,
    Trust,
    Fear,
    Surprise,
    Sadness,
    Disgust,
    Anger,
    Anticipation,
}

impl Emotion {
    pub const ALL: [Emotion; 8] = [
        Emotion::Joy,
        Emotion::Trust,
        Emotion::Fear,
        Emotion::Surprise,
        Emotion::Sadness,
        Emotion::Disgust,
        Emotion::Anger,
        Emotion::Anticipation,
    ];

    /// The opposite primary on the wheel.
    pub fn opposite(&self) -> Emotion {
        match self {
            Emotion::Joy => Emotion::Sadness,
            Emotion::Sadness => Emotion::Joy,
            Emotion::Trust => Emotion::Disgust,
            Emotion::Disgust => Emotion::Trust,
            Emotion::Fear => Emotion::Anger,
            Emotion::Anger => Emotion::Fear,
            Emotion::Surprise => Emotion::Anticipation,
            Emotion::Anticipation => Emotion::Surprise,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Joy => "joy",
            Emotion::Trust => "trust",
            Emotion::Fear => "fear",
            Emotion::Surprise => "surprise",
            Emotion::Sadness => "sadness",
            Emotion::Disgust => "disgust",
            Emotion::Anger => "anger",
            Emotion::Anticipation => "anticipation",
        }
    }
}

/// Per-emotion deltas accumulated by message analysis or an LLM appraisal.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EmotionDeltas([f32; 8]);

impl EmotionDeltas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, emotion: Emotion, delta: f32) {
        self.0[emotion as usize] += sanitize_f32(delta, 0.0);
    }

    pub fn get(&self, emotion: Emotion) -> f32 {
        self.0[emotion as usize]
    }

    /// True when no emotion received any contribution.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|d| *d == 0.0)
    }
}

/// Compound emotions from adjacent primaries on the wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dyad {
    Love,           // joy + trust
    Submission,     // trust + fear
    Awe,            // fear + surprise
    Disapproval,    // surprise + sadness
    Remorse,        // sadness + disgust
    Contempt,       // disgust + anger
    Aggressiveness, // anger + anticipation
    Optimism,       // anticipation + joy
}

impl Dyad {
    pub const ALL: [Dyad; 8] = [
        Dyad::Love,
        Dyad::Submission,
        Dyad::Awe,
        Dyad::Disapproval,
        Dyad::Remorse,
        Dyad::Contempt,
        Dyad::Aggressiveness,
        Dyad::Optimism,
    ];

    /// The two primaries that form this dyad.
    pub fn components(&self) -> (Emotion, Emotion) {
        match self {
            Dyad::Love => (Emotion::Joy, Emotion::Trust),
            Dyad::Submission => (Emotion::Trust, Emotion::Fear),
            Dyad::Awe => (Emotion::Fear, Emotion::Surprise),
            Dyad::Disapproval => (Emotion::Surprise, Emotion::Sadness),
            Dyad::Remorse => (Emotion::Sadness, Emotion::Disgust),
            Dyad::Contempt => (Emotion::Disgust, Emotion::Anger),
            Dyad::Aggressiveness => (Emotion::Anger, Emotion::Anticipation),
            Dyad::Optimism => (Emotion::Anticipation, Emotion::Joy),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dyad::Love => "love",
            Dyad::Submission => "submission",
            Dyad::Awe => "awe",
            Dyad::Disapproval => "disapproval",
            Dyad::Remorse => "remorse",
            Dyad::Contempt => "contempt",
            Dyad::Aggressiveness => "aggressiveness",
            Dyad::Optimism => "optimism",
        }
    }
}

/// Both components must be at least this strong for a dyad to register.
pub const DYAD_ACTIVATION: f32 = 0.25;

/// Full emotional state of one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlutchikState {
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub joy: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub trust: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub fear: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub surprise: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub sadness: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub disgust: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub anger: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub anticipation: f32,

    /// How fast emotions relax toward neutral (0.5) per update.
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub decay_rate: f32,
    /// Resistance to incoming deltas: effective delta = delta * (1 - inertia).
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub inertia: f32,

    /// Unix timestamp of last state update
    pub last_updated: i64,
}

impl Default for PlutchikState {
    fn default() -> Self {
        Self {
            joy: 0.5,          // Mildly content baseline
            trust: 0.5,        // Open but not naive
            fear: 0.2,         // Low background caution
            surprise: 0.1,     // Nothing unexpected yet
            sadness: 0.2,      // Faint melancholy floor
            disgust: 0.1,      // Low
            anger: 0.1,        // Low
            anticipation: 0.4, // Mild forward-looking interest
            decay_rate: 0.05,
            inertia: 0.3,
            last_updated: chrono::Utc::now().timestamp(),
        }
    }
}

impl PlutchikState {
    /// The neutral baseline every agent starts from.
    pub fn neutral() -> Self {
        Self::default()
    }

    pub fn get(&self, emotion: Emotion) -> f32 {
        match emotion {
            Emotion::Joy => self.joy,
            Emotion::Trust => self.trust,
            Emotion::Fear => self.fear,
            Emotion::Surprise => self.surprise,
            Emotion::Sadness => self.sadness,
            Emotion::Disgust => self.disgust,
            Emotion::Anger => self.anger,
            Emotion::Anticipation => self.anticipation,
        }
    }

    pub fn set(&mut self, emotion: Emotion, value: f32) {
        let value = sanitize_f32(value, 0.5).clamp(0.0, 1.0);
        match emotion {
            Emotion::Joy => self.joy = value,
            Emotion::Trust => self.trust = value,
            Emotion::Fear => self.fear = value,
            Emotion::Surprise => self.surprise = value,
            Emotion::Sadness => self.sadness = value,
            Emotion::Disgust => self.disgust = value,
            Emotion::Anger => self.anger = value,
            Emotion::Anticipation => self.anticipation = value,
        }
    }

    /// Clamp all fields back into their valid ranges. Call after any
    /// bulk mutation or deserialization from an untrusted source.
    pub fn normalize(&mut self) {
        for emotion in Emotion::ALL {
            self.set(emotion, self.get(emotion));
        }
        self.decay_rate = sanitize_f32(self.decay_rate, 0.05).clamp(0.0, 1.0);
        self.inertia = sanitize_f32(self.inertia, 0.3).clamp(0.0, 1.0);
    }

    /// Apply analysis deltas on top of passive decay toward neutral.
    ///
    /// Order matters: decay first (so a fresh stimulus is not immediately
    /// eroded), then the delta scaled by `(1 - inertia)`, then clamp.
    pub fn apply_deltas(&self, deltas: &EmotionDeltas) -> Self {
        let mut next = self.clone();
        let gain = 1.0 - self.inertia.clamp(0.0, 1.0);

        for emotion in Emotion::ALL {
            let current = self.get(emotion);
            let decayed = current + (0.5 - current) * self.decay_rate;
            let value = decayed + deltas.get(emotion) * gain;
            next.set(emotion, value);
        }

        next.last_updated = chrono::Utc::now().timestamp();
        next
    }

    /// The strongest primary right now.
    pub fn dominant(&self) -> (Emotion, f32) {
        let mut best = (Emotion::Joy, self.joy);
        for emotion in Emotion::ALL {
            let v = self.get(emotion);
            if v > best.1 {
                best = (emotion, v);
            }
        }
        best
    }

    /// Primaries above `threshold`, strongest first, at most `limit`.
    pub fn top_emotions(&self, threshold: f32, limit: usize) -> Vec<(Emotion, f32)> {
        let mut hits: Vec<(Emotion, f32)> = Emotion::ALL
            .iter()
            .map(|e| (*e, self.get(*e)))
            .filter(|(_, v)| *v > threshold)
            .collect();
        hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        hits
    }

    /// Dyads whose both components are at least `DYAD_ACTIVATION`.
    /// Intensity is the mean of the two components.
    pub fn active_dyads(&self) -> Vec<(Dyad, f32)> {
        let mut dyads = Vec::new();
        for dyad in Dyad::ALL {
            let (a, b) = dyad.components();
            let (va, vb) = (self.get(a), self.get(b));
            if va >= DYAD_ACTIVATION && vb >= DYAD_ACTIVATION {
                dyads.push((dyad, (va + vb) / 2.0));
            }
        }
        dyads.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        dyads
    }

    pub fn dominant_dyad(&self) -> Option<(Dyad, f32)> {
        self.active_dyads().into_iter().next()
    }

    /// Stability in [0, 1]: 1.0 at perfect neutrality, 0.0 at full polarization.
    pub fn stability(&self) -> f32 {
        let deviation: f32 = Emotion::ALL
            .iter()
            .map(|e| (self.get(*e) - 0.5).abs())
            .sum::<f32>()
            / Emotion::ALL.len() as f32;
        (1.0 - 2.0 * deviation).clamp(0.0, 1.0)
    }

    /// Natural language summary for LLM context injection.
    pub fn describe(&self) -> String {
        let (dominant, intensity) = self.dominant();
        let strength = if intensity < 0.3 {
            "faint"
        } else if intensity < 0.6 {
            "moderate"
        } else if intensity < 0.8 {
            "strong"
        } else {
            "overwhelming"
        };

        match self.dominant_dyad() {
            Some((dyad, _)) => format!(
                "{} {} with an undercurrent of {}",
                strength,
                dominant.as_str(),
                dyad.as_str()
            ),
            None => format!("{} {}", strength, dominant.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_baseline() {
        let state = PlutchikState::neutral();
        assert_eq!(state.joy, 0.5);
        assert_eq!(state.trust, 0.5);
        assert_eq!(state.fear, 0.2);
        assert_eq!(state.anticipation, 0.4);
    }

    #[test]
    fn test_opposites_are_symmetric() {
        for emotion in Emotion::ALL {
            assert_eq!(emotion.opposite().opposite(), emotion);
        }
    }

    #[test]
    fn test_apply_positive_delta() {
        let state = PlutchikState::neutral();
        let mut deltas = EmotionDeltas::new();
        deltas.add(Emotion::Joy, 0.2);

        let next = state.apply_deltas(&deltas);
        assert!(next.joy > state.joy);
    }

    #[test]
    fn test_apply_negative_delta() {
        let state = PlutchikState::neutral();
        let mut deltas = EmotionDeltas::new();
        deltas.add(Emotion::Sadness, -0.1);

        let next = state.apply_deltas(&deltas);
        assert!(next.sadness < state.sadness);
    }

    #[test]
    fn test_empty_deltas_decay_toward_neutral() {
        let mut state = PlutchikState::neutral();
        state.joy = 0.9;
        state.sadness = 0.3;
        state.decay_rate = 0.1;
        state.inertia = 0.0;

        let next = state.apply_deltas(&EmotionDeltas::new());
        assert!(next.joy < 0.9);
        assert!(next.joy > 0.5);
        assert!(next.sadness > 0.3);
    }

    #[test]
    fn test_inertia_dampens_deltas() {
        let mut low = PlutchikState::neutral();
        low.inertia = 0.1;
        let mut high = PlutchikState::neutral();
        high.inertia = 0.8;

        let mut deltas = EmotionDeltas::new();
        deltas.add(Emotion::Joy, 0.4);

        let next_low = low.apply_deltas(&deltas);
        let next_high = high.apply_deltas(&deltas);
        assert!(next_low.joy > next_high.joy);
    }

    #[test]
    fn test_apply_deltas_clamps() {
        let mut state = PlutchikState::neutral();
        state.inertia = 0.0;
        let mut deltas = EmotionDeltas::new();
        deltas.add(Emotion::Joy, 5.0);
        deltas.add(Emotion::Sadness, -5.0);

        let next = state.apply_deltas(&deltas);
        assert_eq!(next.joy, 1.0);
        assert_eq!(next.sadness, 0.0);
    }

    #[test]
    fn test_dominant_dyad_love() {
        let mut state = PlutchikState::neutral();
        state.joy = 0.9;
        state.trust = 0.8;

        let (dyad, intensity) = state.dominant_dyad().unwrap();
        assert_eq!(dyad, Dyad::Love);
        assert!((intensity - 0.85).abs() < 1e-6);
    }

    #[test]
    fn test_dyad_requires_both_components() {
        let mut state = PlutchikState::neutral();
        // Zero out everything, then raise only anger: no dyad should fire.
        for e in Emotion::ALL {
            state.set(e, 0.0);
        }
        state.anger = 0.9;

        assert!(state.active_dyads().is_empty());
    }

    #[test]
    fn test_stability_extremes() {
        let mut flat = PlutchikState::neutral();
        for e in Emotion::ALL {
            flat.set(e, 0.5);
        }
        assert!((flat.stability() - 1.0).abs() < 1e-6);

        let mut polarized = PlutchikState::neutral();
        for e in Emotion::ALL {
            polarized.set(e, 1.0);
        }
        assert!(polarized.stability() < 0.01);
    }

    #[test]
    fn test_set_sanitizes_nan() {
        let mut state = PlutchikState::neutral();
        state.set(Emotion::Joy, f32::NAN);
        assert!(state.joy.is_finite());
    }

    #[test]
    fn test_top_emotions_ordering() {
        let mut state = PlutchikState::neutral();
        state.anger = 0.9;
        state.fear = 0.7;

        let top = state.top_emotions(0.5, 3);
        assert_eq!(top[0].0, Emotion::Anger);
        assert_eq!(top[1].0, Emotion::Fear);
    }

    #[test]
    fn test_json_roundtrip() {
        let state = PlutchikState::neutral();
        let json = serde_json::to_string(&state).unwrap();
        let restored: PlutchikState = serde_json::from_str(&json).unwrap();
        assert!((restored.joy - state.joy).abs() < 1e-6);
        assert!((restored.anticipation - state.anticipation).abs() < 1e-6);
    }
}
