//! PAD (Pleasure-Arousal-Dominance) mood projection
//!
//! A slow-moving summary of the Plutchik state using Mehrabian's three
//! axes. Valence is signed; arousal and dominance sit in `[0, 1]`.
//! The projection is a fixed linear map so the same state always yields
//! the same mood.

use serde::{Deserialize, Serialize};

use crate::plutchik::{deserialize_safe_f32, sanitize_f32, PlutchikState};

/// Mood as a point in PAD space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PadMood {
    /// Hedonic tone in [-1, 1]. Negative means unpleasant.
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub valence: f32,
    /// Activation level in [0, 1].
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub arousal: f32,
    /// Sense of control in [0, 1].
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub dominance: f32,
}

impl Default for PadMood {
    fn default() -> Self {
        Self {
            valence: 0.0,
            arousal: 0.5,
            dominance: 0.5,
        }
    }
}

impl PadMood {
    pub fn new(valence: f32, arousal: f32, dominance: f32) -> Self {
        Self {
            valence: sanitize_f32(valence, 0.0).clamp(-1.0, 1.0),
            arousal: sanitize_f32(arousal, 0.5).clamp(0.0, 1.0),
            dominance: sanitize_f32(dominance, 0.5).clamp(0.0, 1.0),
        }
    }

    /// Project a Plutchik state onto the PAD axes.
    ///
    /// Positive primaries pull valence up, negative ones pull it down;
    /// high-activation primaries (anger, fear, surprise) raise arousal;
    /// approach emotions (anger, disgust) raise dominance while avoidance
    /// emotions (fear, sadness) lower it.
    pub fn from_plutchik(state: &PlutchikState) -> Self {
        let valence = (0.9 * state.joy + 0.5 * state.trust + 0.3 * state.anticipation
            - 0.9 * state.sadness
            - 0.5 * state.fear
            - 0.5 * state.anger
            - 0.4 * state.disgust)
            / 1.7;

        let arousal = 0.35 + 0.25 * state.anger + 0.22 * state.fear + 0.18 * state.surprise
            + 0.15 * state.anticipation
            + 0.08 * state.joy
            - 0.15 * state.sadness
            - 0.12 * state.trust;

        let dominance = 0.5 + 0.25 * state.anger + 0.15 * state.disgust
            + 0.15 * state.anticipation
            + 0.1 * state.joy
            - 0.3 * state.fear
            - 0.2 * state.sadness
            - 0.1 * state.surprise;

        Self::new(valence, arousal, dominance)
    }

    /// Quadrant label for prompts and logs.
    pub fn describe(&self) -> &'static str {
        match (self.valence >= 0.0, self.arousal >= 0.5) {
            (true, true) => {
                if self.dominance >= 0.5 {
                    "exuberant"
                } else {
                    "dependent"
                }
            }
            (true, false) => {
                if self.dominance >= 0.5 {
                    "relaxed"
                } else {
                    "docile"
                }
            }
            (false, true) => {
                if self.dominance >= 0.5 {
                    "hostile"
                } else {
                    "anxious"
                }
            }
            (false, false) => {
                if self.dominance >= 0.5 {
                    "disdainful"
                } else {
                    "bored"
                }
            }
        }
    }
}
