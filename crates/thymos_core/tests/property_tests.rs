//! Property-based tests for thymos_core state types.
//!
//! Verifies that emotional state arithmetic, PAD projection, and bond risk
//! classification stay within documented bounds for arbitrary inputs, and
//! that no state method panics on extreme values.

use proptest::prelude::*;
use thymos_core::bond::{BondRisk, DecaySettings};
use thymos_core::pad::PadMood;
use thymos_core::plutchik::{Emotion, EmotionDeltas, PlutchikState, DYAD_ACTIVATION};

// ============================================================================
// Strategies
// ============================================================================

fn arb_plutchik_state() -> impl Strategy<Value = PlutchikState> {
    (
        proptest::array::uniform8(0.0f32..=1.0),
        0.0f32..=1.0,
        0.0f32..=1.0,
    )
        .prop_map(|(values, decay_rate, inertia)| {
            let mut state = PlutchikState::neutral();
            for (emotion, v) in Emotion::ALL.iter().zip(values) {
                state.set(*emotion, v);
            }
            state.decay_rate = decay_rate;
            state.inertia = inertia;
            state
        })
}

fn arb_deltas() -> impl Strategy<Value = EmotionDeltas> {
    proptest::array::uniform8(-2.0f32..=2.0).prop_map(|values| {
        let mut deltas = EmotionDeltas::new();
        for (emotion, v) in Emotion::ALL.iter().zip(values) {
            deltas.add(*emotion, v);
        }
        deltas
    })
}

fn arb_decay_settings() -> impl Strategy<Value = DecaySettings> {
    (1i64..=60, 1i64..=60, 1i64..=60, 1i64..=60).prop_map(|(a, b, c, d)| {
        DecaySettings {
            warning_days: a,
            dormant_days: a + b,
            fragile_days: a + b + c,
            release_days: a + b + c + d,
        }
    })
}

// ============================================================================
// PlutchikState bound properties
// ============================================================================

proptest! {
    /// **Core invariant**: apply_deltas keeps every emotion in [0, 1] and
    /// finite, regardless of starting state and delta magnitude.
    #[test]
    fn apply_deltas_always_in_bounds(state in arb_plutchik_state(), deltas in arb_deltas()) {
        let next = state.apply_deltas(&deltas);
        for emotion in Emotion::ALL {
            let v = next.get(emotion);
            prop_assert!(v.is_finite(), "{} is not finite: {}", emotion.as_str(), v);
            prop_assert!((0.0..=1.0).contains(&v),
                "{} out of range: {} (delta={})", emotion.as_str(), v, deltas.get(emotion));
        }
    }

    /// **Decay pulls toward neutral**: with no deltas, every emotion moves
    /// weakly toward 0.5 and never crosses it.
    #[test]
    fn empty_deltas_never_overshoot_neutral(state in arb_plutchik_state()) {
        let next = state.apply_deltas(&EmotionDeltas::new());
        for emotion in Emotion::ALL {
            let before = state.get(emotion);
            let after = next.get(emotion);
            if before > 0.5 {
                prop_assert!(after <= before && after >= 0.5,
                    "{}: {} decayed to {} (overshoot)", emotion.as_str(), before, after);
            } else if before < 0.5 {
                prop_assert!(after >= before && after <= 0.5,
                    "{}: {} decayed to {} (overshoot)", emotion.as_str(), before, after);
            }
        }
    }

    /// **Inertia dampens**: full inertia means deltas cannot move the state
    /// beyond what decay alone would do.
    #[test]
    fn full_inertia_ignores_deltas(state in arb_plutchik_state(), deltas in arb_deltas()) {
        let mut frozen = state.clone();
        frozen.inertia = 1.0;
        let with_deltas = frozen.apply_deltas(&deltas);
        let without = frozen.apply_deltas(&EmotionDeltas::new());
        for emotion in Emotion::ALL {
            prop_assert!((with_deltas.get(emotion) - without.get(emotion)).abs() < 1e-6);
        }
    }

    /// **Stability bounded**: always within [0, 1] and finite.
    #[test]
    fn stability_bounded(state in arb_plutchik_state()) {
        let s = state.stability();
        prop_assert!(s.is_finite());
        prop_assert!((0.0..=1.0).contains(&s), "stability out of range: {}", s);
    }

    /// **Dyads**: intensity is bounded and both components really are above
    /// the activation floor.
    #[test]
    fn active_dyads_well_formed(state in arb_plutchik_state()) {
        for (dyad, intensity) in state.active_dyads() {
            prop_assert!((0.0..=1.0).contains(&intensity));
            let (a, b) = dyad.components();
            prop_assert!(state.get(a) >= DYAD_ACTIVATION);
            prop_assert!(state.get(b) >= DYAD_ACTIVATION);
        }
    }

    /// **describe** always yields a non-empty summary.
    #[test]
    fn describe_never_empty(state in arb_plutchik_state()) {
        prop_assert!(!state.describe().is_empty());
    }
}

// ============================================================================
// PAD projection properties
// ============================================================================

proptest! {
    /// **PAD ranges**: valence in [-1, 1], arousal and dominance in [0, 1],
    /// all finite, for any valid emotional state.
    #[test]
    fn pad_projection_always_in_bounds(state in arb_plutchik_state()) {
        let mood = PadMood::from_plutchik(&state);
        prop_assert!(mood.valence.is_finite());
        prop_assert!(mood.arousal.is_finite());
        prop_assert!(mood.dominance.is_finite());
        prop_assert!((-1.0..=1.0).contains(&mood.valence), "valence: {}", mood.valence);
        prop_assert!((0.0..=1.0).contains(&mood.arousal), "arousal: {}", mood.arousal);
        prop_assert!((0.0..=1.0).contains(&mood.dominance), "dominance: {}", mood.dominance);
    }

    /// **Valence tracks joy**: raising joy alone never lowers valence.
    #[test]
    fn valence_monotonic_in_joy(
        state in arb_plutchik_state(),
        j1 in 0.0f32..=0.45,
        j2 in 0.55f32..=1.0,
    ) {
        let mut lo = state.clone();
        lo.set(Emotion::Joy, j1);
        let mut hi = state;
        hi.set(Emotion::Joy, j2);

        let mood_lo = PadMood::from_plutchik(&lo);
        let mood_hi = PadMood::from_plutchik(&hi);
        prop_assert!(mood_hi.valence >= mood_lo.valence,
            "joy {} → valence {}, joy {} → valence {} (not monotonic)",
            j1, mood_lo.valence, j2, mood_hi.valence);
    }
}

// ============================================================================
// Bond risk classification properties
// ============================================================================

proptest! {
    /// **Monotonic in elapsed time**: more days away never lowers the risk.
    #[test]
    fn bond_risk_monotonic(settings in arb_decay_settings(), days in 0i64..=400) {
        let today = BondRisk::classify(days, &settings);
        let tomorrow = BondRisk::classify(days + 1, &settings);
        prop_assert!(tomorrow >= today,
            "risk regressed from {:?} to {:?} at day {}", today, tomorrow, days);
    }

    /// **Exact boundaries**: the day a threshold is reached, the phase flips.
    #[test]
    fn bond_risk_boundaries_exact(settings in arb_decay_settings()) {
        prop_assert_eq!(BondRisk::classify(settings.warning_days - 1, &settings), BondRisk::Active);
        prop_assert_eq!(BondRisk::classify(settings.warning_days, &settings), BondRisk::Warned);
        prop_assert_eq!(BondRisk::classify(settings.dormant_days, &settings), BondRisk::Dormant);
        prop_assert_eq!(BondRisk::classify(settings.fragile_days, &settings), BondRisk::Fragile);
        prop_assert_eq!(BondRisk::classify(settings.release_days, &settings), BondRisk::Released);
    }
}
