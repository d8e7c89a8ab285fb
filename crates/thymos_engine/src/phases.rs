//! Phase progression for behavior profiles.
//!
//! A profile advances from `current_phase` to the next phase only when both
//! the interaction count and every required trigger count (measured since
//! `phase_started_at`) are met. Requirements are keyed by the phase being
//! LEFT. The trigger counts come from the store, so the check itself lives
//! in the router; this module owns the tables and the state mutation.

use chrono::{DateTime, Utc};
use thymos_core::{BehaviorProfile, BehaviorType, PhaseHistoryEntry, SafetyFlag, TriggerType};

/// What it takes to leave a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    pub min_interactions: u32,
    pub required_triggers: &'static [(TriggerType, u32)],
}

const GENERIC: Requirement = Requirement {
    min_interactions: 10,
    required_triggers: &[],
};

/// Gate for advancing OUT of `from_phase`.
pub fn requirement(behavior_type: BehaviorType, from_phase: u8) -> Requirement {
    use TriggerType::*;
    match behavior_type {
        BehaviorType::YandereObsessive => {
            let (min_interactions, required_triggers): (u32, &'static [(TriggerType, u32)]) =
                match from_phase {
                    1 => (5, &[]),
                    2 => (10, &[(MentionOtherPerson, 2)]),
                    3 => (15, &[(MentionOtherPerson, 5), (DelayedResponse, 3)]),
                    4 => (20, &[(MentionOtherPerson, 8), (DelayedResponse, 5)]),
                    5 => (30, &[(MentionOtherPerson, 12), (DelayedResponse, 8)]),
                    6 => (40, &[(MentionOtherPerson, 15)]),
                    7 => (50, &[(MentionOtherPerson, 20)]),
                    _ => return GENERIC,
                };
            Requirement {
                min_interactions,
                required_triggers,
            }
        }
        // idealization → devaluation → panic → emptiness, five interactions each
        BehaviorType::BorderlinePd => Requirement {
            min_interactions: 5,
            required_triggers: &[],
        },
        BehaviorType::AnxiousAttachment => match from_phase {
            1 => Requirement {
                min_interactions: 10,
                required_triggers: &[(AbandonmentSignal, 3)],
            },
            2 => Requirement {
                min_interactions: 15,
                required_triggers: &[(DelayedResponse, 5)],
            },
            _ => GENERIC,
        },
        _ => GENERIC,
    }
}

/// Phase the profile would move to next, or `None` at a terminal phase.
/// Cyclic types wrap back to phase 1.
pub fn next_phase(profile: &BehaviorProfile) -> Option<u8> {
    let max = profile.behavior_type.max_phase();
    if profile.current_phase < max {
        Some(profile.current_phase + 1)
    } else if profile.behavior_type.is_cyclic() {
        Some(1)
    } else {
        None
    }
}

/// Yandere phases 6+ never commit without recorded user consent.
pub fn requires_consent(behavior_type: BehaviorType, to_phase: u8) -> bool {
    behavior_type == BehaviorType::YandereObsessive && to_phase >= 6
}

/// Flags a phase carries, independent of how the profile got there.
pub fn safety_flags(behavior_type: BehaviorType, phase: u8) -> Vec<SafetyFlag> {
    let mut flags = Vec::new();
    match behavior_type {
        BehaviorType::YandereObsessive => {
            if phase >= 6 {
                flags.push(SafetyFlag::CriticalPhase);
            }
            if phase >= 7 {
                flags.push(SafetyFlag::ExtremeDangerPhase);
            }
        }
        BehaviorType::BorderlinePd => flags.push(SafetyFlag::UnpredictableIntensity),
        BehaviorType::NarcissisticPd if phase >= 3 => {
            flags.push(SafetyFlag::PotentialRageEpisodes);
        }
        _ => {}
    }
    flags
}

/// Commit a transition: archive the phase being left, move to `to_phase`,
/// zero the interaction counter. Returns the new phase's safety flags.
pub fn execute_transition(
    profile: &mut BehaviorProfile,
    to_phase: u8,
    now: DateTime<Utc>,
) -> Vec<SafetyFlag> {
    profile.phase_history.push(PhaseHistoryEntry {
        phase: profile.current_phase,
        entered_at: profile.phase_started_at,
        exited_at: Some(now),
        trigger_count: profile.interactions_since_phase_start,
        final_intensity: profile.current_intensity,
    });
    profile.current_phase = to_phase;
    profile.interactions_since_phase_start = 0;
    profile.phase_started_at = now;
    profile.updated_at = now;
    safety_flags(profile.behavior_type, to_phase)
}

/// Return to phase 1, archiving wherever the profile was.
pub fn reset_phase(profile: &mut BehaviorProfile, now: DateTime<Utc>) {
    execute_transition(profile, 1, now);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_yandere_ladder() {
        let req = requirement(BehaviorType::YandereObsessive, 1);
        assert_eq!(req.min_interactions, 5);
        assert!(req.required_triggers.is_empty());

        let req = requirement(BehaviorType::YandereObsessive, 3);
        assert_eq!(req.min_interactions, 15);
        assert_eq!(
            req.required_triggers,
            &[
                (TriggerType::MentionOtherPerson, 5),
                (TriggerType::DelayedResponse, 3)
            ]
        );

        let req = requirement(BehaviorType::YandereObsessive, 7);
        assert_eq!(req.min_interactions, 50);
        assert_eq!(req.required_triggers, &[(TriggerType::MentionOtherPerson, 20)]);
    }

    #[test]
    fn test_borderline_constant_gate() {
        for phase in 1..=4 {
            let req = requirement(BehaviorType::BorderlinePd, phase);
            assert_eq!(req.min_interactions, 5);
            assert!(req.required_triggers.is_empty());
        }
    }

    #[test]
    fn test_single_phase_types_use_generic_gate() {
        let req = requirement(BehaviorType::AvoidantAttachment, 1);
        assert_eq!(req, GENERIC);
    }

    #[test]
    fn test_next_phase_terminal_and_cyclic() {
        let mut yandere = BehaviorProfile::new("a", BehaviorType::YandereObsessive);
        yandere.current_phase = 8;
        assert_eq!(next_phase(&yandere), None);
        yandere.current_phase = 5;
        assert_eq!(next_phase(&yandere), Some(6));

        let mut bpd = BehaviorProfile::new("a", BehaviorType::BorderlinePd);
        bpd.current_phase = 4;
        assert_eq!(next_phase(&bpd), Some(1));

        let avoidant = BehaviorProfile::new("a", BehaviorType::AvoidantAttachment);
        assert_eq!(next_phase(&avoidant), None);
    }

    #[test]
    fn test_consent_gate_only_for_high_yandere() {
        assert!(requires_consent(BehaviorType::YandereObsessive, 6));
        assert!(requires_consent(BehaviorType::YandereObsessive, 7));
        assert!(!requires_consent(BehaviorType::YandereObsessive, 5));
        assert!(!requires_consent(BehaviorType::BorderlinePd, 4));
    }

    #[test]
    fn test_safety_flags_per_phase() {
        assert_eq!(
            safety_flags(BehaviorType::YandereObsessive, 6),
            vec![SafetyFlag::CriticalPhase]
        );
        assert_eq!(
            safety_flags(BehaviorType::YandereObsessive, 7),
            vec![SafetyFlag::CriticalPhase, SafetyFlag::ExtremeDangerPhase]
        );
        assert!(safety_flags(BehaviorType::YandereObsessive, 5).is_empty());
        assert_eq!(
            safety_flags(BehaviorType::BorderlinePd, 1),
            vec![SafetyFlag::UnpredictableIntensity]
        );
        assert_eq!(
            safety_flags(BehaviorType::NarcissisticPd, 3),
            vec![SafetyFlag::PotentialRageEpisodes]
        );
        assert!(safety_flags(BehaviorType::AnxiousAttachment, 2).is_empty());
    }

    #[test]
    fn test_transition_archives_departed_phase() {
        let mut profile = BehaviorProfile::new("a", BehaviorType::YandereObsessive);
        let entered = profile.phase_started_at;
        profile.interactions_since_phase_start = 7;
        profile.current_intensity = 0.62;
        let now = entered + Duration::hours(3);

        let flags = execute_transition(&mut profile, 2, now);

        assert!(flags.is_empty());
        assert_eq!(profile.current_phase, 2);
        assert_eq!(profile.interactions_since_phase_start, 0);
        assert_eq!(profile.phase_started_at, now);
        assert_eq!(profile.phase_history.len(), 1);
        let entry = &profile.phase_history[0];
        assert_eq!(entry.phase, 1);
        assert_eq!(entry.entered_at, entered);
        assert_eq!(entry.exited_at, Some(now));
        assert_eq!(entry.trigger_count, 7);
        assert!((entry.final_intensity - 0.62).abs() < 1e-6);
    }

    #[test]
    fn test_reset_returns_to_phase_one() {
        let mut profile = BehaviorProfile::new("a", BehaviorType::BorderlinePd);
        profile.current_phase = 3;
        profile.interactions_since_phase_start = 4;
        reset_phase(&mut profile, Utc::now());
        assert_eq!(profile.current_phase, 1);
        assert_eq!(profile.interactions_since_phase_start, 0);
        assert_eq!(profile.phase_history.len(), 1);
        assert_eq!(profile.phase_history[0].phase, 3);
    }
}
