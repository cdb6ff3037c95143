//! Strategy effectiveness scoring and rule-based profile adaptation,
//! applied by the periodic adaptation pass rather than per event.

use std::collections::HashMap;

use crate::engine::config::EngineConfig;
use crate::engine::types::{decayed_average, ChallengePreference, UserBehaviorProfile};

#[derive(Debug, Clone, PartialEq)]
pub struct EffectivenessMetrics {
    pub needs_adjustment: bool,
    pub effectiveness_score: f64,
    pub rewrite_hint_strategy: bool,
}

pub fn assess(profile: &UserBehaviorProfile, config: &EngineConfig) -> EffectivenessMetrics {
    EffectivenessMetrics {
        needs_adjustment: profile.prediction_accuracy < config.adjustment_threshold,
        effectiveness_score: profile.prediction_accuracy,
        rewrite_hint_strategy: profile.prediction_accuracy < config.hint_rewrite_threshold,
    }
}

/// Mutate a flagged profile toward better-performing strategies. This is the
/// only place the gradual/steep ratchet can be reversed.
pub fn adapt(profile: &mut UserBehaviorProfile, metrics: &EffectivenessMetrics) {
    if !metrics.needs_adjustment {
        return;
    }

    profile.motivational_profile.challenge_preference =
        match profile.motivational_profile.challenge_preference {
            ChallengePreference::Gradual => ChallengePreference::Varied,
            _ => ChallengePreference::Gradual,
        };

    if metrics.rewrite_hint_strategy {
        profile
            .cognitive_patterns
            .hint_usage_patterns
            .preferred_hint_types = vec!["step-by-step".to_string()];
    }
}

/// One (questionId, outcome) observation from a learning record.
#[derive(Debug, Clone)]
pub struct QuestionOutcome {
    pub question_id: String,
    pub is_correct: bool,
}

/// Refold global question-effectiveness ratings over learning-record
/// outcomes, using the same decayed average as per-difficulty accuracy.
pub fn fold_effectiveness(
    ratings: &mut HashMap<String, f64>,
    outcomes: impl IntoIterator<Item = QuestionOutcome>,
) {
    for outcome in outcomes {
        let sample = if outcome.is_correct { 1.0 } else { 0.0 };
        let rating = ratings.entry(outcome.question_id).or_insert(0.5);
        *rating = decayed_average(*rating, sample);
    }
}
