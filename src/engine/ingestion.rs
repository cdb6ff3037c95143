//! Profile update law applied on every ingested interaction.
//!
//! Everything in here is a pure function over `UserBehaviorProfile` so the
//! same code path serves live ingestion and replay-based rehydration from
//! the durable event log.

use crate::engine::config::EngineConfig;
use crate::engine::error::EngineError;
use crate::engine::types::{
    clamp01, decayed_average, difficulty_bucket, ChallengePreference, EventKind, InteractionEvent,
    ResponseSample, UserBehaviorProfile,
};

/// Structural validation before any state is touched. A malformed event is
/// dropped, never retried.
pub fn validate(event: &InteractionEvent) -> Result<(), EngineError> {
    if event.user_id.trim().is_empty() {
        return Err(EngineError::Validation("userId is required".to_string()));
    }
    if event.session_id.trim().is_empty() {
        return Err(EngineError::Validation("sessionId is required".to_string()));
    }
    Ok(())
}

/// Parse the assessment-response payload out of a `question_answer` event.
/// Other event kinds carry no response sample.
pub fn response_sample(event: &InteractionEvent) -> Option<ResponseSample> {
    if event.event_type != EventKind::QuestionAnswer {
        return None;
    }
    serde_json::from_value(event.event_data.clone()).ok()
}

/// Apply one assessment response to a profile. Mutation order matters: the
/// ring buffer and decayed averages must see events in arrival order.
pub fn apply_response(
    profile: &mut UserBehaviorProfile,
    sample: &ResponseSample,
    config: &EngineConfig,
) {
    let patterns = &mut profile.cognitive_patterns;

    patterns
        .response_time_distribution
        .push_back(sample.response_time);
    while patterns.response_time_distribution.len() > config.response_time_window {
        patterns.response_time_distribution.pop_front();
    }

    let bucket = difficulty_bucket(sample.difficulty);
    let outcome = if sample.is_correct { 1.0 } else { 0.0 };
    let accuracy = patterns.accuracy_by_difficulty.entry(bucket).or_insert(0.0);
    *accuracy = decayed_average(*accuracy, outcome);

    // Asymmetric reinforcement: errors subtract half of what correctness
    // adds, so trying an unfamiliar domain is never heavily punished.
    // The score is a signed, unbounded preference, not a probability.
    let boost = if sample.is_correct {
        config.preference_reward
    } else {
        -config.preference_penalty
    };
    *patterns
        .domain_preferences
        .entry(sample.domain.clone())
        .or_insert(0.0) += boost;

    if sample.hint_used {
        patterns.hint_usage_patterns.frequency += 1.0;
        if let Some(effectiveness) = sample.hint_effectiveness {
            patterns.hint_usage_patterns.effectiveness = clamp01(decayed_average(
                patterns.hint_usage_patterns.effectiveness,
                effectiveness,
            ));
        }
    }

    // One-directional ratchet: only the feedback loop may demote.
    if sample.session_context.overall_accuracy > config.challenge_promotion_accuracy
        && profile.motivational_profile.challenge_preference == ChallengePreference::Gradual
    {
        profile.motivational_profile.challenge_preference = ChallengePreference::Steep;
    }

    if let Some(confidence) = sample.confidence_level {
        let gap = (confidence - outcome).abs();
        profile.metacognitive_awareness.confidence_accuracy = clamp01(decayed_average(
            profile.metacognitive_awareness.confidence_accuracy,
            1.0 - gap,
        ));
    }
}
