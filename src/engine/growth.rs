//! Bounded-horizon EIQ growth forecasting from assessment history and the
//! live behavior profile.

use crate::engine::config::EngineConfig;
use crate::engine::types::{
    ChallengePreference, ConfidenceIntervals, EiqPredictionModel, ProjectedGrowth,
    UserBehaviorProfile,
};

const DEFAULT_EIQ: f64 = 100.0;
const TREND_WINDOW: usize = 5;

/// Mean successive delta over the last `TREND_WINDOW` scores, normalized by
/// 100 and floored at zero. Growth is never modeled as negative.
pub fn progression_trend(scores: &[f64]) -> f64 {
    if scores.len() < 2 {
        return 0.0;
    }
    let recent = &scores[scores.len().saturating_sub(TREND_WINDOW)..];
    let deltas: f64 = recent.windows(2).map(|w| w[1] - w[0]).sum();
    let avg_improvement = deltas / (recent.len() - 1) as f64;
    (avg_improvement / 100.0).max(0.0)
}

pub fn current_eiq(scores: &[f64]) -> f64 {
    scores.last().copied().unwrap_or(DEFAULT_EIQ)
}

pub fn build_prediction(
    profile: &UserBehaviorProfile,
    scores: &[f64],
    config: &EngineConfig,
) -> EiqPredictionModel {
    let base_growth = profile.progression_rate;
    let (short, medium, long) = config.growth_multipliers;
    let (lower, upper) = config.confidence_bounds;

    EiqPredictionModel {
        current_eiq: current_eiq(scores),
        projected_growth: ProjectedGrowth {
            short_term: base_growth * short,
            medium_term: base_growth * medium,
            long_term: base_growth * long,
        },
        confidence_intervals: ConfidenceIntervals {
            lower: base_growth * lower,
            upper: base_growth * upper,
        },
        key_growth_factors: growth_factors(profile),
        recommended_interventions: interventions(profile),
    }
}

fn growth_factors(profile: &UserBehaviorProfile) -> Vec<String> {
    let mut factors = Vec::new();

    if profile.metacognitive_awareness.confidence_accuracy > 0.7 {
        factors.push("High metacognitive awareness".to_string());
    }
    if profile.motivational_profile.challenge_preference == ChallengePreference::Steep {
        factors.push("High challenge tolerance".to_string());
    }
    if profile.cognitive_patterns.hint_usage_patterns.effectiveness > 0.7 {
        factors.push("Effective hint utilization".to_string());
    }

    if factors.is_empty() {
        factors.push("Consistent practice patterns".to_string());
    }
    factors
}

fn interventions(profile: &UserBehaviorProfile) -> Vec<String> {
    let mut recommendations = Vec::new();

    if profile.metacognitive_awareness.confidence_accuracy < 0.5 {
        recommendations.push("Focus on self-assessment accuracy training".to_string());
    }
    if profile.cognitive_patterns.fatigue_indicators.performance_decline > 0.3 {
        recommendations.push("Implement shorter, more frequent learning sessions".to_string());
    }
    if profile.motivational_profile.gamification_response > 0.7 {
        recommendations.push("Increase gamification elements in assessments".to_string());
    }

    if recommendations.is_empty() {
        recommendations.push("Continue current learning approach".to_string());
    }
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_is_zero_with_too_little_history() {
        assert_eq!(progression_trend(&[]), 0.0);
        assert_eq!(progression_trend(&[110.0]), 0.0);
    }

    #[test]
    fn trend_uses_last_five_scores_and_floors_at_zero() {
        // Last five: 100 -> 104 average delta = +1/step except computed over
        // successive pairs: (101-100 + 102-101 + 103-102 + 104-103) / 4 = 1.
        let rising = [50.0, 100.0, 101.0, 102.0, 103.0, 104.0];
        assert!((progression_trend(&rising) - 0.01).abs() < 1e-9);

        let falling = [120.0, 115.0, 110.0, 105.0, 100.0];
        assert_eq!(progression_trend(&falling), 0.0);
    }

    #[test]
    fn empty_history_defaults_eiq_to_one_hundred() {
        let profile = UserBehaviorProfile::new("u1");
        let config = EngineConfig::default();
        let model = build_prediction(&profile, &[], &config);
        assert_eq!(model.current_eiq, 100.0);
        assert!((model.projected_growth.short_term - 0.1 * 1.2).abs() < 1e-9);
        assert!((model.projected_growth.medium_term - 0.1 * 2.5).abs() < 1e-9);
        assert!((model.projected_growth.long_term - 0.1 * 4.0).abs() < 1e-9);
        assert!((model.confidence_intervals.lower - 0.08).abs() < 1e-9);
        assert!((model.confidence_intervals.upper - 0.14).abs() < 1e-9);
    }

    #[test]
    fn growth_factors_default_when_no_rule_fires() {
        let profile = UserBehaviorProfile::new("u1");
        assert_eq!(
            growth_factors(&profile),
            vec!["Consistent practice patterns".to_string()]
        );
    }

    #[test]
    fn rules_stack_for_strong_profiles() {
        let mut profile = UserBehaviorProfile::new("u1");
        profile.metacognitive_awareness.confidence_accuracy = 0.8;
        profile.motivational_profile.challenge_preference = ChallengePreference::Steep;
        profile.cognitive_patterns.hint_usage_patterns.effectiveness = 0.8;
        assert_eq!(growth_factors(&profile).len(), 3);
    }

    #[test]
    fn interventions_fire_on_weak_signals() {
        let mut profile = UserBehaviorProfile::new("u1");
        profile.metacognitive_awareness.confidence_accuracy = 0.3;
        profile.cognitive_patterns.fatigue_indicators.performance_decline = 0.5;
        profile.motivational_profile.gamification_response = 0.8;
        let recs = interventions(&profile);
        assert_eq!(recs.len(), 3);
        assert!(recs[0].contains("self-assessment"));
    }

    #[test]
    fn interventions_default_to_continue() {
        let profile = UserBehaviorProfile::new("u1");
        assert_eq!(
            interventions(&profile),
            vec!["Continue current learning approach".to_string()]
        );
    }
}
