use crate::config::env_or;

/// Tunable constants for the behavioral core.
///
/// Defaults match the platform's production values; every field can be
/// overridden through the environment for experiments.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Capacity of the per-user response-time ring buffer.
    pub response_time_window: usize,
    /// Accumulated learning records per user before a retraining signal fires.
    pub retraining_threshold: i64,
    /// Session accuracy above which a "gradual" learner is promoted to "steep".
    pub challenge_promotion_accuracy: f64,
    /// Prediction accuracy below which the feedback loop adjusts a profile.
    pub adjustment_threshold: f64,
    /// Prediction accuracy below which hint strategy is also rewritten.
    pub hint_rewrite_threshold: f64,
    /// Domain preference reinforcement for a correct answer.
    pub preference_reward: f64,
    /// Domain preference penalty for an incorrect answer (smaller than the
    /// reward so exploration is not punished).
    pub preference_penalty: f64,
    /// Growth projection multipliers: short / medium / long term.
    pub growth_multipliers: (f64, f64, f64),
    /// Confidence interval multipliers around the progression rate.
    pub confidence_bounds: (f64, f64),
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            response_time_window: 100,
            retraining_threshold: 50,
            challenge_promotion_accuracy: 0.8,
            adjustment_threshold: 0.6,
            hint_rewrite_threshold: 0.5,
            preference_reward: 0.1,
            preference_penalty: 0.05,
            growth_multipliers: (1.2, 2.5, 4.0),
            confidence_bounds: (0.8, 1.4),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            response_time_window: env_or("ENGINE_RESPONSE_TIME_WINDOW", defaults.response_time_window),
            retraining_threshold: env_or("ENGINE_RETRAINING_THRESHOLD", defaults.retraining_threshold),
            challenge_promotion_accuracy: env_or(
                "ENGINE_CHALLENGE_PROMOTION_ACCURACY",
                defaults.challenge_promotion_accuracy,
            ),
            adjustment_threshold: env_or("ENGINE_ADJUSTMENT_THRESHOLD", defaults.adjustment_threshold),
            ..defaults
        }
    }
}
