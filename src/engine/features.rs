//! Heuristic feature extraction over raw interaction payloads.
//!
//! These derived features ride along on every AI learning record and drive
//! its confidence score. All of them are cheap deterministic functions of
//! the payload, no model inference involved.

use serde::{Deserialize, Serialize};

use crate::engine::types::InteractionEvent;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedFeatures {
    /// 0-10 engagement estimate.
    pub engagement_score: f64,
    /// 0-1 fraction of questions answered correctly.
    pub learning_velocity: f64,
    pub difficulty_preference: String,
    pub learning_style_signal: String,
    pub behavior_classification: String,
}

impl DerivedFeatures {
    pub fn from_payload(payload: &serde_json::Value) -> Self {
        let time_spent = num(payload, "timeSpent");
        let interaction_count = num(payload, "interactionCount");
        let error_count = num(payload, "errorCount");
        let hints_used = num(payload, "hintsUsed");
        let completion_rate = num(payload, "completionRate");
        let correct = num(payload, "correctAnswers");
        let total = num(payload, "totalQuestions").max(1.0);

        let engagement_score = (time_spent / 180.0 + interaction_count / 10.0).min(10.0);
        let learning_velocity = (correct / total).min(1.0);

        let avg_difficulty = payload
            .get("avgQuestionDifficulty")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.5);
        let difficulty_preference = if avg_difficulty < 0.3 {
            "easy"
        } else if avg_difficulty > 0.7 {
            "challenging"
        } else {
            "moderate"
        };

        let quick_answers = num(payload, "quickAnswers");
        let learning_style_signal = if hints_used > 5.0 {
            "guided"
        } else if time_spent > 3600.0 {
            "thorough"
        } else if quick_answers > 0.8 {
            "fast-paced"
        } else {
            "balanced"
        };

        let behavior_classification = if error_count == 0.0 && completion_rate > 0.9 {
            "high_performer"
        } else if hints_used > 3.0 && time_spent > 1800.0 {
            "struggling_learner"
        } else if interaction_count > 100.0 {
            "engaged_explorer"
        } else {
            "typical_user"
        };

        Self {
            engagement_score,
            learning_velocity,
            difficulty_preference: difficulty_preference.to_string(),
            learning_style_signal: learning_style_signal.to_string(),
            behavior_classification: behavior_classification.to_string(),
        }
    }

    /// Confidence in the analysis: base 0.5, bumped by strong engagement and
    /// velocity signals and a resolved behavior class, capped below 1.
    pub fn confidence(&self) -> f64 {
        let mut confidence: f64 = 0.5;
        if self.engagement_score > 7.0 {
            confidence += 0.2;
        }
        if self.learning_velocity > 0.8 {
            confidence += 0.2;
        }
        if self.behavior_classification != "typical_user" {
            confidence += 0.1;
        }
        confidence.min(0.99)
    }

    pub fn feature_vector(payload: &serde_json::Value) -> Vec<f64> {
        vec![
            num(payload, "timeSpent"),
            num(payload, "interactionCount"),
            num(payload, "errorCount"),
            num(payload, "hintsUsed"),
            num(payload, "completionRate"),
        ]
    }

    pub fn labels(payload: &serde_json::Value) -> Vec<String> {
        let mut labels = Vec::new();
        if payload
            .get("success")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
        {
            labels.push("successful_interaction".to_string());
        }
        if num(payload, "errorCount") > 0.0 {
            labels.push("error_prone".to_string());
        }
        if num(payload, "timeSpent") > 1800.0 {
            labels.push("engaged_learner".to_string());
        }
        if num(payload, "hintsUsed") > 3.0 {
            labels.push("hint_dependent".to_string());
        }
        labels
    }
}

/// Engagement-quality score for a single event, 1-10: base 5, bumped for a
/// fast response, meaningful dwell time and deep scrolling.
pub fn interaction_quality(event: &InteractionEvent) -> f64 {
    let mut quality: f64 = 5.0;

    if event.response_time.is_some_and(|rt| rt < 1000) {
        quality += 2.0;
    }
    if event.time_on_page.is_some_and(|t| t > 30) {
        quality += 1.0;
    }
    if event.scroll_depth.is_some_and(|d| d > 50.0) {
        quality += 1.0;
    }
    let focus = num(&event.event_data, "focusTime");
    let idle = num(&event.event_data, "idleTime");
    if focus > 0.0 && focus > idle {
        quality += 1.0;
    }

    quality.min(10.0)
}

fn num(payload: &serde_json::Value, key: &str) -> f64 {
    payload.get(key).and_then(|v| v.as_f64()).unwrap_or(0.0)
}
