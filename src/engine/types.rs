#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

/// The smoothing law used everywhere incremental estimates are updated:
/// per-difficulty accuracy, confidence-accuracy, question effectiveness.
///
/// `(prev + sample) / 2` is an exponential-decay average with decay constant
/// 0.5 — recent observations always carry half the weight, so the estimate
/// tracks current behavior instead of the lifetime mean.
pub fn decayed_average(prev: f64, sample: f64) -> f64 {
    (prev + sample) / 2.0
}

pub fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Difficulty values arrive as free floats; accuracy is tracked per rounded
/// bucket so nearby difficulties share one rolling estimate.
pub fn difficulty_bucket(difficulty: f64) -> i32 {
    difficulty.round() as i32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PageView,
    ButtonClick,
    FormSubmit,
    AssessmentStart,
    HintRequest,
    QuestionAnswer,
    Error,
    Completion,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PageView => "page_view",
            Self::ButtonClick => "button_click",
            Self::FormSubmit => "form_submit",
            Self::AssessmentStart => "assessment_start",
            Self::HintRequest => "hint_request",
            Self::QuestionAnswer => "question_answer",
            Self::Error => "error",
            Self::Completion => "completion",
        }
    }

    /// Kinds that additionally produce an AI learning record.
    pub fn feeds_learning(&self) -> bool {
        matches!(
            self,
            Self::AssessmentStart | Self::QuestionAnswer | Self::Completion
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LearningStyle {
    Visual,
    Auditory,
    Kinesthetic,
    Reading,
    #[default]
    Mixed,
}

impl LearningStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visual => "visual",
            Self::Auditory => "auditory",
            Self::Kinesthetic => "kinesthetic",
            Self::Reading => "reading",
            Self::Mixed => "mixed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChallengePreference {
    #[default]
    Gradual,
    Steep,
    Varied,
}

impl ChallengePreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gradual => "gradual",
            Self::Steep => "steep",
            Self::Varied => "varied",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyProgression {
    Linear,
    Exponential,
    AdaptiveSpiral,
}

impl DifficultyProgression {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Exponential => "exponential",
            Self::AdaptiveSpiral => "adaptive_spiral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextualFraming {
    AnalyticalFramework,
    GamifiedScenario,
    PracticalApplication,
}

impl ContextualFraming {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnalyticalFramework => "analytical_framework",
            Self::GamifiedScenario => "gamified_scenario",
            Self::PracticalApplication => "practical_application",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningDataType {
    UserInteraction,
    AssessmentResponse,
    LearningOutcome,
    BehaviorPattern,
}

impl LearningDataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserInteraction => "user_interaction",
            Self::AssessmentResponse => "assessment_response",
            Self::LearningOutcome => "learning_outcome",
            Self::BehaviorPattern => "behavior_pattern",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    #[default]
    Pending,
    Validated,
    Rejected,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Validated => "validated",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "validated" => Some(Self::Validated),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Assessment,
    Learning,
    Collaboration,
    Onboarding,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assessment => "assessment",
            Self::Learning => "learning",
            Self::Collaboration => "collaboration",
            Self::Onboarding => "onboarding",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeWindow {
    #[serde(rename = "1min")]
    OneMinute,
    #[serde(rename = "5min")]
    FiveMinutes,
    #[serde(rename = "15min")]
    FifteenMinutes,
    #[serde(rename = "1hour")]
    OneHour,
    #[serde(rename = "1day")]
    OneDay,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1min",
            Self::FiveMinutes => "5min",
            Self::FifteenMinutes => "15min",
            Self::OneHour => "1hour",
            Self::OneDay => "1day",
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        match self {
            Self::OneMinute => chrono::Duration::minutes(1),
            Self::FiveMinutes => chrono::Duration::minutes(5),
            Self::FifteenMinutes => chrono::Duration::minutes(15),
            Self::OneHour => chrono::Duration::hours(1),
            Self::OneDay => chrono::Duration::days(1),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1min" => Some(Self::OneMinute),
            "5min" => Some(Self::FiveMinutes),
            "15min" => Some(Self::FifteenMinutes),
            "1hour" => Some(Self::OneHour),
            "1day" => Some(Self::OneDay),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "24h")]
    OneDay,
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneHour => "1h",
            Self::OneDay => "24h",
            Self::SevenDays => "7d",
            Self::ThirtyDays => "30d",
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        match self {
            Self::OneHour => chrono::Duration::hours(1),
            Self::OneDay => chrono::Duration::days(1),
            Self::SevenDays => chrono::Duration::days(7),
            Self::ThirtyDays => chrono::Duration::days(30),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1h" => Some(Self::OneHour),
            "24h" => Some(Self::OneDay),
            "7d" => Some(Self::SevenDays),
            "30d" => Some(Self::ThirtyDays),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintUsagePatterns {
    pub frequency: f64,
    pub effectiveness: f64,
    pub preferred_hint_types: Vec<String>,
}

impl Default for HintUsagePatterns {
    fn default() -> Self {
        Self {
            frequency: 0.0,
            effectiveness: 0.5,
            preferred_hint_types: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FatigueIndicators {
    pub performance_decline: f64,
    /// Minutes.
    pub optimal_session_length: f64,
    /// Hours.
    pub recovery_time: f64,
}

impl Default for FatigueIndicators {
    fn default() -> Self {
        Self {
            performance_decline: 0.0,
            optimal_session_length: 45.0,
            recovery_time: 24.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CognitivePatterns {
    /// Recent response latencies in seconds, bounded ring buffer.
    pub response_time_distribution: VecDeque<f64>,
    pub accuracy_by_difficulty: HashMap<i32, f64>,
    /// Signed, deliberately unbounded preference scores keyed by open-ended
    /// domain names. Correct answers add more than errors subtract.
    pub domain_preferences: HashMap<String, f64>,
    pub hint_usage_patterns: HintUsagePatterns,
    pub fatigue_indicators: FatigueIndicators,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotivationalProfile {
    pub challenge_preference: ChallengePreference,
    pub feedback_sensitivity: f64,
    pub gamification_response: f64,
}

impl Default for MotivationalProfile {
    fn default() -> Self {
        Self {
            challenge_preference: ChallengePreference::Gradual,
            feedback_sensitivity: 0.7,
            gamification_response: 0.6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetacognitiveAwareness {
    pub confidence_accuracy: f64,
    pub self_regulation_skills: f64,
    pub reflective_thinking: f64,
}

impl Default for MetacognitiveAwareness {
    fn default() -> Self {
        Self {
            confidence_accuracy: 0.5,
            self_regulation_skills: 0.5,
            reflective_thinking: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBehaviorProfile {
    pub user_id: String,
    pub cognitive_patterns: CognitivePatterns,
    pub learning_style: LearningStyle,
    pub motivational_profile: MotivationalProfile,
    pub metacognitive_awareness: MetacognitiveAwareness,
    /// EIQ improvement velocity.
    pub progression_rate: f64,
    /// How well the model has predicted this user historically, [0,1].
    pub prediction_accuracy: f64,
}

impl UserBehaviorProfile {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            cognitive_patterns: CognitivePatterns::default(),
            learning_style: LearningStyle::Mixed,
            motivational_profile: MotivationalProfile::default(),
            metacognitive_awareness: MetacognitiveAwareness::default(),
            progression_rate: 0.1,
            prediction_accuracy: 0.5,
        }
    }

    pub fn domain_preference(&self, domain: &str) -> Option<f64> {
        self.cognitive_patterns.domain_preferences.get(domain).copied()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(rename = "type")]
    pub device_type: String,
    pub browser: String,
    #[serde(default)]
    pub viewport: Option<serde_json::Value>,
}

/// One tracked interaction as received from the UI layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionEvent {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub session_id: String,
    pub event_type: EventKind,
    #[serde(default)]
    pub event_data: serde_json::Value,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub component: Option<String>,
    /// Milliseconds.
    #[serde(default)]
    pub response_time: Option<i64>,
    /// Seconds.
    #[serde(default)]
    pub time_on_page: Option<i64>,
    /// Percent of page height reached.
    #[serde(default)]
    pub scroll_depth: Option<f64>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub device_info: Option<DeviceInfo>,
    #[serde(default)]
    pub experiment_group: Option<String>,
    #[serde(default)]
    pub feature_flags: Vec<String>,
}

/// The assessment-response payload carried inside `eventData` for
/// `question_answer` events; drives every profile update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSample {
    #[serde(default)]
    pub question_id: Option<String>,
    pub domain: String,
    pub difficulty: f64,
    pub is_correct: bool,
    /// Seconds.
    pub response_time: f64,
    #[serde(default)]
    pub confidence_level: Option<f64>,
    #[serde(default)]
    pub hint_used: bool,
    #[serde(default)]
    pub hint_effectiveness: Option<f64>,
    #[serde(default)]
    pub session_context: SessionContext,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub questions_answered: i64,
    /// Seconds.
    pub session_duration: f64,
    pub overall_accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionStrategy {
    pub target_weakness: String,
    pub difficulty_progression: DifficultyProgression,
    pub contextual_framing: ContextualFraming,
    pub multimodal_approach: bool,
    pub real_world_application: bool,
    pub collaborative_elements: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningState {
    pub current_mastery: f64,
    pub fatigue_level: f64,
    pub motivation_level: f64,
    pub optimal_difficulty: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintStrategy {
    pub hint_type: String,
    pub complexity: String,
    pub timing: String,
}

/// Structured question returned by the generation collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
    #[serde(default)]
    pub targeted_domains: Vec<String>,
    #[serde(default)]
    pub estimated_difficulty: f64,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    #[serde(default)]
    pub follow_up_suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BehavioralContext {
    pub learning_style: LearningStyle,
    pub challenge_level: String,
    pub motivational_framing: MotivationalProfile,
}

/// An adapted question ready for delivery: the generated (or fallback)
/// content plus the behavioral context that shaped it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptedQuestion {
    #[serde(flatten)]
    pub question: GeneratedQuestion,
    pub predicted_effectiveness: f64,
    pub behavioral_context: BehavioralContext,
    /// True when the provider failed and a static question was served.
    pub fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedGrowth {
    pub short_term: f64,
    pub medium_term: f64,
    pub long_term: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceIntervals {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EiqPredictionModel {
    pub current_eiq: f64,
    pub projected_growth: ProjectedGrowth,
    pub confidence_intervals: ConfidenceIntervals,
    pub key_growth_factors: Vec<String>,
    pub recommended_interventions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decayed_average_halves_toward_sample() {
        assert_eq!(decayed_average(0.0, 1.0), 0.5);
        assert_eq!(decayed_average(0.5, 0.1), 0.3);
        assert_eq!(decayed_average(1.0, 1.0), 1.0);
    }

    #[test]
    fn event_kind_serde_uses_snake_case() {
        let kind: EventKind = serde_json::from_str("\"question_answer\"").unwrap();
        assert_eq!(kind, EventKind::QuestionAnswer);
        assert_eq!(
            serde_json::to_string(&EventKind::AssessmentStart).unwrap(),
            "\"assessment_start\""
        );
    }

    #[test]
    fn only_assessment_kinds_feed_learning() {
        assert!(EventKind::AssessmentStart.feeds_learning());
        assert!(EventKind::QuestionAnswer.feeds_learning());
        assert!(EventKind::Completion.feeds_learning());
        assert!(!EventKind::PageView.feeds_learning());
        assert!(!EventKind::HintRequest.feeds_learning());
    }

    #[test]
    fn new_profile_has_documented_defaults() {
        let profile = UserBehaviorProfile::new("u1");
        assert_eq!(profile.learning_style, LearningStyle::Mixed);
        assert_eq!(
            profile.motivational_profile.challenge_preference,
            ChallengePreference::Gradual
        );
        assert_eq!(profile.metacognitive_awareness.confidence_accuracy, 0.5);
        assert_eq!(profile.cognitive_patterns.hint_usage_patterns.effectiveness, 0.5);
        assert_eq!(
            profile.cognitive_patterns.fatigue_indicators.optimal_session_length,
            45.0
        );
        assert_eq!(profile.progression_rate, 0.1);
        assert_eq!(profile.prediction_accuracy, 0.5);
    }

    #[test]
    fn time_window_parse_round_trips() {
        for window in [
            TimeWindow::OneMinute,
            TimeWindow::FiveMinutes,
            TimeWindow::FifteenMinutes,
            TimeWindow::OneHour,
            TimeWindow::OneDay,
        ] {
            assert_eq!(TimeWindow::parse(window.as_str()), Some(window));
        }
        assert_eq!(TimeWindow::parse("2min"), None);
    }
}
