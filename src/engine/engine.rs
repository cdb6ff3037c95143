//! The behavioral core: one long-lived engine owning the profile cache,
//! persistence fan-out and the adaptive generation surface.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::db::{operations as db_ops, DatabaseProxy};
use crate::engine::config::EngineConfig;
use crate::engine::error::EngineError;
use crate::engine::features::{self, DerivedFeatures};
use crate::engine::feedback::{self, QuestionOutcome};
use crate::engine::growth;
use crate::engine::ingestion;
use crate::engine::profile_store::ProfileStore;
use crate::engine::strategy;
use crate::engine::types::{
    AdaptedQuestion, BehavioralContext, EiqPredictionModel, EventKind, InteractionEvent,
    LearningDataType, UserBehaviorProfile,
};
use crate::services::ai_provider::AiProvider;

const DEFAULT_PREDICTED_EFFECTIVENESS: f64 = 0.75;
const ADAPTATION_LOOKBACK_HOURS: i64 = 24;
const HYDRATION_LOOKBACK_DAYS: i64 = 30;

/// Result of one feedback-loop pass, for logs and worker telemetry.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptationSummary {
    pub profiles_examined: usize,
    pub profiles_adjusted: usize,
    pub outcomes_folded: usize,
}

pub struct BehaviorEngine {
    config: EngineConfig,
    store: ProfileStore,
    db: Option<Arc<DatabaseProxy>>,
    ai: Arc<AiProvider>,
    /// Global per-question effectiveness ratings, refolded by the feedback
    /// loop from answered-question outcomes.
    question_effectiveness: RwLock<HashMap<String, f64>>,
    /// Users whose accumulated learning records crossed the retraining
    /// threshold since the flag was last drained. Behind an Arc so the
    /// spawned persistence tasks can flag users.
    retraining_due: Arc<RwLock<HashSet<String>>>,
    /// Lifetime count of profile adjustments made by the feedback loop,
    /// shared with the analytics aggregator for snapshotting.
    adjustments_made: Arc<AtomicU64>,
    feedback_running: AtomicBool,
}

impl BehaviorEngine {
    pub fn new(config: EngineConfig, db: Option<Arc<DatabaseProxy>>, ai: Arc<AiProvider>) -> Self {
        Self {
            config,
            store: ProfileStore::new(),
            db,
            ai,
            question_effectiveness: RwLock::new(HashMap::new()),
            retraining_due: Arc::new(RwLock::new(HashSet::new())),
            adjustments_made: Arc::new(AtomicU64::new(0)),
            feedback_running: AtomicBool::new(false),
        }
    }

    pub fn adjustment_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.adjustments_made)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    /// Ingest one interaction event: validate, update the in-memory profile
    /// synchronously, then fan persistence out to background tasks so the
    /// ingest path never waits on the database.
    pub async fn ingest(&self, event: InteractionEvent) -> Result<(), EngineError> {
        ingestion::validate(&event)?;

        // Every valid event materializes the profile, answered questions
        // additionally run the update law.
        let handle = self.store.entry(&event.user_id).await;
        if let Some(sample) = ingestion::response_sample(&event) {
            let mut profile = handle.lock().await;
            ingestion::apply_response(&mut profile, &sample, &self.config);
        } else if event.event_type == EventKind::QuestionAnswer {
            debug!(user_id = %event.user_id, "question_answer event without parsable response payload");
        }

        if let Some(db) = &self.db {
            // Stamp engagement quality plus the context fields the analytics
            // breakdowns group by into the payload before it hits the
            // durable log.
            let mut event = event;
            let quality = features::interaction_quality(&event);
            if let serde_json::Value::Object(map) = &mut event.event_data {
                map.insert(
                    "interactionQuality".to_string(),
                    serde_json::json!(quality),
                );
                if let Some(page) = &event.page {
                    map.entry("page".to_string())
                        .or_insert_with(|| serde_json::json!(page));
                }
                if let Some(device) = &event.device_info {
                    map.entry("deviceType".to_string())
                        .or_insert_with(|| serde_json::json!(device.device_type));
                }
            }
            self.spawn_persistence(Arc::clone(db), event);
        }

        Ok(())
    }

    fn spawn_persistence(&self, db: Arc<DatabaseProxy>, event: InteractionEvent) {
        let retraining_threshold = self.config.retraining_threshold;
        let retraining_due = Arc::clone(&self.retraining_due);

        tokio::spawn(async move {
            if let Err(e) = db_ops::insert_behavior_event(&db, &event).await {
                warn!(error = %e, user_id = %event.user_id, "failed to persist behavior event");
            }

            if event.event_type == EventKind::AssessmentStart {
                let start = db_ops::SessionStart {
                    session_id: &event.session_id,
                    user_id: &event.user_id,
                    session_type: event
                        .event_data
                        .get("sessionType")
                        .and_then(|v| v.as_str())
                        .unwrap_or("assessment"),
                    ab_test_group: event.experiment_group.as_deref(),
                    ab_test_variant: event
                        .event_data
                        .get("abTestVariant")
                        .and_then(|v| v.as_str()),
                    objectives: event
                        .event_data
                        .get("objectives")
                        .cloned()
                        .unwrap_or_else(|| serde_json::json!([])),
                };
                if let Err(e) = db_ops::mark_session_started(&db, &start).await {
                    warn!(error = %e, session_id = %event.session_id, "failed to open testing session");
                }
            }

            // Counters bump before any close below; a closed session row is
            // immutable, so late events no longer count.
            if let Err(e) = db_ops::record_session_activity(
                &db,
                &event.session_id,
                event.event_type == EventKind::Error,
            )
            .await
            {
                warn!(error = %e, session_id = %event.session_id, "failed to bump session activity");
            }

            if event.event_type == EventKind::Completion {
                let completion_rate = event
                    .event_data
                    .get("completionRate")
                    .and_then(|v| v.as_f64());
                let satisfaction = event
                    .event_data
                    .get("satisfactionScore")
                    .and_then(|v| v.as_f64());
                if let Err(e) = db_ops::mark_session_completed(
                    &db,
                    &event.session_id,
                    completion_rate,
                    satisfaction,
                )
                .await
                {
                    warn!(error = %e, session_id = %event.session_id, "failed to close testing session");
                }
                if let Some(score) = event.event_data.get("score").and_then(|v| v.as_f64()) {
                    if let Err(e) = db_ops::insert_assessment_score(
                        &db,
                        &event.user_id,
                        Some(&event.session_id),
                        score,
                    )
                    .await
                    {
                        warn!(error = %e, user_id = %event.user_id, "failed to persist assessment score");
                    }
                }
            }

            if event.event_type.feeds_learning() {
                let derived = DerivedFeatures::from_payload(&event.event_data);
                let confidence = derived.confidence();
                // The stored feature document carries the derived signals by
                // name plus the raw numeric vector, so window queries can
                // aggregate individual signals.
                let mut feature_doc = serde_json::json!(derived);
                if let serde_json::Value::Object(map) = &mut feature_doc {
                    map.insert(
                        "vector".to_string(),
                        serde_json::json!(DerivedFeatures::feature_vector(&event.event_data)),
                    );
                }
                let labels = serde_json::json!(DerivedFeatures::labels(&event.event_data));

                if let Err(e) = db_ops::insert_learning_record(
                    &db,
                    &event.user_id,
                    LearningDataType::UserInteraction,
                    &feature_doc,
                    &labels,
                    confidence,
                )
                .await
                {
                    warn!(error = %e, user_id = %event.user_id, "failed to persist learning record");
                    return;
                }

                match db_ops::count_records_for_user(&db, &event.user_id).await {
                    Ok(count) if count > retraining_threshold => {
                        let mut due = retraining_due.write().await;
                        if due.insert(event.user_id.clone()) {
                            info!(user_id = %event.user_id, count, "retraining threshold crossed");
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, user_id = %event.user_id, "failed to count learning records");
                    }
                }
            }
        });
    }

    /// Users flagged for retraining since the last drain. Draining resets
    /// the flags so each crossing is reported once.
    pub async fn drain_retraining_signals(&self) -> Vec<String> {
        let mut due = self.retraining_due.write().await;
        due.drain().collect()
    }

    /// Point-in-time snapshot of a user's profile, if one exists.
    pub async fn profile_snapshot(&self, user_id: &str) -> Option<UserBehaviorProfile> {
        self.store.snapshot(user_id).await
    }

    /// Generate the next adaptive question for a user. This surface never
    /// fails outward: provider errors are logged and a well-formed static
    /// question is served with the `fallback` flag set.
    pub async fn next_question(&self, user_id: &str, domain: Option<&str>) -> AdaptedQuestion {
        let profile = self
            .store
            .snapshot(user_id)
            .await
            .unwrap_or_else(|| UserBehaviorProfile::new(user_id));
        let question_strategy = strategy::derive_strategy(&profile, domain);
        let learning_state = strategy::learning_state(&profile, &question_strategy.target_weakness);

        let (question, fallback) = if self.ai.is_available() {
            let prompt = strategy::question_prompt(&question_strategy, &learning_state, &profile);
            match self
                .ai
                .complete_with_system(
                    "You are an adaptive assessment engine. Respond with JSON only.",
                    &prompt,
                )
                .await
            {
                Ok(raw) => match strategy::parse_generated_question(&raw) {
                    Ok(question) => (question, false),
                    Err(e) => {
                        warn!(error = %e, user_id, "generated question failed to parse, serving fallback");
                        (strategy::fallback_question(&question_strategy), true)
                    }
                },
                Err(e) => {
                    warn!(error = %e, user_id, "question generation failed, serving fallback");
                    (strategy::fallback_question(&question_strategy), true)
                }
            }
        } else {
            (strategy::fallback_question(&question_strategy), true)
        };

        let predicted_effectiveness = self.predicted_effectiveness().await;

        AdaptedQuestion {
            question,
            predicted_effectiveness,
            behavioral_context: BehavioralContext {
                learning_style: profile.learning_style,
                challenge_level: profile
                    .motivational_profile
                    .challenge_preference
                    .as_str()
                    .to_string(),
                motivational_framing: profile.motivational_profile.clone(),
            },
            fallback,
        }
    }

    async fn predicted_effectiveness(&self) -> f64 {
        let ratings = self.question_effectiveness.read().await;
        if ratings.is_empty() {
            DEFAULT_PREDICTED_EFFECTIVENESS
        } else {
            ratings.values().sum::<f64>() / ratings.len() as f64
        }
    }

    /// Generate 3 behavior-shaped hints for a question context. Same
    /// fallback safety as question generation.
    pub async fn generate_hints(
        &self,
        user_id: &str,
        question_id: Option<&str>,
        context: &serde_json::Value,
    ) -> (Vec<String>, bool) {
        let profile = self
            .store
            .snapshot(user_id)
            .await
            .unwrap_or_else(|| UserBehaviorProfile::new(user_id));
        let hint_strategy = strategy::derive_hint_strategy(&profile);

        if self.ai.is_available() {
            let prompt = strategy::hint_prompt(&hint_strategy, question_id, context);
            match self
                .ai
                .complete_with_system(
                    "You are a tutoring assistant. Respond with exactly 3 hints, one per line.",
                    &prompt,
                )
                .await
            {
                Ok(raw) => {
                    if let Some(hints) = strategy::parse_hints(&raw) {
                        return (hints.to_vec(), false);
                    }
                    warn!(user_id, "hint generation returned fewer than 3 usable lines");
                }
                Err(e) => {
                    warn!(error = %e, user_id, "hint generation failed, serving fallback");
                }
            }
        }

        (strategy::fallback_hints().to_vec(), true)
    }

    /// EIQ growth prediction for a profiled user. Unknown users are a 404,
    /// not an empty prediction.
    pub async fn predict_growth(&self, user_id: &str) -> Result<EiqPredictionModel, EngineError> {
        let profile = self
            .store
            .snapshot(user_id)
            .await
            .ok_or_else(|| EngineError::ProfileNotFound(user_id.to_string()))?;

        let scores = match &self.db {
            Some(db) => db_ops::fetch_user_scores(db, user_id)
                .await
                .map_err(|e| EngineError::Persistence(e.to_string()))?,
            None => Vec::new(),
        };

        let trend = growth::progression_trend(&scores);
        debug!(user_id, trend, score_count = scores.len(), "growth prediction inputs");

        Ok(growth::build_prediction(&profile, &scores, &self.config))
    }

    /// One feedback-loop pass: refold question effectiveness from recent
    /// outcomes, then adjust every profile whose predictions underperform.
    /// Single-flight; overlapping invocations return an empty summary.
    pub async fn run_adaptation_pass(&self) -> Result<AdaptationSummary, EngineError> {
        if self
            .feedback_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("adaptation pass already running, skipping");
            return Ok(AdaptationSummary::default());
        }

        let result = self.adaptation_pass_inner().await;
        self.feedback_running.store(false, Ordering::Release);
        result
    }

    async fn adaptation_pass_inner(&self) -> Result<AdaptationSummary, EngineError> {
        let mut summary = AdaptationSummary::default();

        if let Some(db) = &self.db {
            let since = Utc::now() - Duration::hours(ADAPTATION_LOOKBACK_HOURS);
            let outcomes = db_ops::fetch_question_outcomes(db, since)
                .await
                .map_err(|e| EngineError::Aggregation(e.to_string()))?;
            summary.outcomes_folded = outcomes.len();

            let mut ratings = self.question_effectiveness.write().await;
            feedback::fold_effectiveness(
                &mut ratings,
                outcomes
                    .into_iter()
                    .map(|(question_id, is_correct)| QuestionOutcome {
                        question_id,
                        is_correct,
                    }),
            );
        }

        for handle in self.store.all().await {
            let mut profile = handle.lock().await;
            summary.profiles_examined += 1;

            let metrics = feedback::assess(&profile, &self.config);
            if metrics.needs_adjustment {
                feedback::adapt(&mut profile, &metrics);
                summary.profiles_adjusted += 1;
                info!(
                    user_id = %profile.user_id,
                    effectiveness = metrics.effectiveness_score,
                    "profile strategy adjusted"
                );
            }
        }

        self.adjustments_made
            .fetch_add(summary.profiles_adjusted as u64, Ordering::Relaxed);

        info!(
            examined = summary.profiles_examined,
            adjusted = summary.profiles_adjusted,
            outcomes = summary.outcomes_folded,
            "adaptation pass completed"
        );
        Ok(summary)
    }

    /// Rebuild the in-memory profile cache by replaying the recent durable
    /// event log through the same update law as live ingestion.
    pub async fn hydrate(&self) -> Result<usize, EngineError> {
        let Some(db) = &self.db else {
            return Ok(0);
        };

        let since = Utc::now() - Duration::days(HYDRATION_LOOKBACK_DAYS);
        let events = db_ops::fetch_events_since(db, since)
            .await
            .map_err(|e| EngineError::Persistence(e.to_string()))?;

        let mut replayed = 0;
        for stored in &events {
            let handle = self.store.entry(&stored.user_id).await;
            if stored.event_type == EventKind::QuestionAnswer.as_str() {
                if let Ok(sample) = serde_json::from_value(stored.event_data.clone()) {
                    let mut profile = handle.lock().await;
                    ingestion::apply_response(&mut profile, &sample, &self.config);
                }
            }
            replayed += 1;
        }

        info!(replayed, "profile cache hydrated from event log");
        Ok(replayed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_engine() -> BehaviorEngine {
        BehaviorEngine::new(
            EngineConfig::default(),
            None,
            Arc::new(AiProvider::disabled()),
        )
    }

    fn answer_event(user_id: &str, is_correct: bool) -> InteractionEvent {
        InteractionEvent {
            user_id: user_id.into(),
            session_id: "s1".into(),
            event_type: EventKind::QuestionAnswer,
            event_data: json!({
                "questionId": "q1",
                "domain": "spatial_reasoning",
                "difficulty": 3.0,
                "isCorrect": is_correct,
                "responseTime": 14.0,
            }),
            page: None,
            component: None,
            response_time: None,
            time_on_page: None,
            scroll_depth: None,
            user_agent: None,
            device_info: None,
            experiment_group: None,
            feature_flags: vec![],
        }
    }

    #[tokio::test]
    async fn ingest_materializes_and_updates_profiles() {
        let engine = test_engine();
        engine.ingest(answer_event("u1", true)).await.unwrap();

        let profile = engine.profile_snapshot("u1").await.unwrap();
        assert_eq!(
            profile.domain_preference("spatial_reasoning"),
            Some(engine.config().preference_reward)
        );
        assert_eq!(profile.cognitive_patterns.response_time_distribution.len(), 1);
    }

    #[tokio::test]
    async fn ingest_materializes_profiles_for_unparsable_answers() {
        let engine = test_engine();
        let mut event = answer_event("u1", true);
        event.event_data = json!({"questionId": 42});
        engine.ingest(event).await.unwrap();

        let profile = engine.profile_snapshot("u1").await.unwrap();
        assert!(profile.cognitive_patterns.response_time_distribution.is_empty());
    }

    #[tokio::test]
    async fn ingest_rejects_blank_identifiers() {
        let engine = test_engine();
        let mut event = answer_event("", true);
        event.user_id = "  ".into();
        let err = engine.ingest(event).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn question_surface_flags_fallback_without_provider() {
        let engine = test_engine();
        let adapted = engine.next_question("unknown-user", None).await;
        assert!(adapted.fallback);
        assert_eq!(adapted.question.options.len(), 4);
        assert_eq!(adapted.predicted_effectiveness, DEFAULT_PREDICTED_EFFECTIVENESS);

        let scoped = engine.next_question("unknown-user", Some("verbal_reasoning")).await;
        assert_eq!(
            scoped.question.targeted_domains,
            vec!["verbal_reasoning".to_string()]
        );
    }

    #[tokio::test]
    async fn hints_surface_always_returns_three() {
        let engine = test_engine();
        let (hints, fallback) = engine
            .generate_hints("u1", Some("q1"), &json!({"question": "?"}))
            .await;
        assert!(fallback);
        assert_eq!(hints.len(), 3);
    }

    #[tokio::test]
    async fn growth_requires_an_existing_profile() {
        let engine = test_engine();
        let err = engine.predict_growth("nobody").await.unwrap_err();
        assert!(matches!(err, EngineError::ProfileNotFound(_)));

        engine.ingest(answer_event("u1", true)).await.unwrap();
        let model = engine.predict_growth("u1").await.unwrap();
        assert_eq!(model.current_eiq, 100.0);
    }

    #[tokio::test]
    async fn adaptation_pass_adjusts_underperforming_profiles() {
        let engine = test_engine();
        engine.ingest(answer_event("u1", false)).await.unwrap();
        {
            let handle = engine.store().entry("u1").await;
            handle.lock().await.prediction_accuracy = 0.4;
        }

        let summary = engine.run_adaptation_pass().await.unwrap();
        assert_eq!(summary.profiles_examined, 1);
        assert_eq!(summary.profiles_adjusted, 1);

        let profile = engine.profile_snapshot("u1").await.unwrap();
        assert_eq!(
            profile
                .cognitive_patterns
                .hint_usage_patterns
                .preferred_hint_types,
            vec!["step-by-step".to_string()]
        );
    }
}
