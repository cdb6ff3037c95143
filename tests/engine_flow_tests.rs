//! End-to-end flows through the behavioral engine without HTTP in the way.

use std::sync::Arc;

use eiq_backend_rust::engine::types::{ChallengePreference, EventKind, InteractionEvent};
use eiq_backend_rust::engine::{BehaviorEngine, EngineConfig};
use eiq_backend_rust::services::AiProvider;
use serde_json::json;

fn engine() -> BehaviorEngine {
    BehaviorEngine::new(
        EngineConfig::default(),
        None,
        Arc::new(AiProvider::disabled()),
    )
}

fn answer(user_id: &str, payload: serde_json::Value) -> InteractionEvent {
    InteractionEvent {
        user_id: user_id.into(),
        session_id: "session-1".into(),
        event_type: EventKind::QuestionAnswer,
        event_data: payload,
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
async fn accuracy_estimates_decay_toward_recent_outcomes() {
    let engine = engine();

    for is_correct in [true, true, false] {
        engine
            .ingest(answer(
                "u1",
                json!({
                    "domain": "logical_reasoning",
                    "difficulty": 3.0,
                    "isCorrect": is_correct,
                    "responseTime": 15.0
                }),
            ))
            .await
            .unwrap();
    }

    let profile = engine.profile_snapshot("u1").await.unwrap();
    // 0 -> 0.5 -> 0.75 -> 0.375
    let accuracy = profile.cognitive_patterns.accuracy_by_difficulty[&3];
    assert!((accuracy - 0.375).abs() < 1e-12);

    // Two rewards, one penalty: 0.1 + 0.1 - 0.05.
    let preference = profile.domain_preference("logical_reasoning").unwrap();
    assert!((preference - 0.15).abs() < 1e-12);

    assert_eq!(profile.cognitive_patterns.response_time_distribution.len(), 3);
}

#[tokio::test]
async fn strong_sessions_promote_challenge_preference() {
    let engine = engine();

    engine
        .ingest(answer(
            "u2",
            json!({
                "domain": "spatial_reasoning",
                "difficulty": 4.0,
                "isCorrect": true,
                "responseTime": 9.0,
                "sessionContext": {
                    "questionsAnswered": 12,
                    "sessionDuration": 600.0,
                    "overallAccuracy": 0.85
                }
            }),
        ))
        .await
        .unwrap();

    let profile = engine.profile_snapshot("u2").await.unwrap();
    assert_eq!(
        profile.motivational_profile.challenge_preference,
        ChallengePreference::Steep
    );

    // A later weak session cannot demote; only the feedback loop can.
    engine
        .ingest(answer(
            "u2",
            json!({
                "domain": "spatial_reasoning",
                "difficulty": 4.0,
                "isCorrect": false,
                "responseTime": 30.0,
                "sessionContext": {
                    "questionsAnswered": 3,
                    "sessionDuration": 120.0,
                    "overallAccuracy": 0.2
                }
            }),
        ))
        .await
        .unwrap();

    let profile = engine.profile_snapshot("u2").await.unwrap();
    assert_eq!(
        profile.motivational_profile.challenge_preference,
        ChallengePreference::Steep
    );
}

#[tokio::test]
async fn calibrated_confidence_raises_metacognitive_score() {
    let engine = engine();

    engine
        .ingest(answer(
            "u3",
            json!({
                "domain": "verbal_reasoning",
                "difficulty": 2.0,
                "isCorrect": true,
                "responseTime": 8.0,
                "confidenceLevel": 1.0
            }),
        ))
        .await
        .unwrap();

    let profile = engine.profile_snapshot("u3").await.unwrap();
    // (0.5 + (1 - |1 - 1|)) / 2 = 0.75
    assert!((profile.metacognitive_awareness.confidence_accuracy - 0.75).abs() < 1e-12);
}

#[tokio::test]
async fn growth_projection_scales_progression_rate() {
    let engine = engine();

    engine
        .ingest(answer(
            "u4",
            json!({
                "domain": "mathematical_reasoning",
                "difficulty": 5.0,
                "isCorrect": true,
                "responseTime": 20.0
            }),
        ))
        .await
        .unwrap();

    let model = engine.predict_growth("u4").await.unwrap();
    assert_eq!(model.current_eiq, 100.0);
    // Default progression rate 0.1 against 1.2x / 2.5x / 4.0x horizons.
    assert!((model.projected_growth.short_term - 0.12).abs() < 1e-12);
    assert!((model.projected_growth.medium_term - 0.25).abs() < 1e-12);
    assert!((model.projected_growth.long_term - 0.4).abs() < 1e-12);
    assert!(model.confidence_intervals.lower < model.confidence_intervals.upper);
}

#[tokio::test]
async fn adaptation_pass_rewrites_failing_strategies_once() {
    let engine = engine();

    engine
        .ingest(answer(
            "u5",
            json!({
                "domain": "verbal_reasoning",
                "difficulty": 1.0,
                "isCorrect": false,
                "responseTime": 40.0
            }),
        ))
        .await
        .unwrap();

    {
        let handle = engine.store().entry("u5").await;
        handle.lock().await.prediction_accuracy = 0.45;
    }

    let summary = engine.run_adaptation_pass().await.unwrap();
    assert_eq!(summary.profiles_adjusted, 1);

    let profile = engine.profile_snapshot("u5").await.unwrap();
    assert_eq!(
        profile.motivational_profile.challenge_preference,
        ChallengePreference::Varied
    );
    assert_eq!(
        profile
            .cognitive_patterns
            .hint_usage_patterns
            .preferred_hint_types,
        vec!["step-by-step".to_string()]
    );
}

#[tokio::test]
async fn non_answer_events_still_materialize_profiles() {
    let engine = engine();

    let mut event = answer("u6", json!({}));
    event.event_type = EventKind::PageView;
    engine.ingest(event).await.unwrap();

    let profile = engine.profile_snapshot("u6").await.unwrap();
    assert!(profile.cognitive_patterns.response_time_distribution.is_empty());
    assert_eq!(profile.prediction_accuracy, 0.5);
}
