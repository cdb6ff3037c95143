use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

mod common;

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn tracking_accepts_a_valid_event() {
    let app = common::create_test_app();

    let response = app
        .oneshot(post_json(
            "/api/tracking/events",
            serde_json::json!({
                "userId": "u1",
                "sessionId": "s1",
                "eventType": "page_view",
                "eventData": {}
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["accepted"], 1);
    assert_eq!(json["data"]["rejected"], 0);
}

#[tokio::test]
async fn tracking_rejects_events_without_identifiers() {
    let app = common::create_test_app();

    let response = app
        .oneshot(post_json(
            "/api/tracking/events",
            serde_json::json!({
                "userId": "u1",
                "sessionId": "",
                "eventType": "page_view"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn tracking_batch_backfills_envelope_identifiers() {
    let app = common::create_test_app();

    let response = app
        .oneshot(post_json(
            "/api/tracking/events",
            serde_json::json!({
                "userId": "u2",
                "sessionId": "s2",
                "events": [
                    {"eventType": "page_view"},
                    {"eventType": "button_click"}
                ]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["accepted"], 2);
}

#[tokio::test]
async fn adaptive_question_requires_user_id() {
    let app = common::create_test_app();

    let response = app
        .oneshot(post_json("/api/adaptive/question", serde_json::json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn adaptive_question_serves_fallback_without_provider() {
    let app = common::create_test_app();

    let response = app
        .oneshot(post_json(
            "/api/adaptive/question",
            serde_json::json!({"userId": "u1", "domain": "logical_reasoning"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["fallback"], true);
    assert_eq!(json["data"]["options"].as_array().unwrap().len(), 4);
    assert_eq!(json["data"]["targetedDomains"][0], "logical_reasoning");
    assert!(json["data"]["predictedEffectiveness"].is_number());
    assert!(json["data"]["behavioralContext"]["learningStyle"].is_string());
}

#[tokio::test]
async fn adaptive_hints_always_returns_three() {
    let app = common::create_test_app();

    let response = app
        .oneshot(post_json(
            "/api/adaptive/hints",
            serde_json::json!({
                "userId": "u1",
                "questionId": "q-42",
                "context": {"questionText": "What is 2 + 2?"}
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["hints"].as_array().unwrap().len(), 3);
    assert_eq!(json["data"]["fallback"], true);
}

#[tokio::test]
async fn growth_for_unknown_user_is_not_found() {
    let app = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/adaptive/growth/nobody")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "PROFILE_NOT_FOUND");
}

#[tokio::test]
async fn growth_after_ingestion_returns_a_prediction() {
    let app = common::create_test_app();

    let ingest = app
        .clone()
        .oneshot(post_json(
            "/api/tracking/events",
            serde_json::json!({
                "userId": "u9",
                "sessionId": "s9",
                "eventType": "question_answer",
                "eventData": {
                    "domain": "verbal_reasoning",
                    "difficulty": 2.0,
                    "isCorrect": true,
                    "responseTime": 10.0
                }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(ingest.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/adaptive/growth/u9")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["currentEiq"], 100.0);
    assert!(json["data"]["projectedGrowth"]["shortTerm"].is_number());
    assert!(json["data"]["keyGrowthFactors"].as_array().unwrap().len() >= 1);
}

#[tokio::test]
async fn dashboard_requires_storage() {
    let app = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/analytics/dashboard?timeRange=24h")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn dashboard_rejects_unknown_time_range() {
    let app = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/analytics/dashboard?timeRange=90d")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn snapshot_without_storage_yields_zeroed_metrics() {
    let app = common::create_test_app();

    let response = app
        .oneshot(post_json(
            "/api/analytics/snapshot",
            serde_json::json!({"window": "1min"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["window"], "1min");
    assert_eq!(json["data"]["activeUsers"], 0);
    assert_eq!(json["data"]["errorRate"], 0.0);
}

#[tokio::test]
async fn record_validation_rejects_unknown_status() {
    let app = common::create_test_app();

    let response = app
        .oneshot(post_json(
            "/api/analytics/records/5f7f3a6e-7e1a-4a6e-9f0a-1e2d3c4b5a69/validation",
            serde_json::json!({"status": "approved"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn record_validation_rejects_malformed_record_id() {
    let app = common::create_test_app();

    let response = app
        .oneshot(post_json(
            "/api/analytics/records/not-a-uuid/validation",
            serde_json::json!({"status": "validated"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn record_validation_requires_storage() {
    let app = common::create_test_app();

    let response = app
        .oneshot(post_json(
            "/api/analytics/records/5f7f3a6e-7e1a-4a6e-9f0a-1e2d3c4b5a69/validation",
            serde_json::json!({"status": "validated"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn health_degrades_without_database() {
    let app = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["database"], "disconnected");
}

#[tokio::test]
async fn health_info_reports_uptime() {
    let app = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health/info")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["service"], "eiq-backend");
    assert!(json["uptime"].is_number());
}
