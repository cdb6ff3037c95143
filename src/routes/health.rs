use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::config::SERVICE_NAME;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/info", get(info))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
    timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthInfoResponse {
    service: &'static str,
    version: String,
    start_time: String,
    uptime: u64,
}

async fn root(State(state): State<AppState>) -> Response {
    let db_connected = match state.db_proxy() {
        Some(db) => db.check_connection().await,
        None => false,
    };

    let response = HealthResponse {
        status: if db_connected { "ok" } else { "degraded" },
        database: if db_connected {
            "connected"
        } else {
            "disconnected"
        },
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    let status_code = if db_connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(response)).into_response()
}

async fn info(State(state): State<AppState>) -> Response {
    let start_time = chrono::DateTime::<chrono::Utc>::from(state.started_at_system()).to_rfc3339();
    Json(HealthInfoResponse {
        service: SERVICE_NAME,
        version: std::env::var("APP_VERSION")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "unknown".to_string()),
        start_time,
        uptime: state.uptime_seconds(),
    })
    .into_response()
}
