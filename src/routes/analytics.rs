use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::analytics::DashboardView;
use crate::db::operations::learning_records;
use crate::engine::types::{TimeRange, TimeWindow, ValidationStatus};
use crate::response::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/snapshot", post(snapshot))
        .route("/records/:record_id/validation", post(validate_record))
}

#[derive(Debug, Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DashboardQuery {
    #[serde(default)]
    time_range: Option<String>,
}

async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Response, AppError> {
    let time_range = match query.time_range.as_deref() {
        None => TimeRange::OneDay,
        Some(raw) => TimeRange::parse(raw).ok_or_else(|| {
            AppError::validation(format!(
                "invalid timeRange '{raw}', expected one of 1h, 24h, 7d, 30d"
            ))
        })?,
    };

    let Some(db) = state.db_proxy() else {
        return Err(AppError::service_unavailable("analytics storage unavailable"));
    };

    let view = DashboardView::build(&db, time_range).await;
    Ok(Json(SuccessResponse {
        success: true,
        data: view,
    })
    .into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRequest {
    #[serde(default)]
    window: Option<String>,
}

async fn snapshot(
    State(state): State<AppState>,
    Json(request): Json<SnapshotRequest>,
) -> Result<Response, AppError> {
    let window = match request.window.as_deref() {
        None => TimeWindow::FiveMinutes,
        Some(raw) => TimeWindow::parse(raw).ok_or_else(|| {
            AppError::validation(format!(
                "invalid window '{raw}', expected one of 1min, 5min, 15min, 1hour, 1day"
            ))
        })?,
    };

    let metrics = state.aggregator().tick(window).await;
    Ok(Json(SuccessResponse {
        success: true,
        data: metrics,
    })
    .into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidationRequest {
    status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationOutcome {
    record_id: String,
    status: ValidationStatus,
}

async fn validate_record(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
    Json(request): Json<ValidationRequest>,
) -> Result<Response, AppError> {
    let status = ValidationStatus::parse(&request.status).ok_or_else(|| {
        AppError::validation(format!(
            "invalid status '{}', expected one of pending, validated, rejected",
            request.status
        ))
    })?;
    let record_uuid = uuid::Uuid::parse_str(&record_id)
        .map_err(|_| AppError::validation(format!("invalid record id '{record_id}'")))?;

    let Some(db) = state.db_proxy() else {
        return Err(AppError::service_unavailable("analytics storage unavailable"));
    };

    let touched = learning_records::update_validation_status(&db, record_uuid, status)
        .await
        .map_err(|e| AppError::internal(e.to_string()))?;
    if touched == 0 {
        return Err(AppError::not_found(format!(
            "no learning record with id {record_id}"
        )));
    }

    Ok(Json(SuccessResponse {
        success: true,
        data: ValidationOutcome { record_id, status },
    })
    .into_response())
}
