use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::response::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/question", post(next_question))
        .route("/hints", post(hints))
        .route("/growth/:user_id", get(growth))
}

#[derive(Debug, Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionRequest {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    domain: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HintRequest {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    question_id: Option<String>,
    #[serde(default)]
    context: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HintResponse {
    hints: Vec<String>,
    fallback: bool,
}

async fn next_question(
    State(state): State<AppState>,
    Json(request): Json<QuestionRequest>,
) -> Result<Response, AppError> {
    if request.user_id.trim().is_empty() {
        return Err(AppError::validation("userId is required"));
    }

    let adapted = state
        .engine()
        .next_question(&request.user_id, request.domain.as_deref())
        .await;
    Ok(Json(SuccessResponse {
        success: true,
        data: adapted,
    })
    .into_response())
}

async fn hints(
    State(state): State<AppState>,
    Json(request): Json<HintRequest>,
) -> Result<Response, AppError> {
    if request.user_id.trim().is_empty() {
        return Err(AppError::validation("userId is required"));
    }

    let (hints, fallback) = state
        .engine()
        .generate_hints(
            &request.user_id,
            request.question_id.as_deref(),
            &request.context,
        )
        .await;
    Ok(Json(SuccessResponse {
        success: true,
        data: HintResponse { hints, fallback },
    })
    .into_response())
}

async fn growth(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Response, AppError> {
    let model = state.engine().predict_growth(&user_id).await?;
    Ok(Json(SuccessResponse {
        success: true,
        data: model,
    })
    .into_response())
}
