use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::types::InteractionEvent;
use crate::response::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/events", post(events))
}

#[derive(Debug, Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

/// Either one event or a batch envelope whose identifiers backfill events
/// that omit their own.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IngestBody {
    Batch(EventBatch),
    Single(InteractionEvent),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventBatch {
    events: Vec<InteractionEvent>,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    session_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IngestSummary {
    accepted: usize,
    rejected: usize,
}

async fn events(
    State(state): State<AppState>,
    Json(body): Json<IngestBody>,
) -> Result<Response, AppError> {
    let events = match body {
        IngestBody::Single(event) => vec![event],
        IngestBody::Batch(batch) => {
            let EventBatch {
                events,
                user_id,
                session_id,
            } = batch;
            events
                .into_iter()
                .map(|mut event| {
                    if event.user_id.trim().is_empty() {
                        event.user_id = user_id.clone();
                    }
                    if event.session_id.trim().is_empty() {
                        event.session_id = session_id.clone();
                    }
                    event
                })
                .collect()
        }
    };

    if events.is_empty() {
        return Err(AppError::validation("no events provided"));
    }

    let engine = state.engine();
    let total = events.len();
    let mut accepted = 0usize;
    let mut first_error: Option<AppError> = None;

    for event in events {
        match engine.ingest(event).await {
            Ok(()) => accepted += 1,
            Err(e) => {
                debug!(error = %e, "event rejected during ingest");
                if first_error.is_none() {
                    first_error = Some(e.into());
                }
            }
        }
    }

    // A batch where nothing survived validation is a client error.
    if accepted == 0 {
        if let Some(error) = first_error {
            return Err(error);
        }
    }

    Ok(Json(SuccessResponse {
        success: true,
        data: IngestSummary {
            accepted,
            rejected: total - accepted,
        },
    })
    .into_response())
}
