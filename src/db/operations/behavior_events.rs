use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::operations::BucketCount;
use crate::db::DatabaseProxy;
use crate::engine::types::InteractionEvent;

/// A persisted interaction event as read back from the durable log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredBehaviorEvent {
    pub user_id: String,
    pub session_id: String,
    pub event_type: String,
    pub event_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Aggregate counters over the event log for one time window.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventWindowMetrics {
    pub total_events: i64,
    pub active_users: i64,
    pub error_events: i64,
    pub avg_response_time_ms: f64,
}

pub async fn insert_behavior_event(
    proxy: &DatabaseProxy,
    event: &InteractionEvent,
) -> Result<String, sqlx::Error> {
    let id = uuid::Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO "behavior_events" (
            "id", "userId", "sessionId", "eventType", "eventData", "timestamp", "createdAt"
        ) VALUES ($1, $2, $3, $4, $5, $6, $6)
        "#,
    )
    .bind(id)
    .bind(&event.user_id)
    .bind(&event.session_id)
    .bind(event.event_type.as_str())
    .bind(&event.event_data)
    .bind(now)
    .execute(proxy.pool())
    .await?;
    Ok(id.to_string())
}

/// Events since a cutoff in arrival order, for replay-based rehydration.
pub async fn fetch_events_since(
    proxy: &DatabaseProxy,
    since: DateTime<Utc>,
) -> Result<Vec<StoredBehaviorEvent>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, String, String, serde_json::Value, DateTime<Utc>)>(
        r#"
        SELECT "userId", "sessionId", "eventType", "eventData", "createdAt"
        FROM "behavior_events"
        WHERE "createdAt" >= $1
        ORDER BY "createdAt" ASC
        "#,
    )
    .bind(since)
    .fetch_all(proxy.pool())
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(user_id, session_id, event_type, event_data, created_at)| StoredBehaviorEvent {
                user_id,
                session_id,
                event_type,
                event_data,
                created_at,
            },
        )
        .collect())
}

pub async fn event_window_metrics(
    proxy: &DatabaseProxy,
    since: DateTime<Utc>,
) -> Result<EventWindowMetrics, sqlx::Error> {
    let row: Option<(i64, i64, i64, Option<f64>)> = sqlx::query_as(
        r#"
        SELECT
            COUNT(*),
            COUNT(DISTINCT "userId"),
            COUNT(*) FILTER (WHERE "eventType" = 'error'),
            AVG(("eventData"->>'responseTime')::double precision)
                FILTER (WHERE "eventData" ? 'responseTime')
        FROM "behavior_events"
        WHERE "createdAt" >= $1
        "#,
    )
    .bind(since)
    .fetch_optional(proxy.pool())
    .await?;

    Ok(row
        .map(
            |(total_events, active_users, error_events, avg_response)| EventWindowMetrics {
                total_events,
                active_users,
                error_events,
                avg_response_time_ms: avg_response.unwrap_or(0.0),
            },
        )
        .unwrap_or_default())
}

/// (questionId, isCorrect) pairs from answered questions since a cutoff,
/// for the strategy feedback loop's effectiveness refold. Rows with a
/// malformed or JSON-null payload decode as `None` and are skipped, so one
/// bad event cannot abort the whole fold.
pub async fn fetch_question_outcomes(
    proxy: &DatabaseProxy,
    since: DateTime<Utc>,
) -> Result<Vec<(String, bool)>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (Option<String>, Option<bool>)>(
        r#"
        SELECT "eventData"->>'questionId', ("eventData"->>'isCorrect')::boolean
        FROM "behavior_events"
        WHERE "eventType" = 'question_answer'
          AND "createdAt" >= $1
          AND jsonb_typeof("eventData"->'questionId') = 'string'
          AND jsonb_typeof("eventData"->'isCorrect') = 'boolean'
        ORDER BY "createdAt" ASC
        "#,
    )
    .bind(since)
    .fetch_all(proxy.pool())
    .await?;

    Ok(well_formed_outcomes(rows))
}

fn well_formed_outcomes(rows: Vec<(Option<String>, Option<bool>)>) -> Vec<(String, bool)> {
    rows.into_iter()
        .filter_map(|(question_id, is_correct)| Some((question_id?, is_correct?)))
        .collect()
}

/// Engagement counters over the event log for one window: page traffic,
/// hint demand, per-session depth and first-seen users.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementWindowMetrics {
    pub page_views: i64,
    pub hint_requests: i64,
    pub event_sessions: i64,
    pub single_event_sessions: i64,
    pub new_users: i64,
}

pub async fn engagement_window_metrics(
    proxy: &DatabaseProxy,
    since: DateTime<Utc>,
) -> Result<EngagementWindowMetrics, sqlx::Error> {
    let row: Option<(i64, i64, i64, i64, i64)> = sqlx::query_as(
        r#"
        SELECT
            COUNT(*) FILTER (WHERE "eventType" = 'page_view'),
            COUNT(*) FILTER (WHERE "eventType" = 'hint_request'),
            COUNT(DISTINCT "sessionId"),
            (SELECT COUNT(*) FROM (
                SELECT 1 FROM "behavior_events"
                WHERE "createdAt" >= $1
                GROUP BY "sessionId"
                HAVING COUNT(*) = 1
            ) singles),
            (SELECT COUNT(*) FROM (
                SELECT "userId" FROM "behavior_events"
                GROUP BY "userId"
                HAVING MIN("createdAt") >= $1
            ) fresh)
        FROM "behavior_events"
        WHERE "createdAt" >= $1
        "#,
    )
    .bind(since)
    .fetch_optional(proxy.pool())
    .await?;

    Ok(row
        .map(
            |(page_views, hint_requests, event_sessions, single_event_sessions, new_users)| {
                EngagementWindowMetrics {
                    page_views,
                    hint_requests,
                    event_sessions,
                    single_event_sessions,
                    new_users,
                }
            },
        )
        .unwrap_or_default())
}

/// Events grouped by device type since a cutoff. Device type is stamped
/// into the payload at ingestion time.
pub async fn device_breakdown(
    proxy: &DatabaseProxy,
    since: DateTime<Utc>,
) -> Result<Vec<BucketCount>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (Option<String>, i64)>(
        r#"
        SELECT "eventData"->>'deviceType', COUNT(*)
        FROM "behavior_events"
        WHERE "createdAt" >= $1
        GROUP BY 1
        ORDER BY 2 DESC
        "#,
    )
    .bind(since)
    .fetch_all(proxy.pool())
    .await?;

    Ok(BucketCount::from_rows(rows))
}

/// Events grouped by originating page since a cutoff.
pub async fn page_breakdown(
    proxy: &DatabaseProxy,
    since: DateTime<Utc>,
) -> Result<Vec<BucketCount>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (Option<String>, i64)>(
        r#"
        SELECT "eventData"->>'page', COUNT(*)
        FROM "behavior_events"
        WHERE "createdAt" >= $1
        GROUP BY 1
        ORDER BY 2 DESC
        "#,
    )
    .bind(since)
    .fetch_all(proxy.pool())
    .await?;

    Ok(BucketCount::from_rows(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_payload_fields_are_skipped_not_fatal() {
        let rows = vec![
            (Some("q1".to_string()), Some(true)),
            (None, Some(false)),
            (Some("q2".to_string()), None),
            (Some("q3".to_string()), Some(false)),
        ];
        assert_eq!(
            well_formed_outcomes(rows),
            vec![("q1".to_string(), true), ("q3".to_string(), false)]
        );
    }
}
