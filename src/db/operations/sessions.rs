use chrono::{DateTime, Utc};

use crate::db::operations::BucketCount;
use crate::db::DatabaseProxy;

/// Everything known about a session at assessment start.
#[derive(Debug, Clone)]
pub struct SessionStart<'a> {
    pub session_id: &'a str,
    pub user_id: &'a str,
    pub session_type: &'a str,
    pub ab_test_group: Option<&'a str>,
    pub ab_test_variant: Option<&'a str>,
    pub objectives: serde_json::Value,
}

/// Insert-or-revive the session row for an assessment start. A duplicate
/// start on the same sessionId simply refreshes the in_progress status.
pub async fn mark_session_started(
    proxy: &DatabaseProxy,
    start: &SessionStart<'_>,
) -> Result<(), sqlx::Error> {
    let id = uuid::Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO "testing_sessions" (
            "id", "sessionId", "userId", "sessionType", "status",
            "abTestGroup", "abTestVariant", "objectives", "startedAt", "createdAt"
        ) VALUES ($1, $2, $3, $4, 'in_progress', $5, $6, $7, $8, $8)
        ON CONFLICT ("sessionId") DO UPDATE SET
            "status" = 'in_progress',
            "sessionType" = EXCLUDED."sessionType"
        "#,
    )
    .bind(id)
    .bind(start.session_id)
    .bind(start.user_id)
    .bind(start.session_type)
    .bind(start.ab_test_group)
    .bind(start.ab_test_variant)
    .bind(&start.objectives)
    .bind(now)
    .execute(proxy.pool())
    .await?;
    Ok(())
}

/// Bump the per-session activity counters for one ingested event. Only
/// open sessions accept the bump; a completed or abandoned row is closed
/// and never mutates again.
pub async fn record_session_activity(
    proxy: &DatabaseProxy,
    session_id: &str,
    is_error: bool,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE "testing_sessions"
        SET "interactionCount" = "interactionCount" + 1,
            "errorCount" = "errorCount" + CASE WHEN $2 THEN 1 ELSE 0 END
        WHERE "sessionId" = $1 AND "status" = 'in_progress'
        "#,
    )
    .bind(session_id)
    .bind(is_error)
    .execute(proxy.pool())
    .await?;
    Ok(result.rows_affected())
}

pub async fn mark_session_completed(
    proxy: &DatabaseProxy,
    session_id: &str,
    completion_rate: Option<f64>,
    satisfaction_score: Option<f64>,
) -> Result<(), sqlx::Error> {
    let now = Utc::now();
    sqlx::query(
        r#"
        UPDATE "testing_sessions"
        SET "status" = 'completed',
            "completedAt" = $1,
            "completionRate" = COALESCE($3, "completionRate"),
            "satisfactionScore" = COALESCE($4, "satisfactionScore")
        WHERE "sessionId" = $2
        "#,
    )
    .bind(now)
    .bind(session_id)
    .bind(completion_rate)
    .bind(satisfaction_score)
    .execute(proxy.pool())
    .await?;
    Ok(())
}

/// Sweep sessions that never completed within the stale cutoff.
pub async fn mark_stale_sessions_abandoned(
    proxy: &DatabaseProxy,
    stale_before: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE "testing_sessions"
        SET "status" = 'abandoned'
        WHERE "status" = 'in_progress' AND "startedAt" < $1
        "#,
    )
    .bind(stale_before)
    .execute(proxy.pool())
    .await?;
    Ok(result.rows_affected())
}

#[derive(Debug, Clone, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionWindowMetrics {
    pub total_sessions: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub abandoned: i64,
    pub avg_duration_secs: f64,
}

pub async fn session_window_metrics(
    proxy: &DatabaseProxy,
    since: DateTime<Utc>,
) -> Result<SessionWindowMetrics, sqlx::Error> {
    let row: Option<(i64, i64, i64, i64, Option<f64>)> = sqlx::query_as(
        r#"
        SELECT
            COUNT(*),
            COUNT(*) FILTER (WHERE "status" = 'in_progress'),
            COUNT(*) FILTER (WHERE "status" = 'completed'),
            COUNT(*) FILTER (WHERE "status" = 'abandoned'),
            AVG(EXTRACT(EPOCH FROM ("completedAt" - "startedAt")))
                FILTER (WHERE "completedAt" IS NOT NULL)
        FROM "testing_sessions"
        WHERE "createdAt" >= $1
        "#,
    )
    .bind(since)
    .fetch_optional(proxy.pool())
    .await?;

    Ok(row
        .map(
            |(total_sessions, in_progress, completed, abandoned, avg_duration)| {
                SessionWindowMetrics {
                    total_sessions,
                    in_progress,
                    completed,
                    abandoned,
                    avg_duration_secs: avg_duration.unwrap_or(0.0),
                }
            },
        )
        .unwrap_or_default())
}

/// Per-experiment-group session outcomes in one window, for snapshot
/// embedding. Sessions without an A/B assignment are excluded.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentResult {
    pub group: String,
    pub sessions: i64,
    pub completed: i64,
}

pub async fn experiment_results(
    proxy: &DatabaseProxy,
    since: DateTime<Utc>,
) -> Result<Vec<ExperimentResult>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, i64, i64)>(
        r#"
        SELECT "abTestGroup", COUNT(*), COUNT(*) FILTER (WHERE "status" = 'completed')
        FROM "testing_sessions"
        WHERE "createdAt" >= $1 AND "abTestGroup" IS NOT NULL
        GROUP BY 1
        ORDER BY 1
        "#,
    )
    .bind(since)
    .fetch_all(proxy.pool())
    .await?;

    Ok(rows
        .into_iter()
        .map(|(group, sessions, completed)| ExperimentResult {
            group,
            sessions,
            completed,
        })
        .collect())
}

/// Sessions grouped by session type since a cutoff.
pub async fn session_type_breakdown(
    proxy: &DatabaseProxy,
    since: DateTime<Utc>,
) -> Result<Vec<BucketCount>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (Option<String>, i64)>(
        r#"
        SELECT "sessionType", COUNT(*)
        FROM "testing_sessions"
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
