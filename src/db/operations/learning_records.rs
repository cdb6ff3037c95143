use chrono::{DateTime, Utc};

use crate::db::operations::BucketCount;
use crate::db::DatabaseProxy;
use crate::engine::types::{LearningDataType, ValidationStatus};

pub async fn insert_learning_record(
    proxy: &DatabaseProxy,
    user_id: &str,
    data_type: LearningDataType,
    features: &serde_json::Value,
    labels: &serde_json::Value,
    confidence: f64,
) -> Result<String, sqlx::Error> {
    let id = uuid::Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO "ai_learning_records" (
            "id", "userId", "dataType", "features", "labels",
            "confidence", "validationStatus", "createdAt"
        ) VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(data_type.as_str())
    .bind(features)
    .bind(labels)
    .bind(confidence)
    .bind(now)
    .execute(proxy.pool())
    .await?;
    Ok(id.to_string())
}

/// Accumulated records for one user, checked against the retraining threshold.
pub async fn count_records_for_user(
    proxy: &DatabaseProxy,
    user_id: &str,
) -> Result<i64, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"SELECT COUNT(*) FROM "ai_learning_records" WHERE "userId" = $1"#,
    )
    .bind(user_id)
    .fetch_optional(proxy.pool())
    .await?;
    Ok(row.map(|(count,)| count).unwrap_or(0))
}

/// Moves a stored record through the pending -> validated/rejected review flow.
/// Returns the number of rows touched so callers can 404 on unknown ids.
pub async fn update_validation_status(
    proxy: &DatabaseProxy,
    record_id: uuid::Uuid,
    status: ValidationStatus,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE "ai_learning_records" SET "validationStatus" = $1 WHERE "id" = $2"#,
    )
    .bind(status.as_str())
    .bind(record_id)
    .execute(proxy.pool())
    .await?;
    Ok(result.rows_affected())
}

/// Window aggregates over the AI learning corpus for dashboards.
#[derive(Debug, Clone, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningWindowMetrics {
    pub total_records: i64,
    pub avg_confidence: f64,
    pub avg_learning_velocity: f64,
    pub validated_records: i64,
}

pub async fn learning_window_metrics(
    proxy: &DatabaseProxy,
    since: DateTime<Utc>,
) -> Result<LearningWindowMetrics, sqlx::Error> {
    let row: Option<(i64, Option<f64>, Option<f64>, i64)> = sqlx::query_as(
        r#"
        SELECT
            COUNT(*),
            AVG("confidence"),
            AVG(("features"->>'learningVelocity')::double precision)
                FILTER (WHERE jsonb_typeof("features"->'learningVelocity') = 'number'),
            COUNT(*) FILTER (WHERE "validationStatus" = 'validated')
        FROM "ai_learning_records"
        WHERE "createdAt" >= $1
        "#,
    )
    .bind(since)
    .fetch_optional(proxy.pool())
    .await?;

    Ok(row
        .map(
            |(total_records, avg_confidence, avg_velocity, validated_records)| {
                LearningWindowMetrics {
                    total_records,
                    avg_confidence: avg_confidence.unwrap_or(0.0),
                    avg_learning_velocity: avg_velocity.unwrap_or(0.0),
                    validated_records,
                }
            },
        )
        .unwrap_or_default())
}

/// Learning records grouped by data type since a cutoff.
pub async fn data_type_breakdown(
    proxy: &DatabaseProxy,
    since: DateTime<Utc>,
) -> Result<Vec<BucketCount>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (Option<String>, i64)>(
        r#"
        SELECT "dataType", COUNT(*)
        FROM "ai_learning_records"
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

/// Learning records grouped by validation status since a cutoff.
pub async fn validation_status_breakdown(
    proxy: &DatabaseProxy,
    since: DateTime<Utc>,
) -> Result<Vec<BucketCount>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (Option<String>, i64)>(
        r#"
        SELECT "validationStatus", COUNT(*)
        FROM "ai_learning_records"
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
