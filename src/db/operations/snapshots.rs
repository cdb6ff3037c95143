use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::DatabaseProxy;

/// An immutable point-in-time metrics snapshot written by the aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub id: String,
    pub window: String,
    pub metrics: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

pub async fn insert_snapshot(
    proxy: &DatabaseProxy,
    window: &str,
    metrics: &serde_json::Value,
) -> Result<String, sqlx::Error> {
    let id = uuid::Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO "analytics_snapshots" ("id", "window", "metrics", "createdAt")
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(id)
    .bind(window)
    .bind(metrics)
    .bind(now)
    .execute(proxy.pool())
    .await?;
    Ok(id.to_string())
}

pub async fn fetch_recent_snapshots(
    proxy: &DatabaseProxy,
    window: Option<&str>,
    limit: i64,
) -> Result<Vec<AnalyticsSnapshot>, sqlx::Error> {
    let rows = match window {
        Some(window) => {
            sqlx::query_as::<_, (uuid::Uuid, String, serde_json::Value, DateTime<Utc>)>(
                r#"
                SELECT "id", "window", "metrics", "createdAt"
                FROM "analytics_snapshots"
                WHERE "window" = $1
                ORDER BY "createdAt" DESC
                LIMIT $2
                "#,
            )
            .bind(window)
            .bind(limit)
            .fetch_all(proxy.pool())
            .await?
        }
        None => {
            sqlx::query_as::<_, (uuid::Uuid, String, serde_json::Value, DateTime<Utc>)>(
                r#"
                SELECT "id", "window", "metrics", "createdAt"
                FROM "analytics_snapshots"
                ORDER BY "createdAt" DESC
                LIMIT $1
                "#,
            )
            .bind(limit)
            .fetch_all(proxy.pool())
            .await?
        }
    };

    Ok(rows
        .into_iter()
        .map(|(id, window, metrics, created_at)| AnalyticsSnapshot {
            id: id.to_string(),
            window,
            metrics,
            created_at,
        })
        .collect())
}
