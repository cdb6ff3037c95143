use chrono::Utc;

use crate::db::DatabaseProxy;

pub async fn insert_assessment_score(
    proxy: &DatabaseProxy,
    user_id: &str,
    session_id: Option<&str>,
    eiq_score: f64,
) -> Result<String, sqlx::Error> {
    let id = uuid::Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO "assessments" ("id", "userId", "sessionId", "eiqScore", "createdAt")
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(session_id)
    .bind(eiq_score)
    .bind(now)
    .execute(proxy.pool())
    .await?;
    Ok(id.to_string())
}

/// EIQ score history for a user, oldest first, as the growth model expects.
pub async fn fetch_user_scores(
    proxy: &DatabaseProxy,
    user_id: &str,
) -> Result<Vec<f64>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (f64,)>(
        r#"
        SELECT "eiqScore" FROM "assessments"
        WHERE "userId" = $1
        ORDER BY "createdAt" ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(proxy.pool())
    .await?;
    Ok(rows.into_iter().map(|(score,)| score).collect())
}
