use sqlx::SqliteConnection;

use crate::db_types::WebhookFailure;

pub async fn insert_failure(
    payload: &str,
    error: &str,
    conn: &mut SqliteConnection,
) -> Result<WebhookFailure, sqlx::Error> {
    let failure = sqlx::query_as("INSERT INTO webhook_failures (payload, error) VALUES ($1, $2) RETURNING *")
        .bind(payload)
        .bind(error)
        .fetch_one(conn)
        .await?;
    Ok(failure)
}

pub async fn fetch_recent_failures(limit: i64, conn: &mut SqliteConnection) -> Result<Vec<WebhookFailure>, sqlx::Error> {
    let failures = sqlx::query_as("SELECT * FROM webhook_failures ORDER BY created_at DESC, id DESC LIMIT $1")
        .bind(limit)
        .fetch_all(conn)
        .await?;
    Ok(failures)
}
