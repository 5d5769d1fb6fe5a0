//! Database operations for the `users` table and subscription lookups.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub nickname: String,
    pub created_at: DateTime<Utc>,
}

/// A subscriber with the IDs of the keywords they follow. Users without any
/// subscription are not returned.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubscriberRow {
    pub id: Uuid,
    pub email: String,
    pub nickname: String,
    pub keyword_ids: Vec<i64>,
}

/// Creates a user, or updates the nickname of the existing user with this
/// email.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_user(pool: &PgPool, email: &str, nickname: &str) -> Result<UserRow, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (email, nickname) VALUES ($1, $2) \
         ON CONFLICT (email) DO UPDATE SET nickname = EXCLUDED.nickname \
         RETURNING id, email, nickname, created_at",
    )
    .bind(email)
    .bind(nickname)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns a user by email, or `None` if absent.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, nickname, created_at FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns every user with at least one keyword subscription, along with the
/// subscribed keyword IDs. Used by notification dispatch after a crawl cycle.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_subscribers(pool: &PgPool) -> Result<Vec<SubscriberRow>, DbError> {
    let rows = sqlx::query_as::<_, SubscriberRow>(
        "SELECT u.id, u.email, u.nickname, \
                array_agg(uk.keyword_id ORDER BY uk.keyword_id) AS keyword_ids \
         FROM users u \
         JOIN user_keywords uk ON uk.user_id = u.id \
         GROUP BY u.id, u.email, u.nickname \
         ORDER BY u.email",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
