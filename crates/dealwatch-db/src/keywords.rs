//! Database operations for the `keywords` and `user_keywords` tables.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `keywords` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KeywordRow {
    pub id: i64,
    /// Normalized search term (see `dealwatch_core::normalize_keyword`).
    pub title: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns every keyword, ordered by title.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_keywords(pool: &PgPool) -> Result<Vec<KeywordRow>, DbError> {
    let rows = sqlx::query_as::<_, KeywordRow>(
        "SELECT id, title, created_at FROM keywords ORDER BY title",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns the keywords that have at least one subscriber, ordered by title.
///
/// Keywords nobody subscribes to are skipped by the crawl cycle entirely.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_subscribed_keywords(pool: &PgPool) -> Result<Vec<KeywordRow>, DbError> {
    let rows = sqlx::query_as::<_, KeywordRow>(
        "SELECT k.id, k.title, k.created_at \
         FROM keywords k \
         WHERE EXISTS (SELECT 1 FROM user_keywords uk WHERE uk.keyword_id = k.id) \
         ORDER BY k.title",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a keyword by its normalized title, or `None` if absent.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_keyword_by_title(
    pool: &PgPool,
    title: &str,
) -> Result<Option<KeywordRow>, DbError> {
    let row = sqlx::query_as::<_, KeywordRow>(
        "SELECT id, title, created_at FROM keywords WHERE title = $1",
    )
    .bind(title)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Inserts a keyword, returning the existing row when the title is already
/// registered.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_keyword(pool: &PgPool, title: &str) -> Result<KeywordRow, DbError> {
    let row = sqlx::query_as::<_, KeywordRow>(
        "INSERT INTO keywords (title) VALUES ($1) \
         ON CONFLICT (title) DO UPDATE SET title = EXCLUDED.title \
         RETURNING id, title, created_at",
    )
    .bind(title)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Subscribes a user to a keyword. Re-subscribing is a no-op.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn link_user_keyword(pool: &PgPool, user_id: Uuid, keyword_id: i64) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO user_keywords (user_id, keyword_id) VALUES ($1, $2) \
         ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(keyword_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Removes a user's subscription to a keyword.
///
/// Returns `true` if a subscription was actually removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn unlink_user_keyword(
    pool: &PgPool,
    user_id: Uuid,
    keyword_id: i64,
) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM user_keywords WHERE user_id = $1 AND keyword_id = $2")
        .bind(user_id)
        .bind(keyword_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Deletes a keyword if no subscriber remains. Anchor records go with it via
/// the foreign-key cascade.
///
/// Returns `true` if the keyword was deleted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_keyword_if_unused(pool: &PgPool, keyword_id: i64) -> Result<bool, DbError> {
    let result = sqlx::query(
        "DELETE FROM keywords k \
         WHERE k.id = $1 \
           AND NOT EXISTS (SELECT 1 FROM user_keywords uk WHERE uk.keyword_id = k.id)",
    )
    .bind(keyword_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
