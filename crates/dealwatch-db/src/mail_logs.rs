//! Database operations for the `mail_logs` table.

use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// Records one notification email that was actually handed to the mail
/// transport. Best-effort bookkeeping; callers treat a failure here as
/// non-fatal.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_mail_log(
    pool: &PgPool,
    user_id: Uuid,
    subject: &str,
    item_count: i32,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO mail_logs (user_id, subject, item_count) VALUES ($1, $2, $3)",
    )
    .bind(user_id)
    .bind(subject)
    .bind(item_count)
    .execute(pool)
    .await?;

    Ok(())
}
