//! Database operations for the `keyword_anchors` table.
//!
//! One row per (keyword, site) pair: the ordered anchor-ID window observed on
//! the last successful crawl plus a snapshot of the newest item. The change
//! detector reads the window before a crawl and replaces it wholesale when new
//! items are found; rows disappear only through the keyword cascade.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use dealwatch_core::Site;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `keyword_anchors` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnchorRow {
    pub keyword_id: i64,
    pub site: String,
    /// External item IDs, most-recent-first.
    pub anchor_ids: Vec<String>,
    pub link: Option<String>,
    pub price: Option<String>,
    pub meta_data: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Snapshot fields of the newest item, stored alongside the anchor window for
/// lightweight inspection without re-fetching the site.
#[derive(Debug, Clone, Default)]
pub struct AnchorSnapshot {
    pub link: Option<String>,
    pub price: Option<String>,
    pub meta_data: Option<String>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns the stored anchor-ID window for a (keyword, site) pair, or `None`
/// if the pair has never been crawled successfully.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_anchor_ids(
    pool: &PgPool,
    keyword_id: i64,
    site: Site,
) -> Result<Option<Vec<String>>, DbError> {
    let ids = sqlx::query_scalar::<_, Vec<String>>(
        "SELECT anchor_ids FROM keyword_anchors WHERE keyword_id = $1 AND site = $2",
    )
    .bind(keyword_id)
    .bind(site.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(ids)
}

/// Returns every stored anchor row for a keyword, ordered by site. Used for
/// inspecting crawl state without re-fetching the sites.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_anchors(pool: &PgPool, keyword_id: i64) -> Result<Vec<AnchorRow>, DbError> {
    let rows = sqlx::query_as::<_, AnchorRow>(
        "SELECT keyword_id, site, anchor_ids, link, price, meta_data, updated_at \
         FROM keyword_anchors WHERE keyword_id = $1 ORDER BY site",
    )
    .bind(keyword_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Replaces the anchor window and newest-item snapshot for a (keyword, site)
/// pair, creating the row on first crawl.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_anchor(
    pool: &PgPool,
    keyword_id: i64,
    site: Site,
    anchor_ids: &[String],
    snapshot: &AnchorSnapshot,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO keyword_anchors (keyword_id, site, anchor_ids, link, price, meta_data, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, NOW()) \
         ON CONFLICT (keyword_id, site) DO UPDATE \
         SET anchor_ids = EXCLUDED.anchor_ids, \
             link = EXCLUDED.link, \
             price = EXCLUDED.price, \
             meta_data = EXCLUDED.meta_data, \
             updated_at = NOW()",
    )
    .bind(keyword_id)
    .bind(site.as_str())
    .bind(anchor_ids)
    .bind(&snapshot.link)
    .bind(&snapshot.price)
    .bind(&snapshot.meta_data)
    .execute(pool)
    .await?;

    Ok(())
}
