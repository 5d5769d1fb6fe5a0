//! Persistence seams between the worker and the database.
//!
//! The cycle only ever talks to `dyn AnchorStore` and the pipeline to
//! `dyn SubscriptionStore`, so tests run against in-memory fakes while
//! production wires in the `Pg*` implementations. Each (keyword, site) pair's
//! anchor record is logically partitioned; the scheduler guarantees at most
//! one in-flight crawl per pair, so reads and writes of one pair never
//! interleave.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use dealwatch_core::Site;
use dealwatch_db::{DbError, SubscriberRow};
pub use dealwatch_db::AnchorSnapshot;

use crate::cycle::CrawlKeyword;

#[derive(Debug, Error)]
pub enum AnchorStoreError {
    #[error("database error: {0}")]
    Db(#[from] dealwatch_db::DbError),

    #[error("anchor store failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait AnchorStore: Send + Sync {
    /// Returns the stored anchor-ID window for a pair, newest-first, or
    /// `None` if the pair has never been crawled successfully.
    async fn get(
        &self,
        keyword_id: i64,
        site: Site,
    ) -> Result<Option<Vec<String>>, AnchorStoreError>;

    /// Replaces the pair's anchor window and newest-item snapshot.
    async fn upsert(
        &self,
        keyword_id: i64,
        site: Site,
        anchor_ids: &[String],
        snapshot: &AnchorSnapshot,
    ) -> Result<(), AnchorStoreError>;
}

/// Postgres-backed anchor store over the `keyword_anchors` table.
pub struct PgAnchorStore {
    pool: PgPool,
}

impl PgAnchorStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnchorStore for PgAnchorStore {
    async fn get(
        &self,
        keyword_id: i64,
        site: Site,
    ) -> Result<Option<Vec<String>>, AnchorStoreError> {
        Ok(dealwatch_db::get_anchor_ids(&self.pool, keyword_id, site).await?)
    }

    async fn upsert(
        &self,
        keyword_id: i64,
        site: Site,
        anchor_ids: &[String],
        snapshot: &AnchorSnapshot,
    ) -> Result<(), AnchorStoreError> {
        Ok(dealwatch_db::upsert_anchor(&self.pool, keyword_id, site, anchor_ids, snapshot).await?)
    }
}

/// Subscription directory reads and mail-log writes used by the run pipeline.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Keywords with at least one subscriber, in crawl order.
    async fn subscribed_keywords(&self) -> Result<Vec<CrawlKeyword>, DbError>;

    /// Every user with at least one subscription.
    async fn subscribers(&self) -> Result<Vec<SubscriberRow>, DbError>;

    /// Records one email handed to the mail transport. Best-effort: callers
    /// treat a failure here as non-fatal.
    async fn record_mail(
        &self,
        user_id: Uuid,
        subject: &str,
        item_count: i32,
    ) -> Result<(), DbError>;
}

/// Postgres-backed subscription directory.
pub struct PgSubscriptionStore {
    pool: PgPool,
}

impl PgSubscriptionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    async fn subscribed_keywords(&self) -> Result<Vec<CrawlKeyword>, DbError> {
        let rows = dealwatch_db::list_subscribed_keywords(&self.pool).await?;
        Ok(rows.into_iter().map(CrawlKeyword::from).collect())
    }

    async fn subscribers(&self) -> Result<Vec<SubscriberRow>, DbError> {
        dealwatch_db::list_subscribers(&self.pool).await
    }

    async fn record_mail(
        &self,
        user_id: Uuid,
        subject: &str,
        item_count: i32,
    ) -> Result<(), DbError> {
        dealwatch_db::insert_mail_log(&self.pool, user_id, subject, item_count).await
    }
}
