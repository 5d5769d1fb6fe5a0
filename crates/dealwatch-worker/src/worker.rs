//! End-to-end orchestration of one crawl-and-notify run.

use sqlx::PgPool;
use thiserror::Error;

use dealwatch_core::{AppConfig, Environment};
use dealwatch_notify::{LogNotifier, Notifier, NotifyError, SmtpNotifier};
use dealwatch_scraper::{AdapterRegistry, FetchClient, ProxyPool, ScraperError};

use crate::cycle::{run_cycle, CycleLimits};
use crate::dispatch::dispatch_notifications;
use crate::store::{AnchorStore, PgAnchorStore, PgSubscriptionStore, SubscriptionStore};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("database error: {0}")]
    Db(#[from] dealwatch_db::DbError),

    #[error("failed to build fetch client: {0}")]
    Client(#[from] ScraperError),

    #[error("failed to build mail transport: {0}")]
    Mailer(#[from] NotifyError),
}

/// What one run did, for the end-of-run log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub keywords_crawled: usize,
    pub keywords_with_new_items: usize,
    pub new_items: usize,
    pub emails_sent: usize,
}

/// Long-lived crawl-and-notify worker: owns the adapter registry, the fetch
/// transport with its proxy pool, and the mail transport. One instance serves
/// every scheduled run for the lifetime of the process.
pub struct Worker {
    pool: PgPool,
    registry: AdapterRegistry,
    client: FetchClient,
    notifier: Box<dyn Notifier>,
    limits: CycleLimits,
}

impl Worker {
    /// Wires a worker from config: default site adapters, a fetch client with
    /// the configured proxy source, and SMTP delivery in production when
    /// credentials exist, otherwise log-only delivery.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Client`] if the HTTP client cannot be built, or
    /// [`WorkerError::Mailer`] if the SMTP relay parameters are invalid.
    pub fn from_config(config: &AppConfig, pool: PgPool) -> Result<Self, WorkerError> {
        let client = FetchClient::new(
            config.fetch_timeout_secs,
            &config.fetch_user_agent,
            ProxyPool::new(config.proxy_source_url.clone()),
        )?;

        let notifier: Box<dyn Notifier> = match (&config.smtp, config.env) {
            (Some(smtp), Environment::Production) => Box::new(SmtpNotifier::new(smtp)?),
            _ => {
                tracing::info!("mail delivery disabled; notifications will be logged");
                Box::new(LogNotifier)
            }
        };

        Ok(Self {
            pool,
            registry: AdapterRegistry::with_default_sites(),
            client,
            notifier,
            limits: CycleLimits::from_app_config(config),
        })
    }

    /// Runs one full cycle: refresh the proxy pool, load keywords and
    /// subscribers, crawl, dispatch notifications, and record mail logs.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Db`] when the keyword or subscriber load fails;
    /// everything downstream of those reads is contained per pair or per
    /// recipient and surfaces only in the summary and the logs.
    pub async fn run_once(&self) -> Result<RunSummary, WorkerError> {
        self.refresh_proxies().await;

        let subscriptions = PgSubscriptionStore::new(self.pool.clone());
        let store = PgAnchorStore::new(self.pool.clone());
        run_pipeline(
            &subscriptions,
            &self.registry,
            &self.client,
            &store,
            self.notifier.as_ref(),
            self.limits,
        )
        .await
    }

    /// Discards the previous cycle's proxy state and harvests a fresh list.
    /// Harvest failure is non-fatal: direct fetches still work, only the
    /// block fallback is degraded.
    async fn refresh_proxies(&self) {
        let proxies = self.client.proxy_pool();
        proxies.reset().await;
        match proxies.refresh(self.client.http_client()).await {
            Ok(count) => tracing::debug!(count, "proxy pool refreshed"),
            Err(error) => tracing::warn!(%error, "proxy refresh failed; continuing without proxies"),
        }
    }
}

/// One crawl-and-notify pass over the given stores.
///
/// Both directory reads happen before any crawling: once `run_cycle` starts,
/// anchor windows advance past the items it finds, so a subscriber-load
/// failure after that point would lose those items for good. Failing the
/// cycle while the anchor state is still untouched means the same items are
/// re-detected on the next trigger.
async fn run_pipeline(
    subscriptions: &dyn SubscriptionStore,
    registry: &AdapterRegistry,
    client: &FetchClient,
    store: &dyn AnchorStore,
    notifier: &dyn Notifier,
    limits: CycleLimits,
) -> Result<RunSummary, WorkerError> {
    let keywords = subscriptions.subscribed_keywords().await?;
    if keywords.is_empty() {
        tracing::info!("no subscribed keywords; skipping cycle");
        return Ok(RunSummary::default());
    }
    let subscribers = subscriptions.subscribers().await?;

    let keywords_crawled = keywords.len();
    let results = run_cycle(&keywords, registry, client, store, limits).await;

    let mut summary = RunSummary {
        keywords_crawled,
        keywords_with_new_items: results.len(),
        new_items: results.values().map(|r| r.items.len()).sum(),
        ..RunSummary::default()
    };

    if results.is_empty() {
        tracing::info!(keywords = keywords_crawled, "cycle complete, nothing new");
        return Ok(summary);
    }

    let sent = dispatch_notifications(&subscribers, &results, notifier).await;
    summary.emails_sent = sent.len();

    for notification in &sent {
        let item_count = i32::try_from(notification.item_count).unwrap_or(i32::MAX);
        if let Err(error) = subscriptions
            .record_mail(notification.user_id, &notification.subject, item_count)
            .await
        {
            tracing::warn!(email = %notification.email, %error, "failed to record mail log");
        }
    }

    tracing::info!(
        keywords = summary.keywords_crawled,
        with_new_items = summary.keywords_with_new_items,
        new_items = summary.new_items,
        emails = summary.emails_sent,
        "cycle complete"
    );
    Ok(summary)
}

#[cfg(test)]
#[path = "worker_test.rs"]
mod tests;
