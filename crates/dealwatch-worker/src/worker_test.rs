use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use dealwatch_core::{ListingItem, Site};
use dealwatch_db::{DbError, SubscriberRow};
use dealwatch_notify::NotifyError;
use dealwatch_scraper::{AdapterRegistry, FetchClient, ProxyPool, ScraperError, SiteAdapter};

use super::*;
use crate::cycle::CrawlKeyword;
use crate::store::{AnchorSnapshot, AnchorStoreError};

fn test_client() -> FetchClient {
    FetchClient::new(5, "dealwatch-test/0.1", ProxyPool::new("http://unused.example")).unwrap()
}

fn test_limits() -> CycleLimits {
    CycleLimits {
        max_concurrent_keywords: 5,
        per_site_fetch_limit: 2,
        keyword_jitter_ms: (0, 0),
        site_jitter_ms: (0, 0),
    }
}

fn item(id: &str) -> ListingItem {
    ListingItem {
        external_id: id.to_owned(),
        title: format!("Title {id}"),
        link: format!("https://example.com/{id}"),
        price: Some("1000".to_owned()),
        meta_data: None,
        site: Site::Algumon,
        search_url: "https://example.com/search".to_owned(),
    }
}

struct FixedAdapter {
    items: Vec<ListingItem>,
}

#[async_trait]
impl SiteAdapter for FixedAdapter {
    fn site(&self) -> Site {
        Site::Algumon
    }

    fn search_url(&self, keyword: &str) -> String {
        format!("https://example.com/search/{keyword}")
    }

    fn parse(&self, _html: &str, _search_url: &str) -> Vec<ListingItem> {
        Vec::new()
    }

    async fn fetch_and_parse(
        &self,
        _client: &FetchClient,
        _keyword: &str,
    ) -> Result<Vec<ListingItem>, ScraperError> {
        Ok(self.items.clone())
    }
}

fn registry_with_items(items: Vec<ListingItem>) -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    registry.register(std::sync::Arc::new(FixedAdapter { items }));
    registry
}

/// Anchor store that only counts writes; every pair reads as never-crawled.
#[derive(Default)]
struct CountingStore {
    upserts: AtomicUsize,
}

#[async_trait]
impl AnchorStore for CountingStore {
    async fn get(
        &self,
        _keyword_id: i64,
        _site: Site,
    ) -> Result<Option<Vec<String>>, AnchorStoreError> {
        Ok(None)
    }

    async fn upsert(
        &self,
        _keyword_id: i64,
        _site: Site,
        _anchor_ids: &[String],
        _snapshot: &AnchorSnapshot,
    ) -> Result<(), AnchorStoreError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeSubscriptions {
    keywords: Vec<CrawlKeyword>,
    subscribers: Vec<SubscriberRow>,
    fail_subscribers: bool,
    subscriber_reads: AtomicUsize,
    mail_logs: AtomicUsize,
}

impl FakeSubscriptions {
    fn new(keywords: Vec<CrawlKeyword>, subscribers: Vec<SubscriberRow>) -> Self {
        Self {
            keywords,
            subscribers,
            fail_subscribers: false,
            subscriber_reads: AtomicUsize::new(0),
            mail_logs: AtomicUsize::new(0),
        }
    }

    fn failing_subscribers(keywords: Vec<CrawlKeyword>) -> Self {
        let mut fake = Self::new(keywords, Vec::new());
        fake.fail_subscribers = true;
        fake
    }
}

#[async_trait]
impl SubscriptionStore for FakeSubscriptions {
    async fn subscribed_keywords(&self) -> Result<Vec<CrawlKeyword>, DbError> {
        Ok(self.keywords.clone())
    }

    async fn subscribers(&self) -> Result<Vec<SubscriberRow>, DbError> {
        self.subscriber_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_subscribers {
            return Err(DbError::Sqlx(sqlx::Error::PoolClosed));
        }
        Ok(self.subscribers.clone())
    }

    async fn record_mail(
        &self,
        _user_id: Uuid,
        _subject: &str,
        _item_count: i32,
    ) -> Result<(), DbError> {
        self.mail_logs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct SinkNotifier {
    sends: AtomicUsize,
}

#[async_trait]
impl Notifier for SinkNotifier {
    async fn send(&self, _to: &str, _subject: &str, _html_body: &str) -> Result<(), NotifyError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn keyword(id: i64, title: &str) -> CrawlKeyword {
    CrawlKeyword {
        id,
        title: title.to_owned(),
    }
}

fn subscriber(email: &str, keyword_ids: &[i64]) -> SubscriberRow {
    SubscriberRow {
        id: Uuid::new_v4(),
        email: email.to_owned(),
        nickname: email.to_owned(),
        keyword_ids: keyword_ids.to_vec(),
    }
}

#[tokio::test]
async fn subscriber_load_failure_aborts_before_anchor_state_moves() {
    // If this failed after crawling, the advanced anchor windows would
    // swallow the cycle's items with no email ever going out.
    let subscriptions = FakeSubscriptions::failing_subscribers(vec![keyword(1, "tv")]);
    let registry = registry_with_items(vec![item("101"), item("100")]);
    let store = CountingStore::default();
    let notifier = SinkNotifier::default();

    let result = run_pipeline(
        &subscriptions,
        &registry,
        &test_client(),
        &store,
        &notifier,
        test_limits(),
    )
    .await;

    assert!(matches!(result, Err(WorkerError::Db(_))));
    assert_eq!(store.upserts.load(Ordering::SeqCst), 0);
    assert_eq!(notifier.sends.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn full_run_crawls_notifies_and_records_mail() {
    let subscriptions = FakeSubscriptions::new(
        vec![keyword(1, "tv")],
        vec![subscriber("a@example.com", &[1])],
    );
    let registry = registry_with_items(vec![item("101"), item("100")]);
    let store = CountingStore::default();
    let notifier = SinkNotifier::default();

    let summary = run_pipeline(
        &subscriptions,
        &registry,
        &test_client(),
        &store,
        &notifier,
        test_limits(),
    )
    .await
    .unwrap();

    // First crawl of the pair: one suppressed teaser item.
    assert_eq!(
        summary,
        RunSummary {
            keywords_crawled: 1,
            keywords_with_new_items: 1,
            new_items: 1,
            emails_sent: 1,
        }
    );
    assert_eq!(store.upserts.load(Ordering::SeqCst), 1);
    assert_eq!(notifier.sends.load(Ordering::SeqCst), 1);
    assert_eq!(subscriptions.mail_logs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn no_subscribed_keywords_skips_the_subscriber_read() {
    let subscriptions = FakeSubscriptions::failing_subscribers(Vec::new());
    let registry = registry_with_items(vec![item("101")]);
    let store = CountingStore::default();
    let notifier = SinkNotifier::default();

    let summary = run_pipeline(
        &subscriptions,
        &registry,
        &test_client(),
        &store,
        &notifier,
        test_limits(),
    )
    .await
    .unwrap();

    assert_eq!(summary, RunSummary::default());
    assert_eq!(subscriptions.subscriber_reads.load(Ordering::SeqCst), 0);
    assert_eq!(store.upserts.load(Ordering::SeqCst), 0);
}
