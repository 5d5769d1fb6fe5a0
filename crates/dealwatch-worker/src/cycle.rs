//! One crawl cycle: bounded-concurrency fan-out over keyword × site pairs.
//!
//! Two independent caps bind at the same time: a keyword-level cap on how many
//! keywords are in flight (total outbound volume) and a per-site cap shared
//! across all keywords (one site's rate limiting). A single pair failing —
//! fetch, parse transport, or anchor store — is logged and contributes zero
//! items; it never aborts sibling crawls or the cycle.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use rand::Rng;
use thiserror::Error;
use tokio::sync::Semaphore;

use dealwatch_core::{AppConfig, ListingItem, Site};
use dealwatch_scraper::{AdapterRegistry, FetchClient, ScraperError, SiteAdapter};

use crate::detect::detect_new;
use crate::store::{AnchorSnapshot, AnchorStore, AnchorStoreError};

/// A keyword handed to the cycle, with its DB identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlKeyword {
    pub id: i64,
    pub title: String,
}

impl From<dealwatch_db::KeywordRow> for CrawlKeyword {
    fn from(row: dealwatch_db::KeywordRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
        }
    }
}

/// New items found for one keyword in one cycle, aggregated across sites in
/// registry order with each site's items newest-first.
#[derive(Debug, Clone)]
pub struct KeywordNewItems {
    pub keyword: CrawlKeyword,
    pub items: Vec<ListingItem>,
}

/// Concurrency caps and jitter bounds for one cycle.
#[derive(Debug, Clone, Copy)]
pub struct CycleLimits {
    pub max_concurrent_keywords: usize,
    pub per_site_fetch_limit: usize,
    /// Jitter slept before dispatching each keyword (min, max) ms.
    pub keyword_jitter_ms: (u64, u64),
    /// Jitter slept before each individual site fetch (min, max) ms.
    pub site_jitter_ms: (u64, u64),
}

impl CycleLimits {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_concurrent_keywords: config.max_concurrent_keywords,
            per_site_fetch_limit: config.per_site_fetch_limit,
            keyword_jitter_ms: config.keyword_jitter_ms,
            site_jitter_ms: config.site_jitter_ms,
        }
    }

    /// Production defaults: 5 keywords, 2 fetches per site, jitter on.
    #[must_use]
    pub fn default_caps() -> Self {
        Self {
            max_concurrent_keywords: 5,
            per_site_fetch_limit: 2,
            keyword_jitter_ms: (500, 1500),
            site_jitter_ms: (1000, 3000),
        }
    }
}

#[derive(Debug, Error)]
enum PairError {
    #[error(transparent)]
    Scrape(#[from] ScraperError),

    #[error(transparent)]
    Store(#[from] AnchorStoreError),
}

/// Runs one crawl cycle over the full keyword × registered-site cross product.
///
/// Returns only the keywords that yielded at least one new item, keyed by
/// keyword ID. Never fails as a whole: every per-pair error is contained and
/// logged with keyword and site context.
pub async fn run_cycle(
    keywords: &[CrawlKeyword],
    registry: &AdapterRegistry,
    client: &FetchClient,
    store: &dyn AnchorStore,
    limits: CycleLimits,
) -> BTreeMap<i64, KeywordNewItems> {
    // One permit pool per site, shared across every keyword in this cycle.
    let site_permits: HashMap<Site, Arc<Semaphore>> = registry
        .active_sites()
        .into_iter()
        .map(|site| {
            (
                site,
                Arc::new(Semaphore::new(limits.per_site_fetch_limit.max(1))),
            )
        })
        .collect();
    let site_permits = &site_permits;

    let results: Vec<KeywordNewItems> = stream::iter(keywords.iter().cloned())
        .map(|keyword| keyword_task(keyword, registry, client, store, site_permits, limits))
        .buffer_unordered(limits.max_concurrent_keywords.max(1))
        .collect()
        .await;

    results
        .into_iter()
        .filter(|r| !r.items.is_empty())
        .map(|r| (r.keyword.id, r))
        .collect()
}

/// Jitters, crawls one keyword, and wraps the result with its keyword.
///
/// Takes the keyword by value so the mapped future carries no borrowed
/// keyword lifetime, which `buffer_unordered` would otherwise require to be
/// higher-ranked.
async fn keyword_task(
    keyword: CrawlKeyword,
    registry: &AdapterRegistry,
    client: &FetchClient,
    store: &dyn AnchorStore,
    site_permits: &HashMap<Site, Arc<Semaphore>>,
    limits: CycleLimits,
) -> KeywordNewItems {
    sleep_jitter(limits.keyword_jitter_ms).await;
    let items = crawl_keyword(&keyword, registry, client, store, site_permits, limits).await;
    KeywordNewItems { keyword, items }
}

/// Crawls one keyword across every registered site in parallel, bounded by
/// the shared per-site permits, and concatenates the new items in site order.
async fn crawl_keyword(
    keyword: &CrawlKeyword,
    registry: &AdapterRegistry,
    client: &FetchClient,
    store: &dyn AnchorStore,
    site_permits: &HashMap<Site, Arc<Semaphore>>,
    limits: CycleLimits,
) -> Vec<ListingItem> {
    tracing::info!(keyword = %keyword.title, "processing keyword");

    let crawls = registry.iter().map(|(site, adapter)| {
        let permits = Arc::clone(&site_permits[&site]);
        async move {
            // Semaphore is never closed while the cycle holds it.
            let _permit = permits.acquire().await.expect("site permit pool closed");
            sleep_jitter(limits.site_jitter_ms).await;
            (site, crawl_pair(keyword, site, adapter.as_ref(), client, store).await)
        }
    });

    // join_all preserves registry order, which fixes aggregation order.
    let outcomes = futures::future::join_all(crawls).await;

    let mut all_items = Vec::new();
    for (site, outcome) in outcomes {
        match outcome {
            Ok(items) => all_items.extend(items),
            Err(error) => {
                tracing::error!(
                    keyword = %keyword.title,
                    site = %site,
                    %error,
                    "crawl failed for pair"
                );
            }
        }
    }

    if all_items.is_empty() {
        tracing::info!(keyword = %keyword.title, "no new items");
    } else {
        tracing::info!(
            keyword = %keyword.title,
            new_items = all_items.len(),
            "new items found"
        );
    }
    all_items
}

/// Fetch, detect, persist for a single (keyword, site) pair.
///
/// An anchor-store error aborts the pair without writing state: a partial
/// write would corrupt the next comparison, whereas a skipped pair self-heals
/// on the following cycle.
async fn crawl_pair(
    keyword: &CrawlKeyword,
    site: Site,
    adapter: &dyn SiteAdapter,
    client: &FetchClient,
    store: &dyn AnchorStore,
) -> Result<Vec<ListingItem>, PairError> {
    let fetched = adapter.fetch_and_parse(client, &keyword.title).await?;
    if fetched.is_empty() {
        return Ok(Vec::new());
    }

    let stored = store.get(keyword.id, site).await?;
    let detection = detect_new(&fetched, stored.as_deref());
    if detection.new_items.is_empty() {
        return Ok(Vec::new());
    }

    let newest = &detection.new_items[0];
    let snapshot = AnchorSnapshot {
        link: Some(newest.link.clone()),
        price: newest.price.clone(),
        meta_data: newest.meta_data.clone(),
    };
    store
        .upsert(keyword.id, site, &detection.anchor_ids, &snapshot)
        .await?;

    Ok(detection.new_items)
}

/// Sleeps a uniformly random duration within `(min, max)` milliseconds.
/// `(0, 0)` disables the jitter entirely (tests).
async fn sleep_jitter((min, max): (u64, u64)) {
    if max == 0 {
        return;
    }
    let ms = if min >= max {
        min
    } else {
        rand::rng().random_range(min..=max)
    };
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

#[cfg(test)]
#[path = "cycle_test.rs"]
mod tests;
