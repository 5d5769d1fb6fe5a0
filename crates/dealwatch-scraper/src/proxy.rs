//! Rotating pool of free HTTP proxies used when a site blocks direct fetches.
//!
//! The pool is an explicitly constructed service passed by reference into the
//! fetch client — there is no global instance. Multiple concurrent fetches may
//! discover the same dead proxy; `mark_bad` is idempotent so double-reporting
//! is harmless.

use std::collections::{HashSet, VecDeque};

use scraper::{Html, Selector};
use tokio::sync::Mutex;

use crate::error::ScraperError;

/// Upper bound on proxies harvested per refresh.
const MAX_HARVESTED_PROXIES: usize = 15;

#[derive(Default)]
struct PoolInner {
    proxies: VecDeque<String>,
    bad: HashSet<String>,
}

pub struct ProxyPool {
    source_url: String,
    inner: Mutex<PoolInner>,
}

impl ProxyPool {
    #[must_use]
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            inner: Mutex::new(PoolInner::default()),
        }
    }

    /// Harvests fresh proxies from the configured free-proxy listing page and
    /// appends them to the pool. Returns the number of proxies added.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the listing page cannot be fetched,
    /// or [`ScraperError::UnexpectedStatus`] on a non-2xx response.
    pub async fn refresh(&self, client: &reqwest::Client) -> Result<usize, ScraperError> {
        let response = client.get(&self.source_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.source_url.clone(),
            });
        }
        let body = response.text().await?;

        let harvested = parse_proxy_list(&body);
        if harvested.is_empty() {
            tracing::warn!(
                source = %self.source_url,
                "no anonymous HTTPS-capable proxies found in listing"
            );
            return Ok(0);
        }

        let mut inner = self.inner.lock().await;
        let added = harvested.len();
        inner.proxies.extend(harvested);
        tracing::info!(added, total = inner.proxies.len(), "proxy pool refreshed");
        Ok(added)
    }

    /// Returns the next usable proxy URL, rotating it to the back of the
    /// queue, or `None` when every entry has been marked bad.
    pub async fn next(&self) -> Option<String> {
        let mut inner = self.inner.lock().await;
        for _ in 0..inner.proxies.len() {
            let proxy = inner.proxies.pop_front()?;
            if inner.bad.contains(&proxy) {
                continue;
            }
            inner.proxies.push_back(proxy.clone());
            return Some(proxy);
        }
        None
    }

    /// Marks a proxy as dead. Marking an already-dead proxy is a no-op.
    pub async fn mark_bad(&self, proxy: &str) {
        let mut inner = self.inner.lock().await;
        if inner.bad.insert(proxy.to_owned()) {
            tracing::info!(proxy, "proxy marked bad");
        }
    }

    /// Drops all proxies and the bad list. Called at the start of each crawl
    /// cycle before a fresh harvest.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.proxies.clear();
        inner.bad.clear();
    }

    /// Number of proxies currently held, bad or not.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.proxies.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.proxies.is_empty()
    }

    #[cfg(test)]
    pub(crate) async fn seed(&self, proxies: Vec<String>) {
        let mut inner = self.inner.lock().await;
        inner.proxies.extend(proxies);
    }
}

/// Extracts up to [`MAX_HARVESTED_PROXIES`] proxy URLs from a free-proxy
/// listing page, keeping only anonymous entries that support HTTPS.
fn parse_proxy_list(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let row_sel = Selector::parse("table.table-striped tbody tr").expect("static selector");
    let cell_sel = Selector::parse("td").expect("static selector");

    let mut proxies = Vec::new();
    for row in document.select(&row_sel) {
        let cells: Vec<String> = row
            .select(&cell_sel)
            .map(|td| td.text().collect::<String>().trim().to_owned())
            .collect();
        if cells.len() < 7 {
            continue;
        }
        let anonymity = cells[4].to_lowercase();
        let https = cells[6].to_lowercase();
        if https == "yes" && anonymity == "anonymous" {
            proxies.push(format!("http://{}:{}", cells[0], cells[1]));
            if proxies.len() >= MAX_HARVESTED_PROXIES {
                break;
            }
        }
    }
    proxies
}
