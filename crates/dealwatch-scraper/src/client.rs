use std::time::Duration;

use reqwest::Client;

use crate::error::ScraperError;
use crate::proxy::ProxyPool;

/// Block statuses that trigger the proxy fallback. 430 is a non-standard
/// "request blocked" status used by some Korean community sites.
const BLOCK_STATUSES: [u16; 2] = [403, 430];

/// Attempts through the proxy pool before giving up on a blocked URL.
const MAX_PROXY_ATTEMPTS: usize = 15;

/// HTTP fetch transport shared by all site adapters.
///
/// Fetches directly through one pooled `reqwest::Client`; when a site answers
/// with a block status (403/430) the request is retried through rotating
/// proxies from the injected [`ProxyPool`]. Each attempt is bounded by the
/// configured timeout.
pub struct FetchClient {
    client: Client,
    proxies: ProxyPool,
    timeout_secs: u64,
}

impl FetchClient {
    /// Creates a `FetchClient` with configured timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        proxies: ProxyPool,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            proxies,
            timeout_secs,
        })
    }

    /// The rotating proxy pool backing the block fallback.
    #[must_use]
    pub fn proxy_pool(&self) -> &ProxyPool {
        &self.proxies
    }

    /// The shared direct-fetch client, also used for proxy-list harvesting.
    #[must_use]
    pub fn http_client(&self) -> &Client {
        &self.client
    }

    /// Fetches a page as text, falling back to the proxy pool when the site
    /// answers with a block status.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::Http`] — network failure or timeout on the direct fetch.
    /// - [`ScraperError::UnexpectedStatus`] — non-2xx, non-block response.
    /// - [`ScraperError::ProxiesExhausted`] — blocked, and every proxy attempt
    ///   failed or the pool ran dry.
    pub async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();

        if BLOCK_STATUSES.contains(&status) {
            tracing::warn!(url, status, "direct fetch blocked; retrying via proxy");
            return self.fetch_via_proxy(url, status).await;
        }

        if !response.status().is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status,
                url: url.to_owned(),
            });
        }

        Ok(response.text().await?)
    }

    /// Retries a blocked URL through rotating proxies, marking each failing
    /// proxy bad so sibling fetches skip it.
    async fn fetch_via_proxy(&self, url: &str, block_status: u16) -> Result<String, ScraperError> {
        for _ in 0..MAX_PROXY_ATTEMPTS {
            let Some(proxy_url) = self.proxies.next().await else {
                break;
            };

            let proxy = match reqwest::Proxy::all(&proxy_url) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(proxy = %proxy_url, error = %e, "unusable proxy URL");
                    self.proxies.mark_bad(&proxy_url).await;
                    continue;
                }
            };
            let proxy_client = match Client::builder()
                .timeout(Duration::from_secs(self.timeout_secs.max(20)))
                .proxy(proxy)
                .build()
            {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(proxy = %proxy_url, error = %e, "failed to build proxy client");
                    self.proxies.mark_bad(&proxy_url).await;
                    continue;
                }
            };

            match proxy_client.get(url).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if BLOCK_STATUSES.contains(&status) {
                        tracing::warn!(proxy = %proxy_url, status, "proxy also blocked");
                        self.proxies.mark_bad(&proxy_url).await;
                        continue;
                    }
                    if response.status().is_success() {
                        tracing::info!(proxy = %proxy_url, url, "proxy fetch succeeded");
                        return Ok(response.text().await?);
                    }
                    tracing::warn!(proxy = %proxy_url, status, "proxy fetch returned unexpected status");
                    self.proxies.mark_bad(&proxy_url).await;
                }
                Err(e) => {
                    tracing::warn!(proxy = %proxy_url, error = %e, "proxy fetch failed");
                    self.proxies.mark_bad(&proxy_url).await;
                }
            }
        }

        Err(ScraperError::ProxiesExhausted {
            status: block_status,
            url: url.to_owned(),
        })
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
