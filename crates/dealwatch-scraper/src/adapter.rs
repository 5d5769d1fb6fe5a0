use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use dealwatch_core::{ListingItem, Site};

use crate::client::FetchClient;
use crate::error::ScraperError;

/// Site-specific fetch+parse implementation.
///
/// One implementation per supported site. Adapters are pure besides the fetch
/// itself: `parse` maps a listing page to newest-first [`ListingItem`]s and
/// returns an empty sequence (after a warning) when the expected DOM structure
/// is absent — upstream layout changes are expected, not errors.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    fn site(&self) -> Site;

    /// The search/listing URL for a keyword. The keyword is percent-encoded
    /// by [`encode_keyword`] before interpolation.
    fn search_url(&self, keyword: &str) -> String;

    /// Parses a fetched listing page into newest-first items.
    fn parse(&self, html: &str, search_url: &str) -> Vec<ListingItem>;

    /// Fetches the search page for `keyword` and parses it.
    ///
    /// # Errors
    ///
    /// Propagates any [`ScraperError`] from the fetch transport.
    async fn fetch_and_parse(
        &self,
        client: &FetchClient,
        keyword: &str,
    ) -> Result<Vec<ListingItem>, ScraperError> {
        let url = self.search_url(keyword);
        tracing::debug!(site = %self.site(), keyword, url, "fetching search page");
        let html = client.fetch(&url).await?;
        Ok(self.parse(&html, &url))
    }
}

/// Percent-encodes a keyword for use in a search URL path or query.
#[must_use]
pub fn encode_keyword(keyword: &str) -> String {
    utf8_percent_encode(keyword, NON_ALPHANUMERIC).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_keyword_passes_ascii_alphanumerics() {
        assert_eq!(encode_keyword("rtx4090"), "rtx4090");
    }

    #[test]
    fn encode_keyword_escapes_spaces_and_hangul() {
        assert_eq!(encode_keyword("lg tv"), "lg%20tv");
        assert_eq!(encode_keyword("티비"), "%ED%8B%B0%EB%B9%84");
    }
}
