//! Adapter for algumon.com, a hotdeal aggregator with a plain search page.

use scraper::{Html, Selector};

use dealwatch_core::{ListingItem, Site};

use crate::adapter::{encode_keyword, SiteAdapter};

pub struct AlgumonAdapter;

impl SiteAdapter for AlgumonAdapter {
    fn site(&self) -> Site {
        Site::Algumon
    }

    fn search_url(&self, keyword: &str) -> String {
        format!("https://www.algumon.com/search/{}", encode_keyword(keyword))
    }

    fn parse(&self, html: &str, search_url: &str) -> Vec<ListingItem> {
        let document = Html::parse_document(html);
        let list_sel = Selector::parse("ul.product.post-list").expect("static selector");
        let item_sel = Selector::parse("li").expect("static selector");
        let link_sel = Selector::parse("a.product-link").expect("static selector");
        let price_sel = Selector::parse("small.product-price").expect("static selector");
        let meta_sel = Selector::parse("small.deal-price-meta-info").expect("static selector");

        let Some(list) = document.select(&list_sel).next() else {
            tracing::warn!(search_url, "algumon product list not found; layout change?");
            return Vec::new();
        };

        let mut items = Vec::new();
        for li in list.select(&item_sel) {
            let Some(post_id) = li.value().attr("data-post-id") else {
                continue;
            };
            let Some(action_uri) = li.value().attr("data-action-uri") else {
                continue;
            };
            let Some(link) = li.select(&link_sel).next() else {
                continue;
            };

            let title = link.text().collect::<String>().trim().to_owned();
            let price = li
                .select(&price_sel)
                .next()
                .map(|p| p.text().collect::<String>().trim().to_owned());
            // Meta info (shipping/seller) comes whitespace-mangled; squash it.
            let meta_data = li.select(&meta_sel).next().map(|m| {
                m.text()
                    .collect::<String>()
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect::<String>()
            });

            items.push(ListingItem {
                external_id: post_id.to_owned(),
                title,
                link: format!("https://www.algumon.com{}", action_uri.trim()),
                price,
                meta_data,
                site: Site::Algumon,
                search_url: search_url.to_owned(),
            });
        }
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <html><body>
        <ul class="product post-list">
          <li data-post-id="1001" data-action-uri="/l/1001">
            <a class="product-link"> LG OLED TV 55인치 </a>
            <small class="product-price">1,290,000원</small>
            <small class="deal-price-meta-info">
              무료배송 / 쿠팡
            </small>
          </li>
          <li data-post-id="1000" data-action-uri="/l/1000">
            <a class="product-link">LG 모니터</a>
          </li>
          <li>
            <a class="product-link">missing ids, skipped</a>
          </li>
        </ul>
        </body></html>
    "#;

    #[test]
    fn parses_items_newest_first() {
        let adapter = AlgumonAdapter;
        let url = adapter.search_url("lg tv");
        let items = adapter.parse(SAMPLE, &url);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].external_id, "1001");
        assert_eq!(items[0].title, "LG OLED TV 55인치");
        assert_eq!(items[0].link, "https://www.algumon.com/l/1001");
        assert_eq!(items[0].price.as_deref(), Some("1,290,000원"));
        assert_eq!(items[0].meta_data.as_deref(), Some("무료배송/쿠팡"));
        assert_eq!(items[0].site, Site::Algumon);
        assert_eq!(items[0].search_url, url);

        assert_eq!(items[1].external_id, "1000");
        assert_eq!(items[1].price, None);
    }

    #[test]
    fn missing_list_yields_empty() {
        let adapter = AlgumonAdapter;
        let items = adapter.parse("<html><body>redesigned</body></html>", "u");
        assert!(items.is_empty());
    }

    #[test]
    fn search_url_encodes_keyword() {
        let adapter = AlgumonAdapter;
        assert_eq!(
            adapter.search_url("lg tv"),
            "https://www.algumon.com/search/lg%20tv"
        );
    }
}
