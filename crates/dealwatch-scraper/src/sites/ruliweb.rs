//! Adapter for the Ruliweb market board (user-posted deal threads).

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;

use dealwatch_core::{ListingItem, Site};

use crate::adapter::{encode_keyword, SiteAdapter};

pub struct RuliwebAdapter;

/// Trailing reply counter on thread titles, e.g. "LG TV 특가 (12)".
fn reply_count_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*\(\d+\)\s*$").expect("static regex"))
}

/// Korean price fragment inside a thread title, e.g. "1,290,000원".
fn price_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\d,]+원").expect("static regex"))
}

impl SiteAdapter for RuliwebAdapter {
    fn site(&self) -> Site {
        Site::Ruliweb
    }

    fn search_url(&self, keyword: &str) -> String {
        format!(
            "https://bbs.ruliweb.com/market/board/1020?search_type=subject&search_key={}",
            encode_keyword(keyword)
        )
    }

    fn parse(&self, html: &str, search_url: &str) -> Vec<ListingItem> {
        let document = Html::parse_document(html);
        let table_sel = Selector::parse("table.board_list_table").expect("static selector");
        let row_sel = Selector::parse("tr.table_body").expect("static selector");
        let id_sel = Selector::parse("td.id").expect("static selector");
        let subject_sel = Selector::parse("td.subject a.subject_link").expect("static selector");

        let Some(table) = document.select(&table_sel).next() else {
            tracing::warn!(search_url, "ruliweb board table not found; layout change?");
            return Vec::new();
        };

        let mut items = Vec::new();
        for row in table.select(&row_sel) {
            // Pinned notices and "best" reposts are not search results.
            let classes = row.value().attr("class").unwrap_or_default();
            if classes.contains("notice") || classes.contains("best") {
                continue;
            }

            let Some(id_cell) = row.select(&id_sel).next() else {
                continue;
            };
            let post_id = id_cell.text().collect::<String>().trim().to_owned();
            if post_id.is_empty() || !post_id.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }

            let Some(subject_link) = row.select(&subject_sel).next() else {
                continue;
            };
            let link = subject_link.value().attr("href").unwrap_or_default().to_owned();
            let raw_title = subject_link.text().collect::<String>().trim().to_owned();
            let title = reply_count_re().replace(&raw_title, "").trim().to_owned();
            let price = price_re().find(&title).map(|m| m.as_str().to_owned());

            items.push(ListingItem {
                external_id: post_id,
                title,
                link,
                price,
                meta_data: None,
                site: Site::Ruliweb,
                search_url: search_url.to_owned(),
            });
        }
        items
    }
}
