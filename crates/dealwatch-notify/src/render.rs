//! HTML rendering for hotdeal notification emails.

use dealwatch_core::ListingItem;

/// Renders one keyword's new items as an HTML section, grouped by site.
///
/// Items arrive in aggregation order (site order, each site's items
/// newest-first); grouping preserves that order. Every string that originated
/// on a scraped page is escaped.
#[must_use]
pub fn render_keyword_section(keyword_title: &str, items: &[ListingItem]) -> String {
    if items.is_empty() {
        return String::new();
    }

    let mut html = format!("<h2>New deals for \"{}\"</h2>", escape(keyword_title));

    let mut current_site = None;
    for item in items {
        if current_site != Some(item.site) {
            current_site = Some(item.site);
            html.push_str(&format!(
                "<h3><a href='{}'>[{}] all search results</a></h3>",
                escape(&item.search_url),
                item.site.display_name(),
            ));
        }
        html.push_str(&format!(
            "<p><a href='{}'>{}</a> - {}</p>",
            escape(&item.link),
            escape(&item.title),
            escape(item.price.as_deref().unwrap_or("")),
        ));
    }

    html
}

/// Builds the subject line from the keyword titles that had new items.
#[must_use]
pub fn render_subject(keyword_titles: &[&str]) -> String {
    format!("[{}] new hotdeal alerts", keyword_titles.join(", "))
}

/// Minimal HTML escaping for text and attribute values.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}
