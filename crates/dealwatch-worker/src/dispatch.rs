//! Per-subscriber notification dispatch after a crawl cycle.
//!
//! Each subscriber gets at most one email per cycle, containing only the
//! keywords they follow that actually produced new items. A delivery failure
//! affects that subscriber alone.

use std::collections::BTreeMap;

use uuid::Uuid;

use dealwatch_db::SubscriberRow;
use dealwatch_notify::{render_keyword_section, render_subject, Notifier};

use crate::cycle::KeywordNewItems;

/// One email that was handed to the transport, for mail-log bookkeeping.
#[derive(Debug, Clone)]
pub struct SentNotification {
    pub user_id: Uuid,
    pub email: String,
    pub subject: String,
    pub item_count: usize,
}

/// Sends one digest email to every subscriber whose keywords had new items.
///
/// Cycle results are keyed by keyword ID, so each subscriber's sections come
/// out in ascending keyword-ID order. Returns the notifications that were
/// accepted by the transport; failed sends are logged and skipped.
pub async fn dispatch_notifications(
    subscribers: &[SubscriberRow],
    results: &BTreeMap<i64, KeywordNewItems>,
    notifier: &dyn Notifier,
) -> Vec<SentNotification> {
    let mut sent = Vec::new();

    for subscriber in subscribers {
        let matched: Vec<&KeywordNewItems> = results
            .values()
            .filter(|r| subscriber.keyword_ids.contains(&r.keyword.id))
            .collect();
        if matched.is_empty() {
            continue;
        }

        let titles: Vec<&str> = matched.iter().map(|r| r.keyword.title.as_str()).collect();
        let subject = render_subject(&titles);
        let body = render_body(&subscriber.nickname, &matched);
        let item_count = matched.iter().map(|r| r.items.len()).sum();

        match notifier.send(&subscriber.email, &subject, &body).await {
            Ok(()) => {
                tracing::info!(
                    email = %subscriber.email,
                    keywords = matched.len(),
                    items = item_count,
                    "notification dispatched"
                );
                sent.push(SentNotification {
                    user_id: subscriber.id,
                    email: subscriber.email.clone(),
                    subject,
                    item_count,
                });
            }
            Err(error) => {
                tracing::error!(email = %subscriber.email, %error, "notification send failed");
            }
        }
    }

    sent
}

fn render_body(nickname: &str, matched: &[&KeywordNewItems]) -> String {
    let mut body = format!("<p>Hi {nickname}, fresh deals just landed for your keywords.</p>");
    for result in matched {
        body.push_str(&render_keyword_section(
            &result.keyword.title,
            &result.items,
        ));
    }
    body
}
