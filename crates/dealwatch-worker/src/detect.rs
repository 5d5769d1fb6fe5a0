//! Incremental-crawl change detection.
//!
//! Decides, for one (keyword, site) pair, which freshly fetched items are new
//! since the last crawl. The stored state is a short window of recently seen
//! external IDs rather than a single last-seen ID: upstream listings reorder,
//! edit, and delete posts between crawls, and a single-ID anchor that vanished
//! would make the next crawl misfire as "everything is new".

use dealwatch_core::ListingItem;

/// Number of recent external IDs retained per (keyword, site) pair.
pub const ANCHOR_WINDOW: usize = 3;

/// Result of one change-detection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Items above the matched anchor, preserving fetch order (newest-first).
    pub new_items: Vec<ListingItem>,
    /// Replacement anchor window: external IDs of the top items of the fetch.
    /// Persisted only when `new_items` is non-empty.
    pub anchor_ids: Vec<String>,
}

impl Detection {
    fn unchanged(stored: Option<&[String]>) -> Self {
        Self {
            new_items: Vec::new(),
            anchor_ids: stored.map(<[String]>::to_vec).unwrap_or_default(),
        }
    }
}

/// Compares a freshly fetched newest-first item sequence against the stored
/// anchor window and computes the new items plus the updated window.
///
/// - Empty fetch: nothing new, anchor unchanged (or still absent).
/// - No stored anchor (first crawl of this pair): only the single newest item
///   counts as new, so a fresh subscription does not flood subscribers with
///   historical posts.
/// - Stored anchor present: everything strictly above the first fetched item
///   whose ID appears anywhere in the window is new. If no window ID is found
///   at all, the whole fetch is new — over-notifying once beats silently
///   missing a gap.
///
/// Matching is exact external-ID equality; the scan stops at the first hit.
#[must_use]
pub fn detect_new(fetched: &[ListingItem], stored: Option<&[String]>) -> Detection {
    if fetched.is_empty() {
        return Detection::unchanged(stored);
    }

    let new_items: Vec<ListingItem> = match stored {
        None => fetched[..1].to_vec(),
        Some(anchor_ids) => {
            match fetched
                .iter()
                .position(|item| anchor_ids.contains(&item.external_id))
            {
                Some(first_match) => fetched[..first_match].to_vec(),
                None => fetched.to_vec(),
            }
        }
    };

    if new_items.is_empty() {
        return Detection::unchanged(stored);
    }

    let anchor_ids = fetched
        .iter()
        .take(ANCHOR_WINDOW)
        .map(|item| item.external_id.clone())
        .collect();

    Detection {
        new_items,
        anchor_ids,
    }
}

#[cfg(test)]
mod tests {
    use dealwatch_core::Site;

    use super::*;

    fn items(ids: &[&str]) -> Vec<ListingItem> {
        ids.iter()
            .map(|id| ListingItem {
                external_id: (*id).to_owned(),
                title: format!("Title {id}"),
                link: format!("https://example.com/{id}"),
                price: Some("1000".to_owned()),
                meta_data: None,
                site: Site::Algumon,
                search_url: "https://example.com/search".to_owned(),
            })
            .collect()
    }

    fn anchors(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| (*s).to_owned()).collect()
    }

    fn new_ids(detection: &Detection) -> Vec<&str> {
        detection
            .new_items
            .iter()
            .map(|i| i.external_id.as_str())
            .collect()
    }

    #[test]
    fn empty_fetch_changes_nothing() {
        let stored = anchors(&["100", "99"]);
        let detection = detect_new(&[], Some(&stored));
        assert!(detection.new_items.is_empty());
        assert_eq!(detection.anchor_ids, stored);

        let detection = detect_new(&[], None);
        assert!(detection.new_items.is_empty());
        assert!(detection.anchor_ids.is_empty());
    }

    #[test]
    fn first_crawl_suppresses_to_single_newest_item() {
        let fetched = items(&["102", "101", "100", "99", "98"]);
        let detection = detect_new(&fetched, None);
        assert_eq!(new_ids(&detection), vec!["102"]);
        // Window still covers the top of the fetch, not just the one new item.
        assert_eq!(detection.anchor_ids, anchors(&["102", "101", "100"]));
    }

    #[test]
    fn exact_match_at_top_means_no_new_items() {
        // stored ["100"], fetched ["100"] -> []
        let stored = anchors(&["100"]);
        let detection = detect_new(&items(&["100"]), Some(&stored));
        assert!(detection.new_items.is_empty());
        assert_eq!(detection.anchor_ids, stored);
    }

    #[test]
    fn multi_anchor_top_match_means_no_new_items() {
        let stored = anchors(&["100", "99", "98"]);
        let detection = detect_new(&items(&["100"]), Some(&stored));
        assert!(detection.new_items.is_empty());
    }

    #[test]
    fn items_above_matched_anchor_are_new() {
        // stored ["100","99","98"], fetched ["101","100"] -> ["101"]
        let stored = anchors(&["100", "99", "98"]);
        let detection = detect_new(&items(&["101", "100"]), Some(&stored));
        assert_eq!(new_ids(&detection), vec!["101"]);
        assert_eq!(detection.anchor_ids, anchors(&["101", "100"]));
    }

    #[test]
    fn deleted_newest_anchor_falls_back_to_older_window_entry() {
        // "100" deleted upstream; "99" still anchors the boundary.
        let stored = anchors(&["100", "99", "98"]);
        let detection = detect_new(&items(&["101", "99"]), Some(&stored));
        assert_eq!(new_ids(&detection), vec!["101"]);
    }

    #[test]
    fn two_deleted_anchors_fall_back_to_oldest_window_entry() {
        let stored = anchors(&["100", "99", "98"]);
        let detection = detect_new(&items(&["101", "98"]), Some(&stored));
        assert_eq!(new_ids(&detection), vec!["101"]);
    }

    #[test]
    fn no_anchor_match_floods_entire_fetch() {
        // stored ["100","99","98"], fetched ["105"] -> ["105"]
        let stored = anchors(&["100", "99", "98"]);
        let detection = detect_new(&items(&["105"]), Some(&stored));
        assert_eq!(new_ids(&detection), vec!["105"]);

        let detection = detect_new(&items(&["105", "104", "103"]), Some(&stored));
        assert_eq!(new_ids(&detection), vec!["105", "104", "103"]);
    }

    #[test]
    fn scan_stops_at_first_match_even_if_older_anchor_appears_above() {
        // "98" got bumped above "100" by an upstream edit; the topmost window
        // hit wins and everything above it is new.
        let stored = anchors(&["100", "99", "98"]);
        let detection = detect_new(&items(&["101", "98", "100"]), Some(&stored));
        assert_eq!(new_ids(&detection), vec!["101"]);
    }

    #[test]
    fn detection_is_idempotent_across_consecutive_crawls() {
        let fetched = items(&["105", "104", "103", "102"]);
        let stored = anchors(&["102", "101"]);

        let first = detect_new(&fetched, Some(&stored));
        assert_eq!(new_ids(&first), vec!["105", "104", "103"]);

        let second = detect_new(&fetched, Some(&first.anchor_ids));
        assert!(second.new_items.is_empty());
        assert_eq!(second.anchor_ids, first.anchor_ids);
    }

    #[test]
    fn anchor_window_never_exceeds_fixed_size() {
        let fetched = items(&["9", "8", "7", "6", "5", "4", "3"]);
        let detection = detect_new(&fetched, Some(&anchors(&["1"])));
        assert_eq!(detection.anchor_ids.len(), ANCHOR_WINDOW);
        assert_eq!(detection.anchor_ids, anchors(&["9", "8", "7"]));
    }

    #[test]
    fn short_fetch_yields_short_window() {
        let detection = detect_new(&items(&["9"]), None);
        assert_eq!(detection.anchor_ids, anchors(&["9"]));
    }
}
