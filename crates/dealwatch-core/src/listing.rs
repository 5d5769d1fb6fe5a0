use serde::{Deserialize, Serialize};

use crate::site::Site;

/// One scraped post/listing as returned by a site adapter.
///
/// Sequences of `ListingItem` handed to the change detector are ordered
/// newest-first and are not mutated after parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingItem {
    /// Site-scoped identifier; unique only within `site`'s ID space.
    pub external_id: String,
    pub title: String,
    pub link: String,
    /// Price text as displayed by the site, e.g. "1,234,000원".
    pub price: Option<String>,
    /// Free-form shipping/seller info.
    pub meta_data: Option<String>,
    pub site: Site,
    /// The search/listing URL this item was discovered under; used for
    /// "view all results" links in notification emails.
    pub search_url: String,
}
