//! Explicit site-adapter registration table.
//!
//! Built once at startup and passed by reference into the crawl cycle; adding
//! a site is a table insertion, never an import-time side effect. Iteration
//! order is deterministic (ordered by [`Site`]), which fixes the order sites
//! contribute items to per-keyword aggregation.

use std::collections::BTreeMap;
use std::sync::Arc;

use dealwatch_core::Site;

use crate::adapter::SiteAdapter;
use crate::sites::{AlgumonAdapter, RuliwebAdapter};

#[derive(Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<Site, Arc<dyn SiteAdapter>>,
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The production registry: every adapter that works over plain HTTP.
    #[must_use]
    pub fn with_default_sites() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(AlgumonAdapter));
        registry.register(Arc::new(RuliwebAdapter));
        registry
    }

    /// Registers an adapter under its own site key, replacing any previous
    /// adapter for that site.
    pub fn register(&mut self, adapter: Arc<dyn SiteAdapter>) {
        self.adapters.insert(adapter.site(), adapter);
    }

    #[must_use]
    pub fn get(&self, site: Site) -> Option<&Arc<dyn SiteAdapter>> {
        self.adapters.get(&site)
    }

    /// Registered sites in deterministic order.
    #[must_use]
    pub fn active_sites(&self) -> Vec<Site> {
        self.adapters.keys().copied().collect()
    }

    /// `(site, adapter)` pairs in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = (Site, &Arc<dyn SiteAdapter>)> {
        self.adapters.iter().map(|(site, adapter)| (*site, adapter))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
