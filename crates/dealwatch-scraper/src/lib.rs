//! Site adapters and fetch transport for the dealwatch crawler.
//!
//! The crawl cycle consumes this crate through three seams: the
//! [`SiteAdapter`] trait (one implementation per supported site), the
//! [`AdapterRegistry`] built at startup, and the [`FetchClient`] that handles
//! direct fetches with a rotating-proxy fallback on block responses.

pub mod adapter;
pub mod client;
pub mod error;
pub mod proxy;
pub mod registry;
pub mod sites;

pub use adapter::{encode_keyword, SiteAdapter};
pub use client::FetchClient;
pub use error::ScraperError;
pub use proxy::ProxyPool;
pub use registry::AdapterRegistry;
pub use sites::{AlgumonAdapter, RuliwebAdapter};
