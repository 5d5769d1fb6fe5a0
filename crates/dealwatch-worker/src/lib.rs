//! The dealwatch background worker: change detection, the bounded-concurrency
//! crawl cycle, notification dispatch, and the recurring schedule that drives
//! them.

pub mod cycle;
pub mod detect;
pub mod dispatch;
pub mod scheduler;
pub mod store;
pub mod worker;

pub use cycle::{run_cycle, CrawlKeyword, CycleLimits, KeywordNewItems};
pub use detect::{detect_new, Detection, ANCHOR_WINDOW};
pub use dispatch::{dispatch_notifications, SentNotification};
pub use scheduler::{build_scheduler, schedule_for};
pub use store::{
    AnchorSnapshot, AnchorStore, AnchorStoreError, PgAnchorStore, PgSubscriptionStore,
    SubscriptionStore,
};
pub use worker::{RunSummary, Worker, WorkerError};
