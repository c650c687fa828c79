//! Page-change notification engine
//!
//! Watches a remote page, extracts structured records from its markup,
//! compares them with the previous snapshot and pushes the resulting change
//! list to a notification service.
//!
//! # Cycle
//!
//! ```text
//! PageFetcher -> RawDocument -> Scraper -> records
//!     -> diff (against the previous Snapshot) -> Vec<Change>
//!     -> Dispatcher -> NotificationSink
//!     -> SnapshotStore::write_current (only after confirmed delivery)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use notification_system::{
//!     default_config, Dispatcher, DispatcherConfig, FileSnapshotStore, HttpFetcher,
//!     HttpNotificationSink, NotificationSecret, WatchTarget, Watcher,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! let sink = HttpNotificationSink::new("http://localhost:8080")?;
//! let dispatcher = Dispatcher::new(sink, DispatcherConfig::new(NotificationSecret::new(secret)));
//! let watcher = Watcher::new(
//!     HttpFetcher::new()?,
//!     FileSnapshotStore::new("./state"),
//!     dispatcher,
//!     default_config(),
//! )?;
//!
//! let target = WatchTarget::new("https://dtu.ac.in/");
//! let outcome = watcher.run_cycle(&target, &CancellationToken::new()).await?;
//! ```
//!
//! # Modules
//!
//! - [`types`] - Configuration, documents, records, changes and snapshots
//! - [`scrape`] - Markup to record extraction
//! - [`diff`] - Record comparison
//! - [`dispatch`] - Delivery with retry and backoff
//! - [`watcher`] - One full fetch/diff/dispatch/persist cycle
//! - [`traits`] - Collaborator abstractions (fetcher, store, sink)
//! - [`fetchers`], [`stores`], [`sinks`] - Implementations of those traits
//! - [`testing`] - Mock implementations for testing

pub mod diff;
pub mod dispatch;
pub mod error;
pub mod fetchers;
pub mod scrape;
pub mod security;
pub mod settings;
pub mod sinks;
pub mod stores;
pub mod telemetry;
pub mod testing;
pub mod traits;
pub mod types;
pub mod watcher;

pub use diff::{diff, difference};
pub use dispatch::{Delivery, Dispatcher, DispatcherConfig, RetryPolicy};
pub use error::{
    ConfigError, DispatchError, Error, FetchError, ParseError, Result, SinkError, SnapshotError,
};
pub use fetchers::HttpFetcher;
pub use scrape::{scrape, Scraper};
pub use security::NotificationSecret;
pub use settings::Settings;
pub use sinks::HttpNotificationSink;
pub use stores::{FileSnapshotStore, MemorySnapshotStore};
pub use traits::{NotificationSink, PageFetcher, SnapshotStore};
pub use types::{
    change::{Acknowledgement, Change, ChangeKind, NotificationPayload},
    config::{
        default_config, Configuration, ConfigurationBuilder, FieldSpec, ReportFilter,
        DEFAULT_CONFIG_VERSION, MULTI_VALUE_SEPARATOR,
    },
    document::RawDocument,
    record::ScrapedRecord,
    snapshot::Snapshot,
};
pub use watcher::{CycleOutcome, WatchTarget, Watcher};
