//! Collaborator abstractions.
//!
//! The engine never talks to the network or disk directly; a watch cycle
//! goes through these traits so each side can be swapped or mocked.

pub mod fetcher;
pub mod sink;
pub mod store;

pub use fetcher::PageFetcher;
pub use sink::NotificationSink;
pub use store::SnapshotStore;
