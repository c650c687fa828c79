//! Notification sink implementations.

pub mod http;

pub use http::{HttpNotificationSink, SAVE_PATH};
