use async_trait::async_trait;
use std::time::Duration;

use crate::error::FetchError;
use crate::types::document::RawDocument;

/// Retrieves the monitored page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url`, giving up after `timeout`.
    ///
    /// Non-2xx responses and transport failures are errors.
    async fn get(&self, url: &str, timeout: Duration) -> Result<RawDocument, FetchError>;
}
