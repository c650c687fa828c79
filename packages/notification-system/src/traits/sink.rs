use async_trait::async_trait;

use crate::error::SinkError;
use crate::types::change::{Acknowledgement, NotificationPayload};

/// Receives change notifications.
///
/// Implementations make exactly one delivery attempt per call and classify
/// the outcome; retry and backoff live in the
/// [`Dispatcher`](crate::Dispatcher).
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(
        &self,
        payload: &NotificationPayload<'_>,
    ) -> Result<Acknowledgement, SinkError>;
}
