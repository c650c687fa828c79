//! Client for the notification service's save endpoint.
//!
//! `POST <base>/api/v1/notification/save` with a JSON
//! `{"data": [...], "secret": "..."}` body. One request per call; the
//! [`Dispatcher`](crate::Dispatcher) owns retries.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{ConfigError, SinkError};
use crate::traits::sink::NotificationSink;
use crate::types::change::{Acknowledgement, NotificationPayload};

/// Path of the save endpoint relative to the service base URL.
pub const SAVE_PATH: &str = "api/v1/notification/save";

pub struct HttpNotificationSink {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpNotificationSink {
    /// Client for the service at `base_url` (e.g. `http://localhost:8080`).
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(ConfigError::Client)?;
        Self::with_client(client, base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, ConfigError> {
        let raw = format!("{}/{}", base_url.trim_end_matches('/'), SAVE_PATH);
        let endpoint = Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn transport(e: reqwest::Error) -> SinkError {
    if e.is_timeout() {
        SinkError::Timeout
    } else {
        SinkError::Transport(Box::new(e))
    }
}

#[async_trait]
impl NotificationSink for HttpNotificationSink {
    async fn deliver(
        &self,
        payload: &NotificationPayload<'_>,
    ) -> Result<Acknowledgement, SinkError> {
        debug!(endpoint = %self.endpoint, changes = payload.data.len(), "Posting notification");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(payload)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if status != reqwest::StatusCode::OK {
            return Err(SinkError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let ack = serde_json::from_str(&body).map_err(SinkError::InvalidAck)?;
        Ok(Acknowledgement(ack))
    }
}
