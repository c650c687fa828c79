//! Testing utilities including mock implementations.
//!
//! Useful for exercising watch cycles without network access: pages are
//! served from memory, deliveries are scripted and recorded.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::Notify;

use crate::error::{FetchError, SinkError, SnapshotError};
use crate::stores::MemorySnapshotStore;
use crate::traits::{NotificationSink, PageFetcher, SnapshotStore};
use crate::types::{
    change::{Acknowledgement, NotificationPayload},
    document::RawDocument,
    snapshot::Snapshot,
};

/// Scripted outcome of one [`MockSink`] delivery.
#[derive(Debug, Clone)]
pub enum SinkResponse {
    /// 200 with this JSON body
    Ack(serde_json::Value),
    /// Non-200 status
    Status(u16),
    /// 200 with a body that is not JSON
    InvalidAck,
    /// Connection failure
    Transport,
    /// Never answers (exercises timeouts and cancellation)
    Hang,
}

/// A mock notification sink.
///
/// Plays back scripted responses in order, then acknowledges everything.
/// Every payload it receives is recorded as JSON for assertions.
#[derive(Default)]
pub struct MockSink {
    responses: Mutex<VecDeque<SinkResponse>>,
    payloads: Mutex<Vec<serde_json::Value>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next unanswered delivery.
    pub fn respond(self, response: SinkResponse) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    /// Number of delivery attempts received.
    pub fn call_count(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }

    /// Payloads received, in order.
    pub fn payloads(&self) -> Vec<serde_json::Value> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for MockSink {
    async fn deliver(
        &self,
        payload: &NotificationPayload<'_>,
    ) -> Result<Acknowledgement, SinkError> {
        let body = serde_json::to_value(payload).map_err(SinkError::InvalidAck)?;
        self.payloads.lock().unwrap().push(body);

        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| SinkResponse::Ack(serde_json::json!({"status": "saved"})));

        match response {
            SinkResponse::Ack(value) => Ok(Acknowledgement(value)),
            SinkResponse::Status(status) => Err(SinkError::Status {
                status,
                body: String::new(),
            }),
            SinkResponse::InvalidAck => Err(SinkError::InvalidAck(
                serde_json::from_str::<serde_json::Value>("not json").unwrap_err(),
            )),
            SinkResponse::Transport => Err(SinkError::Transport(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )))),
            SinkResponse::Hang => std::future::pending().await,
        }
    }
}

/// A mock page fetcher serving documents from memory.
#[derive(Default)]
pub struct MockFetcher {
    pages: RwLock<HashMap<String, Result<String, u16>>>,
    calls: AtomicUsize,
    gate: Option<FetchGate>,
}

/// Pauses a [`MockFetcher`] mid-fetch so tests can overlap cycles.
#[derive(Clone, Default)]
pub struct FetchGate {
    /// Notified when a fetch has started
    pub entered: Arc<Notify>,
    /// Notify to let the paused fetch finish
    pub release: Arc<Notify>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` for `url`.
    pub fn with_page(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.set_page(url, html);
        self
    }

    /// Answer `url` with a non-2xx status.
    pub fn with_status(self, url: impl Into<String>, status: u16) -> Self {
        self.pages.write().unwrap().insert(url.into(), Err(status));
        self
    }

    pub fn with_gate(mut self, gate: FetchGate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Replace the page served for `url`.
    pub fn set_page(&self, url: impl Into<String>, html: impl Into<String>) {
        self.pages
            .write()
            .unwrap()
            .insert(url.into(), Ok(html.into()));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<RawDocument, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let page = self.pages.read().unwrap().get(url).cloned();
        match page {
            Some(Ok(html)) => Ok(RawDocument::new(url, html)),
            Some(Err(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// Snapshot store whose writes can be made to fail.
///
/// Reads and successful writes go to an inner [`MemorySnapshotStore`].
#[derive(Default)]
pub struct FlakyStore {
    inner: MemorySnapshotStore,
    fail_writes: std::sync::atomic::AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemorySnapshotStore {
        &self.inner
    }
}

#[async_trait]
impl SnapshotStore for FlakyStore {
    async fn read_previous(&self, key: &str) -> Result<Option<Snapshot>, SnapshotError> {
        self.inner.read_previous(key).await
    }

    async fn write_current(&self, key: &str, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SnapshotError::Backend(format!("write refused for {}", key)));
        }
        self.inner.write_current(key, snapshot).await
    }
}
