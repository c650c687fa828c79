//! Change-list delivery with retry and exponential backoff.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{DispatchError, SinkError};
use crate::security::NotificationSecret;
use crate::traits::sink::NotificationSink;
use crate::types::change::{Acknowledgement, Change, NotificationPayload};

/// Bounded retry schedule for transient delivery failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (at least 1)
    pub max_attempts: u32,

    /// Wait after the first failed attempt
    pub base_backoff: Duration,

    /// Factor applied to the wait after every further failure (at least 1.0)
    pub multiplier: f64,

    /// Upper bound on any single wait
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(500),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
            multiplier: if multiplier.is_finite() {
                multiplier.max(1.0)
            } else {
                1.0
            },
            ..Default::default()
        }
    }

    /// Single attempt, no retries.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, 1.0)
    }

    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Wait after the given (1-based) failed attempt.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_backoff.as_secs_f64() * self.multiplier.powi(exponent);

        if !secs.is_finite() || secs >= self.max_backoff.as_secs_f64() {
            self.max_backoff
        } else {
            Duration::from_secs_f64(secs.max(0.0))
        }
    }
}

/// Dispatcher settings, including the injected shared secret.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub secret: NotificationSecret,
    pub retry: RetryPolicy,

    /// Timeout applied to every delivery attempt
    pub attempt_timeout: Duration,
}

impl DispatcherConfig {
    pub fn new(secret: NotificationSecret) -> Self {
        Self {
            secret,
            retry: RetryPolicy::default(),
            attempt_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }
}

/// Result of a dispatch that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// The sink acknowledged the change list
    Delivered { ack: Acknowledgement, attempts: u32 },

    /// Empty change list; the sink was not called
    NothingToSend,
}

/// Delivers change lists to a [`NotificationSink`].
pub struct Dispatcher<S: NotificationSink> {
    sink: S,
    config: DispatcherConfig,
}

impl<S: NotificationSink> Dispatcher<S> {
    pub fn new(sink: S, config: DispatcherConfig) -> Self {
        Self { sink, config }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Deliver `changes`, retrying transient failures per the retry policy.
    ///
    /// - 200 with a JSON body: [`Delivery::Delivered`]
    /// - network failure, attempt timeout, 5xx: retried, then
    ///   [`DispatchError::Transient`]
    /// - anything else (4xx included): [`DispatchError::Fatal`] immediately
    pub async fn dispatch(
        &self,
        changes: &[Change],
        cancel: &CancellationToken,
    ) -> Result<Delivery, DispatchError> {
        if changes.is_empty() {
            debug!("No changes to dispatch");
            return Ok(Delivery::NothingToSend);
        }

        let payload = NotificationPayload::new(changes, self.config.secret.expose());
        let policy = &self.config.retry;
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(attempt, changes = changes.len(), "Dispatching changes");

            let outcome = tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(DispatchError::Cancelled { attempts: attempt });
                }
                result = tokio::time::timeout(
                    self.config.attempt_timeout,
                    self.sink.deliver(&payload),
                ) => result,
            };

            let error = match outcome {
                Ok(Ok(ack)) => {
                    info!(attempt, changes = changes.len(), "Changes delivered");
                    return Ok(Delivery::Delivered {
                        ack,
                        attempts: attempt,
                    });
                }
                Ok(Err(e)) => e,
                Err(_) => SinkError::Timeout,
            };

            if !error.is_transient() {
                warn!(attempt, error = %error, "Delivery rejected");
                return Err(DispatchError::Fatal {
                    attempts: attempt,
                    source: error,
                });
            }

            if attempt >= max_attempts {
                warn!(attempt, error = %error, "Delivery attempts exhausted");
                return Err(DispatchError::Transient {
                    attempts: attempt,
                    source: error,
                });
            }

            let delay = policy.backoff_after(attempt);
            warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Delivery failed, retrying"
            );

            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(DispatchError::Cancelled { attempts: attempt });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockSink, SinkResponse};

    fn fast_config() -> DispatcherConfig {
        DispatcherConfig::new(NotificationSecret::new("s3cret"))
            .with_retry(RetryPolicy::new(3, Duration::from_millis(1), 2.0))
    }

    fn changes() -> Vec<Change> {
        vec![Change::added("/b")]
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), 2.0)
            .with_max_backoff(Duration::from_millis(350));

        assert_eq!(policy.backoff_after(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_after(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_after(3), Duration::from_millis(350));
        assert_eq!(policy.backoff_after(u32::MAX), Duration::from_millis(350));
    }

    #[test]
    fn test_policy_clamps_degenerate_values() {
        let policy = RetryPolicy::new(0, Duration::from_millis(10), 0.5);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.multiplier, 1.0);
    }

    #[tokio::test]
    async fn test_empty_change_list_is_not_sent() {
        let dispatcher = Dispatcher::new(MockSink::new(), fast_config());

        let delivery = dispatcher
            .dispatch(&[], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(delivery, Delivery::NothingToSend);
        assert_eq!(dispatcher.sink().call_count(), 0);
    }

    #[tokio::test]
    async fn test_success_sends_changes_and_secret() {
        let dispatcher = Dispatcher::new(MockSink::new(), fast_config());

        let delivery = dispatcher
            .dispatch(&changes(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(delivery, Delivery::Delivered { attempts: 1, .. }));
        let sent = dispatcher.sink().payloads();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["secret"], "s3cret");
        assert_eq!(sent[0]["data"][0]["id"], "/b");
    }

    #[tokio::test]
    async fn test_transient_failures_exhaust_attempts() {
        let sink = MockSink::new()
            .respond(SinkResponse::Status(503))
            .respond(SinkResponse::Status(503))
            .respond(SinkResponse::Status(503));
        let dispatcher = Dispatcher::new(sink, fast_config());

        let err = dispatcher
            .dispatch(&changes(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Transient { attempts: 3, .. }));
        assert_eq!(dispatcher.sink().call_count(), 3);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let sink = MockSink::new()
            .respond(SinkResponse::Transport)
            .respond(SinkResponse::Status(502))
            .respond(SinkResponse::Ack(serde_json::json!({"saved": 1})));
        let dispatcher = Dispatcher::new(sink, fast_config());

        let delivery = dispatcher
            .dispatch(&changes(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            delivery,
            Delivery::Delivered {
                ack: Acknowledgement(serde_json::json!({"saved": 1})),
                attempts: 3,
            }
        );
    }

    #[tokio::test]
    async fn test_client_error_is_fatal() {
        let sink = MockSink::new().respond(SinkResponse::Status(401));
        let dispatcher = Dispatcher::new(sink, fast_config());

        let err = dispatcher
            .dispatch(&changes(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Fatal { attempts: 1, .. }));
        assert_eq!(dispatcher.sink().call_count(), 1);
    }

    #[tokio::test]
    async fn test_attempt_timeout_is_retried() {
        let sink = MockSink::new()
            .respond(SinkResponse::Hang)
            .respond(SinkResponse::Ack(serde_json::json!({})));
        let dispatcher = Dispatcher::new(
            sink,
            fast_config().with_attempt_timeout(Duration::from_millis(20)),
        );

        let delivery = dispatcher
            .dispatch(&changes(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(delivery, Delivery::Delivered { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn test_cancelled_dispatch() {
        let sink = MockSink::new().respond(SinkResponse::Hang);
        let dispatcher = Dispatcher::new(sink, fast_config());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = dispatcher.dispatch(&changes(), &cancel).await.unwrap_err();

        assert!(matches!(err, DispatchError::Cancelled { .. }));
    }
}
