//! Typed errors for the notification engine.
//!
//! Each collaborator has its own error enum; [`Error`] is what a full cycle
//! (or any helper that spans several steps) returns.

use thiserror::Error;

/// Invalid [`Configuration`](crate::Configuration) shape.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `fields` is empty
    #[error("configuration must declare at least one field")]
    NoFields,

    /// `identity_field` is not the name of a declared field
    #[error("identity field `{0}` is not one of the declared fields")]
    UnknownIdentityField(String),

    /// Two fields share a name
    #[error("field `{0}` is declared more than once")]
    DuplicateField(String),

    /// CSS selector failed to parse
    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// Base URL or endpoint is not an absolute URL
    #[error("invalid URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Underlying HTTP client could not be built
    #[error("HTTP client setup failed: {0}")]
    Client(#[source] reqwest::Error),
}

/// The document could not be scraped at all.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Empty or whitespace-only input
    #[error("document is empty")]
    EmptyDocument,

    /// Input contains no markup
    #[error("document contains no markup")]
    NoMarkup,
}

/// Page retrieval failed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL could not be parsed
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// The request did not finish within its timeout
    #[error("timeout fetching: {url}")]
    Timeout { url: String },

    /// Non-2xx response
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The cycle was cancelled while fetching
    #[error("fetch cancelled: {url}")]
    Cancelled { url: String },
}

/// Outcome of a single delivery attempt against a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Connection, DNS or body transfer failure
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The attempt exceeded its timeout
    #[error("delivery attempt timed out")]
    Timeout,

    /// The sink answered with something other than 200
    #[error("sink returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// 200 response whose body is not a JSON acknowledgement
    #[error("unparseable acknowledgement: {0}")]
    InvalidAck(#[source] serde_json::Error),
}

impl SinkError {
    /// Whether another attempt may succeed.
    ///
    /// Network failures, timeouts and 5xx responses are transient; 4xx and
    /// anything else is fatal.
    pub fn is_transient(&self) -> bool {
        match self {
            SinkError::Transport(_) | SinkError::Timeout => true,
            SinkError::Status { status, .. } => (500..600).contains(status),
            SinkError::InvalidAck(_) => false,
        }
    }
}

/// Delivery of a change list failed.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Retryable failures exhausted the retry policy
    #[error("delivery failed after {attempts} attempt(s): {source}")]
    Transient {
        attempts: u32,
        #[source]
        source: SinkError,
    },

    /// Non-retryable failure (e.g. rejected secret)
    #[error("delivery rejected on attempt {attempts}: {source}")]
    Fatal {
        attempts: u32,
        #[source]
        source: SinkError,
    },

    /// Cancelled by the caller
    #[error("delivery cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
}

impl DispatchError {
    /// Number of delivery attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            DispatchError::Transient { attempts, .. }
            | DispatchError::Fatal { attempts, .. }
            | DispatchError::Cancelled { attempts } => *attempts,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, DispatchError::Transient { .. })
    }
}

/// Snapshot store I/O failure.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Filesystem failure
    #[error("snapshot I/O failed for `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Stored snapshot could not be (de)serialized
    #[error("snapshot encoding failed for `{key}`: {source}")]
    Encoding {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Backend-specific failure
    #[error("snapshot store error: {0}")]
    Backend(String),
}

/// Errors surfaced by a watch cycle or by helpers spanning several steps.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    /// Delivery succeeded but the new baseline could not be written; the
    /// same changes may be delivered again next cycle.
    #[error("{delivered} change(s) delivered but snapshot not advanced: {source}")]
    SnapshotNotAdvanced {
        delivered: usize,
        #[source]
        source: SnapshotError,
    },
}

/// Result type alias for cycle-level operations.
pub type Result<T> = std::result::Result<T, Error>;
