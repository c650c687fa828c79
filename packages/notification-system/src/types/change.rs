//! Change list produced by the diff and the payload that carries it.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// One difference between two record sequences.
///
/// `field`, `old` and `new` are only set for [`ChangeKind::Modified`]; for a
/// modified field that disappeared or appeared, the missing side is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub kind: ChangeKind,

    /// Identity key of the record
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new: Option<String>,
}

impl Change {
    pub fn added(id: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Added,
            id: id.into(),
            field: None,
            old: None,
            new: None,
        }
    }

    pub fn removed(id: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Removed,
            id: id.into(),
            field: None,
            old: None,
            new: None,
        }
    }

    pub fn modified(
        id: impl Into<String>,
        field: impl Into<String>,
        old: Option<String>,
        new: Option<String>,
    ) -> Self {
        Self {
            kind: ChangeKind::Modified,
            id: id.into(),
            field: Some(field.into()),
            old,
            new,
        }
    }
}

/// Body of a notification request: `{"data": [...], "secret": "..."}`.
///
/// Borrows the change list and the exposed secret for the duration of one
/// dispatch.
#[derive(Serialize)]
pub struct NotificationPayload<'a> {
    pub data: &'a [Change],
    pub secret: &'a str,
}

impl<'a> NotificationPayload<'a> {
    pub fn new(data: &'a [Change], secret: &'a str) -> Self {
        Self { data, secret }
    }
}

impl fmt::Debug for NotificationPayload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationPayload")
            .field("data", &self.data)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// JSON body the sink returned with a 200.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Acknowledgement(pub serde_json::Value);
