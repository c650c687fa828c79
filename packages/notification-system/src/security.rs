//! Shared-secret handling.

use secrecy::{ExposeSecret, SecretString};

/// Secret the notification service uses to authenticate the sender.
///
/// Injected into [`DispatcherConfig`](crate::DispatcherConfig) at
/// construction time; nothing in the engine reads it from the environment.
/// `Debug` output is redacted by [`SecretString`].
#[derive(Clone, Debug)]
pub struct NotificationSecret(SecretString);

impl NotificationSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    /// The raw value, for the outgoing payload only.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }
}

impl From<SecretString> for NotificationSecret {
    fn from(secret: SecretString) -> Self {
        Self(secret)
    }
}
