use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::dispatch::{DispatcherConfig, RetryPolicy};
use crate::security::NotificationSecret;
use crate::types::config::{default_config, Configuration};
use crate::watcher::WatchTarget;

/// Process settings loaded from environment variables
#[derive(Debug, Clone)]
pub struct Settings {
    pub target_url: String,
    pub snapshot_key: Option<String>,
    pub notification_base_url: String,
    pub notification_secret: NotificationSecret,
    pub fetch_timeout: Duration,
    pub dispatch_timeout: Duration,
    pub retry: RetryPolicy,
    pub snapshot_dir: PathBuf,
    pub config_path: Option<PathBuf>,
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load settings from an arbitrary variable lookup.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let secret = var("NOTIF_SECRET").context("NOTIF_SECRET must be set")?;
        if secret.is_empty() {
            anyhow::bail!("NOTIF_SECRET must not be empty");
        }

        let retry = RetryPolicy::new(
            parse_or(&var, "DISPATCH_MAX_ATTEMPTS", 3)?,
            Duration::from_millis(parse_or(&var, "DISPATCH_BACKOFF_MS", 500)?),
            parse_or(&var, "DISPATCH_BACKOFF_MULTIPLIER", 2.0)?,
        );

        Ok(Self {
            target_url: var("WATCH_URL").unwrap_or_else(|| "https://dtu.ac.in/".to_string()),
            snapshot_key: var("WATCH_KEY"),
            notification_base_url: var("NOTIFICATION_BASE_URL")
                .unwrap_or_else(|| "http://localhost:8080".to_string()),
            notification_secret: NotificationSecret::new(secret),
            fetch_timeout: Duration::from_secs(parse_or(&var, "FETCH_TIMEOUT_SECS", 30)?),
            dispatch_timeout: Duration::from_secs(parse_or(&var, "DISPATCH_TIMEOUT_SECS", 10)?),
            retry,
            snapshot_dir: var("SNAPSHOT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            config_path: var("WATCH_CONFIG_PATH").map(PathBuf::from),
        })
    }

    /// The watched target, keyed by `WATCH_KEY` when set.
    pub fn target(&self) -> WatchTarget {
        let target = WatchTarget::new(&self.target_url);
        match &self.snapshot_key {
            Some(key) => target.with_key(key),
            None => target,
        }
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig::new(self.notification_secret.clone())
            .with_retry(self.retry.clone())
            .with_attempt_timeout(self.dispatch_timeout)
    }

    /// Extraction configuration from `WATCH_CONFIG_PATH`, or the built-in
    /// default when unset.
    pub fn load_configuration(&self) -> Result<Configuration> {
        let Some(path) = &self.config_path else {
            return Ok(default_config());
        };

        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?;
        Configuration::from_json(&json)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", key)),
        None => Ok(default),
    }
}
