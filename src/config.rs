//! Client configuration.
//!
//! Defaults are suitable for a local backend; everything can be overridden
//! through the environment (a `.env` file is honored via `dotenvy`).

use std::time::Duration;

use crate::calls::CallPolicy;

/// Connection and resilience settings for the backend client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the backend API, without a trailing slash.
    pub base_url: String,
    /// Per-attempt time budget.
    pub timeout: Duration,
    /// Additional attempts after the first.
    pub max_retries: u32,
    /// Linear backoff base between attempts.
    pub backoff_base: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 2,
            backoff_base: Duration::from_millis(500),
        }
    }
}

impl ClientConfig {
    /// Build a config from the environment, falling back to defaults.
    ///
    /// Recognized variables:
    /// - `FLOWFORGE_API_URL`
    /// - `FLOWFORGE_TIMEOUT_MS`
    /// - `FLOWFORGE_MAX_RETRIES`
    /// - `FLOWFORGE_BACKOFF_MS`
    #[must_use]
    pub fn from_env() -> Self {
        // A missing .env file is fine; real env vars still apply.
        let _ = dotenvy::dotenv();
        let defaults = Self::default();
        Self {
            base_url: std::env::var("FLOWFORGE_API_URL").unwrap_or(defaults.base_url),
            timeout: env_millis("FLOWFORGE_TIMEOUT_MS").unwrap_or(defaults.timeout),
            max_retries: env_u32("FLOWFORGE_MAX_RETRIES").unwrap_or(defaults.max_retries),
            backoff_base: env_millis("FLOWFORGE_BACKOFF_MS").unwrap_or(defaults.backoff_base),
        }
    }

    /// The resilience policy implied by this config.
    #[must_use]
    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy {
            timeout: self.timeout,
            max_retries: self.max_retries,
            backoff_base: self.backoff_base,
        }
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    env_u32(key).map(|ms| Duration::from_millis(u64::from(ms)))
}

fn env_u32(key: &str) -> Option<u32> {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%key, %raw, "ignoring unparseable configuration value");
                None
            }
        },
        Err(_) => None,
    }
}
