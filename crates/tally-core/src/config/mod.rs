//! Remote and sync configuration.
//!
//! `RemoteConfig` describes the remote document store the sync engine pushes
//! to; `SyncSettings` controls the background worker cadence.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RemoteError, Result};
use crate::util::{is_http_url, normalize_text_option};

pub const ENV_REMOTE_URL: &str = "TALLY_REMOTE_URL";
pub const ENV_REMOTE_TOKEN: &str = "TALLY_REMOTE_TOKEN";
pub const ENV_REMOTE_TIMEOUT_SECS: &str = "TALLY_REMOTE_TIMEOUT_SECS";
pub const ENV_REMOTE_COLLECTION: &str = "TALLY_REMOTE_COLLECTION";

pub const DEFAULT_COLLECTION: &str = "entries";
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60;

/// Connection settings for the remote entry store.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    base_url: String,
    api_token: String,
    timeout: Duration,
    collection: String,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RemoteConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("collection", &self.collection)
            .finish()
    }
}

impl RemoteConfig {
    /// Validate and normalize remote settings.
    ///
    /// The base URL must use http or https; a trailing `/` is dropped.
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Result<Self> {
        let base_url = normalize_text_option(Some(base_url.into()))
            .ok_or_else(|| invalid("remote URL must not be empty"))?;
        if !is_http_url(&base_url) {
            return Err(invalid("remote URL must include http:// or https://"));
        }
        let api_token = normalize_text_option(Some(api_token.into()))
            .ok_or_else(|| invalid("remote API token must not be empty"))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
            timeout: Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS),
            collection: DEFAULT_COLLECTION.to_string(),
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Result<Self> {
        let collection = normalize_text_option(Some(collection.into()))
            .map(|collection| collection.trim_matches('/').to_string())
            .filter(|collection| !collection.is_empty())
            .ok_or_else(|| invalid("remote collection must not be empty"))?;
        self.collection = collection;
        Ok(self)
    }

    /// Read settings from `TALLY_REMOTE_*` environment variables.
    ///
    /// Returns `Ok(None)` when no remote URL is set.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`RemoteConfig::from_env`] with an injectable variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        let Some(base_url) = normalize_text_option(lookup(ENV_REMOTE_URL)) else {
            return Ok(None);
        };
        let api_token = normalize_text_option(lookup(ENV_REMOTE_TOKEN))
            .ok_or_else(|| invalid(format!("{ENV_REMOTE_TOKEN} must be set with {ENV_REMOTE_URL}")))?;

        let mut config = Self::new(base_url, api_token)?;
        if let Some(raw) = normalize_text_option(lookup(ENV_REMOTE_TIMEOUT_SECS)) {
            let seconds: u64 = raw
                .parse()
                .map_err(|_| invalid(format!("{ENV_REMOTE_TIMEOUT_SECS} must be a whole number")))?;
            config = config.with_timeout(Duration::from_secs(seconds));
        }
        if let Some(collection) = normalize_text_option(lookup(ENV_REMOTE_COLLECTION)) {
            config = config.with_collection(collection)?;
        }
        Ok(Some(config))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_token(&self) -> &str {
        &self.api_token
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// URL of the entry collection
    pub fn collection_url(&self) -> String {
        format!("{}/{}", self.base_url, self.collection)
    }
}

/// Background sync cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(with = "duration_secs")]
    pub interval: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
        }
    }
}

fn invalid(message: impl Into<String>) -> crate::Error {
    RemoteError::InvalidConfiguration(message.into()).into()
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
