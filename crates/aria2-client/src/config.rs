//! Centralized configuration for the aria2 client.
//!
//! Constants live on unit structs; per-instance settings live in
//! [`ClientOptions`], which can be deserialized from a JSON settings file and
//! patched with a partial [`ClientOptionsUpdate`].

use crate::{Aria2Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Client-level constants.
pub struct ClientConfig;

impl ClientConfig {
    pub const DEFAULT_URL: &'static str = "ws://127.0.0.1:6800/jsonrpc";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);
    pub const JSONRPC_VERSION: &'static str = "2.0";
    pub const TOKEN_PREFIX: &'static str = "token:";
    pub const SUPPORTED_SCHEMES: [&'static str; 2] = ["ws", "wss"];
}

/// Remote method names used by the domain client.
pub struct Aria2Methods;

impl Aria2Methods {
    pub const ADD_URI: &'static str = "aria2.addUri";
    pub const GET_VERSION: &'static str = "aria2.getVersion";
}

/// Settings for one client instance.
///
/// `timeout` is advisory: it is stored and handed to callers that want a
/// deadline, but no request is ever timed out by the client itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(with = "millis")]
    pub timeout: Duration,
    /// Default download directory handed to `aria2.addUri` by front-ends.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            url: ClientConfig::DEFAULT_URL.to_string(),
            token: None,
            timeout: ClientConfig::DEFAULT_TIMEOUT,
            dir: None,
        }
    }
}

/// Partial settings change. `None` fields leave the current value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClientOptionsUpdate {
    pub url: Option<String>,
    pub token: Option<String>,
    #[serde(default, with = "millis_opt")]
    pub timeout: Option<Duration>,
    pub dir: Option<String>,
}

impl ClientOptions {
    /// Load options from a JSON settings file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|e| Aria2Error::io_with_path(e, path))?;
        let options: Self = serde_json::from_str(&text).map_err(|e| Aria2Error::Config {
            message: format!("Invalid settings file {}: {}", path.display(), e),
        })?;
        Ok(options)
    }

    /// Apply a partial update and return the names of the fields it touched.
    pub fn merge(&mut self, update: ClientOptionsUpdate) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if let Some(url) = update.url {
            self.url = url;
            changed.push("url");
        }
        if let Some(token) = update.token {
            self.token = Some(token);
            changed.push("token");
        }
        if let Some(timeout) = update.timeout {
            self.timeout = timeout;
            changed.push("timeout");
        }
        if let Some(dir) = update.dir {
            self.dir = Some(dir);
            changed.push("dir");
        }
        if !changed.is_empty() {
            info!("aria2 settings changed: {:?}", changed);
        }
        changed
    }
}

/// Durations travel as integer milliseconds, matching the daemon's settings UI.
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod millis_opt {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
