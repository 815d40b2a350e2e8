//! Argument types for `aria2.addUri`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One or more URIs pointing at the same resource.
///
/// A single URI is always sent as a one-element list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UriList(Vec<String>);

impl UriList {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.0.iter().cloned().map(Value::String).collect())
    }
}

impl From<&str> for UriList {
    fn from(uri: &str) -> Self {
        Self(vec![uri.to_string()])
    }
}

impl From<String> for UriList {
    fn from(uri: String) -> Self {
        Self(vec![uri])
    }
}

impl From<Vec<String>> for UriList {
    fn from(uris: Vec<String>) -> Self {
        Self(uris)
    }
}

impl From<Vec<&str>> for UriList {
    fn from(uris: Vec<&str>) -> Self {
        Self(uris.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for UriList {
    fn from(uris: &[&str]) -> Self {
        Self(uris.iter().map(|uri| uri.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for UriList {
    fn from(uris: [&str; N]) -> Self {
        Self(uris.iter().map(|uri| uri.to_string()).collect())
    }
}

/// Per-download option record. aria2 takes every option value as a string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadOptions(BTreeMap<String, String>);

impl DownloadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory to store the downloaded file in.
    pub fn dir(self, dir: impl Into<String>) -> Self {
        self.set("dir", dir)
    }

    /// File name of the downloaded file, relative to `dir`.
    pub fn out(self, out: impl Into<String>) -> Self {
        self.set("out", out)
    }

    /// Set an arbitrary option, e.g. `("max-connection-per-server", "4")`.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(key, value)| (key.clone(), Value::String(value.clone())))
                .collect(),
        )
    }
}
