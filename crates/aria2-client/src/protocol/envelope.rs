//! JSON-RPC 2.0 envelope types and message identifiers.
//!
//! ```text
//! -> {"jsonrpc":"2.0","method":"aria2.getVersion","params":["token:s3cret"],"id":1}
//! <- {"jsonrpc":"2.0","result":{"version":"1.37.0"},"id":1}
//! <- {"jsonrpc":"2.0","method":"aria2.onDownloadStart","params":[{"gid":"2089b05ecca3d829"}]}
//! ```

use crate::config::ClientConfig;
use crate::Aria2Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Request identifier: an integer in the default mode, a random string otherwise.
///
/// Inbound ids accept any JSON number, so a peer echoing a negative or
/// fractional id still yields a response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Number(serde_json::Number),
    String(String),
}

impl From<u64> for MessageId {
    fn from(n: u64) -> Self {
        MessageId::Number(n.into())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Number(n) => write!(f, "{}", n),
            MessageId::String(s) => f.write_str(s),
        }
    }
}

/// How a client generates identifiers. Fixed for the client's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdMode {
    /// Monotonic counter; the first identifier handed out is 1.
    #[default]
    Integer,
    /// Random v4 UUID strings.
    Uuid,
}

/// Identifier source.
#[derive(Debug)]
pub struct IdGenerator {
    mode: IdMode,
    seq: u64,
}

impl IdGenerator {
    pub fn new(mode: IdMode) -> Self {
        Self { mode, seq: 0 }
    }

    pub fn mode(&self) -> IdMode {
        self.mode
    }

    /// Produce the next identifier. The counter is never reset, so integer
    /// identifiers stay unique across reconnects.
    pub fn next_id(&mut self) -> MessageId {
        match self.mode {
            IdMode::Integer => {
                self.seq += 1;
                MessageId::from(self.seq)
            }
            IdMode::Uuid => MessageId::String(Uuid::new_v4().to_string()),
        }
    }
}

/// Outbound call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Value>>,
    pub id: MessageId,
}

impl Request {
    /// Create a request. An empty parameter list is omitted from the wire.
    pub fn new(method: impl Into<String>, params: Vec<Value>, id: MessageId) -> Self {
        Self {
            jsonrpc: ClientConfig::JSONRPC_VERSION.to_string(),
            method: method.into(),
            params: if params.is_empty() { None } else { Some(params) },
            id,
        }
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<RpcError> for Aria2Error {
    fn from(err: RpcError) -> Self {
        Aria2Error::Rpc {
            code: err.code,
            message: err.message,
        }
    }
}

/// Reply to a request. `id` is `None` when the peer could not read the request id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    #[serde(default)]
    pub id: Option<MessageId>,
}

impl Response {
    /// Convert to the result payload, or the remote error.
    pub fn into_result(self) -> crate::Result<Value> {
        match self.error {
            Some(err) => Err(err.into()),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Server-initiated message without an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Any inbound frame, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Response(Response),
    Notification(Notification),
    Malformed { text: String, reason: String },
}

impl Inbound {
    /// Classify a raw text frame. Never fails; unreadable frames become
    /// [`Inbound::Malformed`].
    pub fn parse(text: &str) -> Self {
        let malformed = |reason: String| Inbound::Malformed {
            text: text.to_string(),
            reason,
        };

        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => return malformed(e.to_string()),
        };
        let Some(object) = value.as_object() else {
            return malformed("frame is not a JSON object".to_string());
        };

        let has_id = object.get("id").is_some_and(|id| !id.is_null());
        if object.contains_key("method") && !has_id {
            return match serde_json::from_value(value) {
                Ok(notification) => Inbound::Notification(notification),
                Err(e) => malformed(e.to_string()),
            };
        }
        if object.contains_key("result") || object.contains_key("error") {
            return match serde_json::from_value(value) {
                Ok(response) => Inbound::Response(response),
                Err(e) => malformed(e.to_string()),
            };
        }
        malformed("frame is neither a response nor a notification".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_ids_start_at_one_and_increase() {
        let mut ids = IdGenerator::new(IdMode::Integer);
        let issued: Vec<MessageId> = (0..5).map(|_| ids.next_id()).collect();
        assert_eq!(
            issued,
            (1..=5).map(MessageId::from).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_uuid_ids_are_distinct_strings() {
        let mut ids = IdGenerator::new(IdMode::Uuid);
        let a = ids.next_id();
        let b = ids.next_id();
        assert!(matches!(&a, MessageId::String(s) if s.len() == 36));
        assert_ne!(a, b);
    }

    #[test]
    fn test_request_omits_empty_params() {
        let request = Request::new("aria2.getVersion", vec![], MessageId::from(1));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"jsonrpc": "2.0", "method": "aria2.getVersion", "id": 1})
        );
    }

    #[test]
    fn test_request_with_params_and_string_id() {
        let request = Request::new(
            "aria2.addUri",
            vec![json!("token:abc"), json!(["http://x/y"])],
            MessageId::String("req-1".into()),
        );
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "jsonrpc": "2.0",
                "method": "aria2.addUri",
                "params": ["token:abc", ["http://x/y"]],
                "id": "req-1"
            })
        );
    }

    #[test]
    fn test_parse_success_response() {
        let inbound = Inbound::parse(r#"{"jsonrpc":"2.0","result":"2089b05ecca3d829","id":3}"#);
        match inbound {
            Inbound::Response(response) => {
                assert_eq!(response.id, Some(MessageId::from(3)));
                assert_eq!(response.into_result().unwrap(), json!("2089b05ecca3d829"));
            }
            other => panic!("Expected response, got: {:?}", other),
        }
    }

    #[test]
    fn test_parse_response_with_negative_or_fractional_id() {
        let inbound = Inbound::parse(r#"{"jsonrpc":"2.0","result":"OK","id":-1}"#);
        let Inbound::Response(response) = inbound else {
            panic!("Expected response, got: {:?}", inbound);
        };
        assert_eq!(response.id, Some(MessageId::Number((-1i64).into())));
        assert_eq!(response.id.map(|id| id.to_string()).as_deref(), Some("-1"));

        let inbound = Inbound::parse(r#"{"jsonrpc":"2.0","result":"OK","id":1.5}"#);
        let Inbound::Response(response) = inbound else {
            panic!("Expected response, got: {:?}", inbound);
        };
        assert_eq!(response.id.map(|id| id.to_string()).as_deref(), Some("1.5"));
    }

    #[test]
    fn test_parse_error_response_with_null_id() {
        let inbound = Inbound::parse(
            r#"{"jsonrpc":"2.0","error":{"code":-32700,"message":"Parse error."},"id":null}"#,
        );
        let Inbound::Response(response) = inbound else {
            panic!("Expected response");
        };
        assert!(response.id.is_none());
        let err = response.into_result().unwrap_err();
        assert!(matches!(err, Aria2Error::Rpc { code: -32700, .. }));
    }

    #[test]
    fn test_parse_error_with_data() {
        let inbound = Inbound::parse(
            r#"{"jsonrpc":"2.0","error":{"code":1,"message":"Unauthorized","data":{"hint":"token"}},"id":"abc"}"#,
        );
        let Inbound::Response(response) = inbound else {
            panic!("Expected response");
        };
        let error = response.error.unwrap();
        assert_eq!(error.data, Some(json!({"hint": "token"})));
        assert_eq!(response.id, Some(MessageId::String("abc".into())));
    }

    #[test]
    fn test_parse_notification() {
        let inbound = Inbound::parse(
            r#"{"jsonrpc":"2.0","method":"aria2.onDownloadComplete","params":[{"gid":"abc"}]}"#,
        );
        let Inbound::Notification(notification) = inbound else {
            panic!("Expected notification");
        };
        assert_eq!(notification.method, "aria2.onDownloadComplete");
        assert_eq!(notification.params, Some(json!([{"gid": "abc"}])));
    }

    #[test]
    fn test_parse_malformed_frames() {
        assert!(matches!(Inbound::parse("not json"), Inbound::Malformed { .. }));
        assert!(matches!(Inbound::parse("[1,2]"), Inbound::Malformed { .. }));
        assert!(matches!(
            Inbound::parse(r#"{"jsonrpc":"2.0","id":1}"#),
            Inbound::Malformed { .. }
        ));
        assert!(matches!(
            Inbound::parse(r#"{"jsonrpc":"2.0","error":"oops","id":1}"#),
            Inbound::Malformed { .. }
        ));
    }
}
