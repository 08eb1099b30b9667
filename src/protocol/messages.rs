//! JSON-RPC 2.0 message shapes used on a session.

use crate::types::{Error, RPC_INVALID_REQUEST};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC version string.
pub const JSONRPC_VERSION: &str = "2.0";

/// Protocol revision reported in `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Incoming request or notification.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    /// Absent for notifications.
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl RpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Outcome of decoding one inbound message.
#[derive(Debug)]
pub enum Inbound {
    Request(RpcRequest),
    /// A response or other message the server does not act on.
    Ignored,
    /// Malformed; answer with this error.
    Invalid(RpcResponse),
}

impl Inbound {
    pub fn decode(message: Value) -> Self {
        if message.get("method").is_none()
            && (message.get("result").is_some() || message.get("error").is_some())
        {
            return Inbound::Ignored;
        }
        let id = message.get("id").cloned().unwrap_or(Value::Null);
        // A present but null id is neither a request nor a notification.
        if message.get("id").is_some_and(Value::is_null) && message.get("method").is_some() {
            return Inbound::Invalid(RpcResponse::failure(
                Value::Null,
                RpcError::new(RPC_INVALID_REQUEST, "request id must not be null"),
            ));
        }
        match serde_json::from_value::<RpcRequest>(message) {
            Ok(request) if request.jsonrpc == JSONRPC_VERSION => Inbound::Request(request),
            Ok(request) => Inbound::Invalid(RpcResponse::failure(
                id,
                RpcError::new(
                    RPC_INVALID_REQUEST,
                    format!("unsupported jsonrpc version: {}", request.jsonrpc),
                ),
            )),
            Err(e) => Inbound::Invalid(RpcResponse::failure(
                id,
                RpcError::new(RPC_INVALID_REQUEST, format!("invalid request: {}", e)),
            )),
        }
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl From<&Error> for RpcError {
    fn from(err: &Error) -> Self {
        RpcError::new(err.to_rpc_code(), err.to_string())
    }
}

/// Outgoing response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_request_and_notification() {
        match Inbound::decode(json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})) {
            Inbound::Request(req) => {
                assert_eq!(req.method, "tools/list");
                assert!(!req.is_notification());
            }
            other => panic!("unexpected: {other:?}"),
        }
        match Inbound::decode(json!({"jsonrpc": "2.0", "method": "notifications/initialized"})) {
            Inbound::Request(req) => assert!(req.is_notification()),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_decode_client_response_is_ignored() {
        assert!(matches!(
            Inbound::decode(json!({"jsonrpc": "2.0", "id": 3, "result": {}})),
            Inbound::Ignored
        ));
    }

    #[test]
    fn test_decode_invalid_keeps_id() {
        match Inbound::decode(json!({"jsonrpc": "1.0", "id": 9, "method": "ping"})) {
            Inbound::Invalid(resp) => {
                assert_eq!(resp.id, json!(9));
                assert_eq!(resp.error.unwrap().code, RPC_INVALID_REQUEST);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(Inbound::decode(json!("hello")), Inbound::Invalid(_)));
    }

    #[test]
    fn test_decode_null_id_is_invalid() {
        match Inbound::decode(json!({"jsonrpc": "2.0", "id": null, "method": "tools/call"})) {
            Inbound::Invalid(resp) => {
                assert_eq!(resp.id, Value::Null);
                assert_eq!(resp.error.unwrap().code, RPC_INVALID_REQUEST);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_response_wire_form() {
        let ok = RpcResponse::success(json!(1), json!({"tools": []}));
        assert_eq!(ok.to_value(), json!({"jsonrpc": "2.0", "id": 1, "result": {"tools": []}}));

        let err = RpcResponse::failure(json!("a"), RpcError::from(&Error::NoBaseUrl));
        assert_eq!(err.to_value()["error"]["code"], json!(crate::types::RPC_NO_BASE_URL));
    }
}
