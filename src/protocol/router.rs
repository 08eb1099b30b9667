//! Method router: one decoded JSON-RPC message in, at most one response out.

use crate::dispatch::{InvocationDispatcher, InvocationResult};
use crate::protocol::content::ContentProvider;
use crate::protocol::messages::{Inbound, RpcError, RpcResponse, PROTOCOL_VERSION};
use crate::types::{Error, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Shared, read-only state every session routes through.
#[derive(Debug, Clone)]
pub struct ProtocolRouter {
    dispatcher: InvocationDispatcher,
    content: Arc<dyn ContentProvider>,
    server_name: String,
}

impl ProtocolRouter {
    pub fn new(
        dispatcher: InvocationDispatcher,
        content: Arc<dyn ContentProvider>,
        server_name: impl Into<String>,
    ) -> Self {
        Self {
            dispatcher,
            content,
            server_name: server_name.into(),
        }
    }

    pub fn dispatcher(&self) -> &InvocationDispatcher {
        &self.dispatcher
    }

    /// Handle one inbound message. Returns `None` for notifications and
    /// messages the server does not answer.
    pub async fn handle(&self, message: Value) -> Option<Value> {
        let request = match Inbound::decode(message) {
            Inbound::Request(request) => request,
            Inbound::Ignored => return None,
            Inbound::Invalid(response) => return Some(response.to_value()),
        };

        let params = request.params.unwrap_or(Value::Null);
        let Some(id) = request.id else {
            self.handle_notification(&request.method);
            return None;
        };

        let response = match self.route_request(&request.method, params).await {
            Ok(result) => RpcResponse::success(id, result),
            Err(e) => {
                if e.is_invocation_error() {
                    tracing::warn!(method = %request.method, error = %e, "Request failed");
                } else {
                    tracing::error!(method = %request.method, error = %e, "Request failed");
                }
                RpcResponse::failure(id, RpcError::from(&e))
            }
        };
        Some(response.to_value())
    }

    fn handle_notification(&self, method: &str) {
        match method {
            "notifications/initialized" => tracing::debug!("Client initialized"),
            other => tracing::debug!(method = other, "Ignoring notification"),
        }
    }

    /// Route a request by method name.
    pub async fn route_request(&self, method: &str, params: Value) -> Result<Value> {
        match method {
            "initialize" => Ok(self.initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => {
                let catalog = self.dispatcher.catalog().load();
                listing("tools", catalog.list())
            }
            "tools/call" => {
                let name = str_field(&params, "name")?;
                let arguments = object_field(&params, "arguments")?;
                let result = self.dispatcher.invoke(&name, arguments).await?;
                Ok(call_result(&result))
            }
            "resources/list" => listing("resources", self.content.resources()),
            "resources/templates/list" => {
                listing("resourceTemplates", self.content.resource_templates())
            }
            "resources/read" => {
                let uri = str_field(&params, "uri")?;
                self.content.read_resource(&uri)
            }
            "prompts/list" => listing("prompts", self.content.prompts()),
            "prompts/get" => {
                let name = str_field(&params, "name")?;
                let arguments = object_field(&params, "arguments")?;
                self.content.get_prompt(&name, &arguments)
            }
            _ => Err(Error::MethodNotFound(method.to_string())),
        }
    }

    fn initialize(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false },
                "resources": { "subscribe": false, "listChanged": false },
                "prompts": { "listChanged": false }
            },
            "serverInfo": {
                "name": self.server_name,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }
}

/// Wire form of a completed call. Upstream error statuses are results with
/// `isError` set, not JSON-RPC errors.
pub fn call_result(result: &InvocationResult) -> Value {
    let text = match &result.body {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    json!({
        "content": [{ "type": "text", "text": text }],
        "structuredContent": { "status": result.status, "body": result.body },
        "isError": result.status >= 400
    })
}

// =============================================================================
// Param helpers
// =============================================================================

/// `{key: [items...]}`
fn listing<T: Serialize>(key: &str, items: T) -> Result<Value> {
    let mut result = Map::new();
    result.insert(key.to_string(), serde_json::to_value(items)?);
    Ok(Value::Object(result))
}

pub fn str_field(params: &Value, key: &str) -> Result<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| Error::validation(format!("Missing required field: {}", key)))
}

/// An optional object field; absent or null is an empty object.
pub fn object_field(params: &Value, key: &str) -> Result<Map<String, Value>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(Error::validation(format!("Field {} must be an object", key))),
    }
}
