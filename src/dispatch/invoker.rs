//! Outbound HTTP collaborators.
//!
//! [`HttpInvoker`] is the seam between the dispatcher and the network.
//! [`ReqwestInvoker`] performs real calls through one pooled client;
//! [`EchoInvoker`] answers every request with a description of it and is
//! used for dry runs and tests.

use crate::spec::HttpMethod;
use crate::types::{Error, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A fully resolved outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// Normalized upstream response. Any HTTP status, 4xx and 5xx included,
/// is a result rather than an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationResult {
    pub status: u16,
    pub body: Value,
}

impl InvocationResult {
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

/// Performs one outbound call. Implementations hold no per-call state and
/// must be safe to share across sessions.
#[async_trait]
pub trait HttpInvoker: Send + Sync + std::fmt::Debug {
    /// Issue the request. Fails only on connection-level problems.
    async fn send(&self, request: OutboundRequest) -> Result<InvocationResult>;
}

// =============================================================================
// reqwest
// =============================================================================

/// Real invoker backed by a pooled [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestInvoker {
    client: reqwest::Client,
}

impl ReqwestInvoker {
    /// Build a client whose calls are bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
        HttpMethod::Patch => reqwest::Method::PATCH,
    }
}

#[async_trait]
impl HttpInvoker for ReqwestInvoker {
    async fn send(&self, request: OutboundRequest) -> Result<InvocationResult> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), request.url.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(method = %request.method, url = %request.url, "Outbound call");
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        tracing::debug!(status, url = %request.url, "Outbound call finished");
        Ok(InvocationResult { status, body })
    }
}

// =============================================================================
// Echo
// =============================================================================

/// Answers `200` with the request it was given. Counts calls.
#[derive(Debug, Default)]
pub struct EchoInvoker {
    calls: AtomicUsize,
}

impl EchoInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpInvoker for EchoInvoker {
    async fn send(&self, request: OutboundRequest) -> Result<InvocationResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(InvocationResult {
            status: 200,
            body: serde_json::json!({
                "method": request.method.as_str(),
                "url": request.url.as_str(),
                "query": request.query,
                "headers": request.headers,
                "body": request.body,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_reflects_request() {
        let invoker = EchoInvoker::new();
        let request = OutboundRequest {
            method: HttpMethod::Post,
            url: Url::parse("https://api.test/orders").unwrap(),
            query: vec![("dry_run".to_string(), "true".to_string())],
            headers: Vec::new(),
            body: Some(serde_json::json!({"qty": 2})),
        };

        let result = invoker.send(request).await.unwrap();

        assert_eq!(invoker.calls(), 1);
        assert_eq!(result.status, 200);
        assert_eq!(result.body["method"], "post");
        assert_eq!(result.body["url"], "https://api.test/orders");
        assert_eq!(result.body["query"][0], serde_json::json!(["dry_run", "true"]));
        assert_eq!(result.body["body"]["qty"], 2);
    }

    #[test]
    fn test_success_range() {
        let ok = InvocationResult { status: 204, body: Value::Null };
        let missing = InvocationResult { status: 404, body: Value::Null };
        assert!(ok.is_success());
        assert!(!missing.is_success());
    }
}
