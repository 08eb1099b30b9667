//! Configuration structures.
//!
//! Every field has a default; the server binary overrides them from command
//! line arguments and `OPENAPI_MCP_*` environment variables.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Global bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Per-session configuration.
    #[serde(default)]
    pub session: SessionConfig,

    /// Outbound HTTP configuration.
    #[serde(default)]
    pub http: HttpConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP bind address for the SSE transport.
    pub listen_addr: String,

    /// Route that opens a new session stream.
    pub sse_path: String,

    /// Route that accepts client-to-server messages.
    pub messages_path: String,

    /// Maximum concurrent sessions. Connects beyond this limit are refused.
    pub max_sessions: usize,

    /// Interval between SSE keep-alive comments.
    #[serde(with = "humantime_serde")]
    pub keep_alive: Duration,

    /// Name reported in `initialize` responses.
    pub name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            sse_path: "/sse".to_string(),
            messages_path: "/messages".to_string(),
            max_sessions: 256,
            keep_alive: Duration::from_secs(15),
            name: "openapi-mcp".to_string(),
        }
    }
}

/// Per-session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Bounded capacity of each direction of the session channel.
    pub channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
        }
    }
}

/// Outbound HTTP configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Overrides the document's first server URL when set.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Upper bound on a single outbound call.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "http": { "base_url": "http://localhost:9000", "request_timeout": "5s" }
        }))
        .unwrap();

        assert_eq!(config.http.base_url.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.http.request_timeout, Duration::from_secs(5));
        assert_eq!(config.server.sse_path, "/sse");
        assert_eq!(config.session.channel_capacity, 64);
    }
}
