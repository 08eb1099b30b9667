//! Core types for the bridge.
//!
//! This module provides foundational types used throughout the system:
//! - **IDs**: Strongly-typed session identifiers
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for the server, sessions and HTTP client

mod config;
mod errors;
mod ids;

pub use config::{Config, HttpConfig, ObservabilityConfig, ServerConfig, SessionConfig};
pub use errors::{
    Error, Result, RPC_INTERNAL_ERROR, RPC_INVALID_PARAMS, RPC_INVALID_REQUEST,
    RPC_METHOD_NOT_FOUND, RPC_NO_BASE_URL, RPC_TRANSPORT_ERROR,
};
pub use ids::SessionId;
