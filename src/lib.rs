//! # openapi-mcp - OpenAPI to MCP tool bridge
//!
//! Turns an OpenAPI document into a catalog of callable tools and serves it
//! to protocol clients over long-lived sessions:
//! - Document loading from YAML or JSON into a normalized [`spec::SpecModel`]
//! - Deterministic compilation of every operation into a [`tools::Tool`]
//! - An immutable, atomically republished [`tools::ToolCatalog`]
//! - Tool invocation as outbound HTTP calls against the API's base URL
//! - JSON-RPC sessions carried over Server-Sent Events
//!
//! ## Architecture
//!
//! ```text
//!   document ─→ loader ─→ SpecModel ─→ compiler ─→ ToolCatalog (ArcSwap)
//!                                                      │
//!   client ⇄ SSE transport ⇄ Session ─→ ProtocolRouter ┤
//!                                                      │
//!                                   InvocationDispatcher ─→ upstream API
//! ```
//!
//! Sessions share one read-only catalog snapshot per request and never
//! block each other; each handles its own requests strictly in order.

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod dispatch;
pub mod protocol;
pub mod spec;
pub mod tools;
pub mod transport;
pub mod types;

// Internal utilities
pub mod observability;

pub use types::{Config, Error, Result};
