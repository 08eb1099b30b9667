//! Network transports for the session protocol.

pub mod sse;

pub use sse::SseServer;
