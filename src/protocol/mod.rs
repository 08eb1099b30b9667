//! Session protocol: JSON-RPC messages, method routing and per-session loops.

pub mod content;
pub mod messages;
pub mod router;
pub mod server;
pub mod session;

pub use content::{
    ContentProvider, Prompt, PromptArgument, Resource, ResourceTemplate, StaticContent,
};
pub use messages::{Inbound, RpcError, RpcRequest, RpcResponse, JSONRPC_VERSION, PROTOCOL_VERSION};
pub use router::ProtocolRouter;
pub use server::{Delivery, SessionHandle, SessionProtocolServer};
pub use session::{Session, SessionState};
