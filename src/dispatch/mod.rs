//! Tool invocation, from `(tool name, arguments)` to an upstream response.

pub mod dispatcher;
pub mod invoker;

pub use dispatcher::{build_request, check_required, InvocationDispatcher};
pub use invoker::{EchoInvoker, HttpInvoker, InvocationResult, OutboundRequest, ReqwestInvoker};
