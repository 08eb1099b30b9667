//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context. Load and compile errors are fatal to the
//! attempt that raised them; invocation errors are converted into JSON-RPC
//! error objects at the session boundary.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// JSON-RPC: the message is not a valid request object.
pub const RPC_INVALID_REQUEST: i64 = -32600;
/// JSON-RPC: the method does not exist.
pub const RPC_METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC: invalid method parameters.
pub const RPC_INVALID_PARAMS: i64 = -32602;
/// JSON-RPC: internal error.
pub const RPC_INTERNAL_ERROR: i64 = -32603;
/// Server-defined: the loaded document has no usable base URL.
pub const RPC_NO_BASE_URL: i64 = -32001;
/// Server-defined: the upstream API could not be reached.
pub const RPC_TRANSPORT_ERROR: i64 = -32002;

/// Main error enum for the bridge.
#[derive(Error, Debug)]
pub enum Error {
    /// The document's file extension is not `.yaml`, `.yml` or `.json`.
    #[error("unsupported file format: {0:?}. Use .yaml, .yml, or .json")]
    UnsupportedFormat(String),

    /// The document could not be decoded or has an unexpected shape.
    #[error("failed to parse document: {0}")]
    DocumentParse(String),

    /// Two operations derive the same tool name.
    #[error("duplicate tool name: {0}")]
    DuplicateToolName(String),

    /// No tool with this name exists in the published catalog.
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// A required argument was not supplied.
    #[error("missing required argument: {0}")]
    MissingArgument(String),

    /// The document declares no server URL and none was configured.
    #[error("no base URL configured for outbound calls")]
    NoBaseUrl,

    /// Connection-level failure talking to the upstream API.
    #[error("transport error: {0}")]
    Transport(String),

    /// Caller-supplied input is malformed.
    #[error("validation error: {0}")]
    Validation(String),

    /// The JSON-RPC method is not served.
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// The server already holds its maximum number of sessions.
    #[error("session limit reached ({0})")]
    SessionLimit(usize),

    /// Internal errors.
    #[error("internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Convert to a JSON-RPC error code.
    pub fn to_rpc_code(&self) -> i64 {
        match self {
            Error::ToolNotFound(_) | Error::MissingArgument(_) | Error::Validation(_) => {
                RPC_INVALID_PARAMS
            }
            Error::MethodNotFound(_) => RPC_METHOD_NOT_FOUND,
            Error::NoBaseUrl => RPC_NO_BASE_URL,
            Error::Transport(_) => RPC_TRANSPORT_ERROR,
            Error::UnsupportedFormat(_)
            | Error::DocumentParse(_)
            | Error::DuplicateToolName(_)
            | Error::SessionLimit(_)
            | Error::Internal(_)
            | Error::Serialization(_)
            | Error::Io(_) => RPC_INTERNAL_ERROR,
        }
    }

    /// True for errors raised while invoking a tool, as opposed to loading
    /// or compiling a document.
    pub fn is_invocation_error(&self) -> bool {
        matches!(
            self,
            Error::ToolNotFound(_)
                | Error::MissingArgument(_)
                | Error::NoBaseUrl
                | Error::Transport(_)
                | Error::Validation(_)
        )
    }
}

// Convenience constructors
impl Error {
    pub fn document_parse(msg: impl Into<String>) -> Self {
        Self::DocumentParse(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::DocumentParse(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Error::Validation(format!("invalid outbound request: {}", err))
        } else if err.is_timeout() {
            Error::Transport(format!("request timed out: {}", err))
        } else {
            Error::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_errors_map_to_rpc_codes() {
        assert_eq!(Error::ToolNotFound("x".into()).to_rpc_code(), RPC_INVALID_PARAMS);
        assert_eq!(Error::MissingArgument("id".into()).to_rpc_code(), RPC_INVALID_PARAMS);
        assert_eq!(Error::NoBaseUrl.to_rpc_code(), RPC_NO_BASE_URL);
        assert_eq!(Error::transport("refused").to_rpc_code(), RPC_TRANSPORT_ERROR);
        assert_eq!(Error::internal("boom").to_rpc_code(), RPC_INTERNAL_ERROR);
        assert_eq!(
            Error::MethodNotFound("foo/bar".into()).to_rpc_code(),
            RPC_METHOD_NOT_FOUND
        );
    }

    #[test]
    fn test_load_errors_are_not_invocation_errors() {
        assert!(!Error::UnsupportedFormat(".toml".into()).is_invocation_error());
        assert!(!Error::DuplicateToolName("get__a".into()).is_invocation_error());
        assert!(Error::NoBaseUrl.is_invocation_error());
    }

    #[test]
    fn test_messages_name_the_offending_value() {
        let err = Error::MissingArgument("id".into());
        assert_eq!(err.to_string(), "missing required argument: id");
        let err = Error::UnsupportedFormat(".toml".into());
        assert!(err.to_string().contains(".toml"));
    }
}
