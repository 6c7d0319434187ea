//! Error taxonomy surfaced to callers of the engine.

use kodi_remote_core::protocol::messages::RpcErrorPayload;
use kodi_remote_core::CodecError;
use thiserror::Error;

use crate::domain::ConfigError;

/// Every failure a command or connection attempt can complete with.
///
/// The type is `Clone` because one event (a closed socket, a stopped engine)
/// fails many waiting callers at once.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RemoteError {
    /// Opening the transport failed (DNS, socket, handshake, auth).
    #[error("could not connect to {endpoint}: {reason}")]
    ConnectionError { endpoint: String, reason: String },

    /// The connection closed while the call was outstanding.
    #[error("connection lost")]
    ConnectionLost,

    /// No live connection to send on.
    #[error("not connected")]
    NotConnected,

    /// The server did not answer within the request timeout.
    #[error("{method} timed out")]
    RpcTimeout { method: String },

    /// The server answered with a JSON-RPC error object.
    #[error("server returned error {code}: {message}")]
    RpcError { code: i64, message: String },

    /// A command argument failed local validation and was never sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A frame or result could not be encoded or understood.
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// Connection settings can only change while disconnected.
    #[error("cannot reconfigure while connected")]
    ReconfigureWhileConnected,

    /// The engine task is no longer running.
    #[error("engine stopped")]
    EngineStopped,
}

impl From<RpcErrorPayload> for RemoteError {
    fn from(payload: RpcErrorPayload) -> Self {
        RemoteError::RpcError {
            code: payload.code,
            message: payload.message,
        }
    }
}

impl From<ConfigError> for RemoteError {
    fn from(e: ConfigError) -> Self {
        RemoteError::InvalidArgument(e.to_string())
    }
}

impl From<CodecError> for RemoteError {
    fn from(e: CodecError) -> Self {
        RemoteError::ProtocolError(e.to_string())
    }
}
