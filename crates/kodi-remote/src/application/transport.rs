//! Transport port: the seam between the engine and the network.
//!
//! A [`Connector`] opens one connection and returns a [`TransportLink`]: an
//! outbound queue of text frames and an inbound stream of
//! [`TransportEvent`]s.  Every link ends with exactly one
//! [`TransportEvent::Closed`]; nothing is delivered after it.  Dropping the
//! outbound sender closes the connection from our side.
//!
//! Reconnecting is not the transport's business; the engine (or a
//! supervisor on top of it) decides when to open a new link.  The WebSocket
//! implementation lives in `infrastructure::transport`.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::RemoteConfig;

/// Why a link ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// We closed it (outbound queue dropped).
    Local,
    /// The server closed it, with its close-frame reason if any.
    Remote(Option<String>),
    /// A socket or protocol error ended it.
    Error(String),
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::Local => f.write_str("closed locally"),
            CloseReason::Remote(Some(reason)) => write!(f, "closed by server: {reason}"),
            CloseReason::Remote(None) => f.write_str("closed by server"),
            CloseReason::Error(e) => write!(f, "transport error: {e}"),
        }
    }
}

/// Events delivered by a live link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One inbound text frame.
    Received(String),
    /// The link is gone.  Always the last event.
    Closed(CloseReason),
}

/// The two halves of an open connection.
#[derive(Debug)]
pub struct TransportLink {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::Receiver<TransportEvent>,
}

/// Errors while opening a connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The endpoint URL or the handshake request could not be built.
    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// DNS, TCP or WebSocket handshake failure.
    #[error("handshake with {endpoint} failed: {reason}")]
    Handshake { endpoint: String, reason: String },
}

/// Opens connections to a Kodi server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, config: &RemoteConfig) -> Result<TransportLink, TransportError>;
}
