//! WebSocket connector for Kodi's JSON-RPC endpoint.
//!
//! One connection is driven by a single I/O task that `select!`s between the
//! socket and the outbound queue:
//!
//! ```text
//! engine ──outbound (mpsc)──▶ ┌──────────┐ ──Text──▶ Kodi
//!                             │ I/O task │
//! engine ◀──inbound (mpsc)─── └──────────┘ ◀─Text─── Kodi
//! ```
//!
//! Only text frames are forwarded.  Pings are answered by tungstenite itself;
//! binary and pong frames are ignored.  When the loop ends for any reason the
//! task emits one `Closed` event and exits.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request as HandshakeRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, AUTHORIZATION};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::auth::basic_auth_value;
use crate::application::transport::{
    CloseReason, Connector, TransportError, TransportEvent, TransportLink,
};
use crate::domain::RemoteConfig;

/// Inbound events buffered between the I/O task and the engine.
const DEFAULT_INBOUND_CAPACITY: usize = 256;

/// Opens `ws://host:port/jsonrpc` connections with tokio-tungstenite.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    inbound_capacity: usize,
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self { inbound_capacity: DEFAULT_INBOUND_CAPACITY }
    }
}

impl WebSocketConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, config: &RemoteConfig) -> Result<TransportLink, TransportError> {
        let endpoint = config.endpoint_url();
        let request = handshake_request(config)?;

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| TransportError::Handshake {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;
        info!("connected to {endpoint}");

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::channel(self.inbound_capacity);
        tokio::spawn(run_link(ws_stream, outbound_rx, inbound_tx, endpoint));

        Ok(TransportLink { outbound: outbound_tx, inbound: inbound_rx })
    }
}

/// Builds the client handshake, adding Basic credentials when configured.
fn handshake_request(config: &RemoteConfig) -> Result<HandshakeRequest, TransportError> {
    let endpoint = config.endpoint_url();
    let invalid = |reason: String| TransportError::InvalidEndpoint {
        endpoint: endpoint.clone(),
        reason,
    };

    let mut request = endpoint
        .as_str()
        .into_client_request()
        .map_err(|e| invalid(e.to_string()))?;

    if config.has_credentials() {
        let value = HeaderValue::from_str(&basic_auth_value(&config.username, &config.password))
            .map_err(|e| invalid(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }
    Ok(request)
}

/// Drives one connection until either side closes it.
async fn run_link(
    ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    inbound: mpsc::Sender<TransportEvent>,
    endpoint: String,
) {
    let (mut sink, mut stream) = ws_stream.split();

    let reason = loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(text) => {
                    debug!("→ {text}");
                    if let Err(e) = sink.send(WsMessage::Text(text)).await {
                        break CloseReason::Error(e.to_string());
                    }
                }
                None => {
                    // Engine dropped the link.
                    let _ = sink.send(WsMessage::Close(None)).await;
                    break CloseReason::Local;
                }
            },
            msg = stream.next() => match msg {
                Some(Ok(WsMessage::Text(text))) => {
                    debug!("← {text}");
                    if inbound.send(TransportEvent::Received(text)).await.is_err() {
                        let _ = sink.send(WsMessage::Close(None)).await;
                        break CloseReason::Local;
                    }
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    break CloseReason::Remote(frame.map(|f| f.reason.to_string()));
                }
                Some(Ok(WsMessage::Binary(_) | WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_))) => {}
                Some(Err(e)) => break CloseReason::Error(e.to_string()),
                None => break CloseReason::Remote(None),
            },
        }
    };

    match &reason {
        CloseReason::Error(e) => warn!("connection to {endpoint} failed: {e}"),
        other => info!("connection to {endpoint} {other}"),
    }
    let _ = inbound.send(TransportEvent::Closed(reason)).await;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
