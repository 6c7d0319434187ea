//! Shared fixtures: an in-memory Kodi server behind the `Connector` trait.
//!
//! ```text
//! engine ──frames──▶ FakeKodi::next_request()
//! engine ◀─events─── FakeKodi::respond() / notify() / close()
//! ```

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use kodi_remote::application::{
    self, CloseReason, Connector, RemoteHandle, TransportError, TransportEvent, TransportLink,
};
use kodi_remote::domain::{RemoteConfig, Snapshot};

/// Upper bound on how long a test waits for the engine to react.
pub const WAIT: Duration = Duration::from_secs(5);

/// Hands each accepted connection to the test as a [`FakeKodi`].
pub struct FakeConnector {
    sessions: mpsc::UnboundedSender<FakeKodi>,
    refusals: AtomicUsize,
    attempts: AtomicUsize,
}

impl FakeConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<FakeKodi>) {
        let (sessions, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            sessions,
            refusals: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
        });
        (connector, rx)
    }

    /// Makes the next `n` connection attempts fail.
    pub fn refuse_next(&self, n: usize) {
        self.refusals.store(n, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, config: &RemoteConfig) -> Result<TransportLink, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .refusals
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(TransportError::Handshake {
                endpoint: config.endpoint_url(),
                reason: "connection refused".to_string(),
            });
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::channel(64);
        let _ = self.sessions.send(FakeKodi { requests: outbound_rx, events: inbound_tx });
        Ok(TransportLink { outbound: outbound_tx, inbound: inbound_rx })
    }
}

/// One decoded request as the server saw it.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub id: u64,
    pub method: String,
    pub params: Value,
}

/// The server side of one fake connection.
pub struct FakeKodi {
    requests: mpsc::UnboundedReceiver<String>,
    events: mpsc::Sender<TransportEvent>,
}

impl FakeKodi {
    /// Next frame the engine sent, decoded.
    pub async fn next_request(&mut self) -> SeenRequest {
        let text = self.requests.recv().await.expect("engine closed the link");
        let frame: Value = serde_json::from_str(&text).expect("request is JSON");
        assert_eq!(frame["jsonrpc"], "2.0");
        SeenRequest {
            id: frame["id"].as_u64().expect("request has a numeric id"),
            method: frame["method"].as_str().expect("request has a method").to_string(),
            params: frame.get("params").cloned().unwrap_or(Value::Null),
        }
    }

    /// Next request, asserting its method.
    pub async fn expect(&mut self, method: &str) -> SeenRequest {
        let request = self.next_request().await;
        assert_eq!(request.method, method, "unexpected request {request:?}");
        request
    }

    /// True when no request is waiting to be read.
    pub fn is_idle(&mut self) -> bool {
        self.requests.try_recv().is_err()
    }

    pub async fn respond(&self, id: u64, result: Value) {
        self.send_text(json!({"id": id, "jsonrpc": "2.0", "result": result})).await;
    }

    pub async fn respond_error(&self, id: u64, code: i64, message: &str) {
        self.send_text(json!({
            "id": id,
            "jsonrpc": "2.0",
            "error": {"code": code, "message": message}
        }))
        .await;
    }

    pub async fn notify(&self, method: &str, data: Value) {
        self.send_text(json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": {"data": data, "sender": "xbmc"}
        }))
        .await;
    }

    pub async fn send_raw(&self, text: &str) {
        let _ = self.events.send(TransportEvent::Received(text.to_string())).await;
    }

    pub async fn close(&self) {
        let _ = self.events.send(TransportEvent::Closed(CloseReason::Remote(None))).await;
    }

    async fn send_text(&self, frame: Value) {
        self.send_raw(&frame.to_string()).await;
    }

    /// Answers the engine's connect-time queries.
    ///
    /// `playlist` is `None` for "nothing playing"; otherwise the titles of the
    /// active player's playlist and the now-playing position.
    pub async fn answer_initial_sync(&mut self, playlist: Option<(&[&str], usize)>, volume: u8) {
        let active = self.expect("Player.GetActivePlayers").await;
        let app = self.expect("Application.GetProperties").await;

        match playlist {
            None => {
                self.respond(active.id, json!([])).await;
                self.respond(app.id, json!({"volume": volume, "muted": false})).await;
            }
            Some((titles, position)) => {
                self.respond(active.id, json!([{"playerid": 1, "type": "video"}])).await;
                self.respond(app.id, json!({"volume": volume, "muted": false})).await;

                let props = self.expect("Player.GetProperties").await;
                self.respond(props.id, player_properties(1, position)).await;
                let items = self.expect("Playlist.GetItems").await;
                self.respond(items.id, playlist_items(titles)).await;
            }
        }
    }
}

pub fn player_properties(speed: i32, position: usize) -> Value {
    json!({
        "speed": speed,
        "time": {"hours": 0, "minutes": 1, "seconds": 30, "milliseconds": 0},
        "totaltime": {"hours": 0, "minutes": 45, "seconds": 0, "milliseconds": 0},
        "position": position,
        "percentage": 3.3
    })
}

pub fn playlist_items(titles: &[&str]) -> Value {
    let items: Vec<Value> = titles
        .iter()
        .enumerate()
        .map(|(i, title)| json!({"label": title, "title": title, "file": format!("/media/{i}.mkv")}))
        .collect();
    json!({"items": items, "limits": {"start": 0, "end": titles.len(), "total": titles.len()}})
}

/// Test settings: loopback host, polling off.
pub fn test_config() -> RemoteConfig {
    RemoteConfig {
        poll_interval: Duration::ZERO,
        ..RemoteConfig::for_host("127.0.0.1", 9090)
    }
}

/// Starts an engine and connects it, returning both ends.
pub async fn connected(
    config: RemoteConfig,
) -> (RemoteHandle, FakeKodi, Arc<FakeConnector>, mpsc::UnboundedReceiver<FakeKodi>) {
    let (connector, mut sessions) = FakeConnector::new();
    let handle = application::start(config, connector.clone());
    handle.connect().await.expect("connect");
    let kodi = sessions.recv().await.expect("a session was opened");
    (handle, kodi, connector, sessions)
}

/// Waits until a snapshot satisfies `pred`, panicking after [`WAIT`].
pub async fn wait_for(handle: &RemoteHandle, pred: impl FnMut(&Snapshot) -> bool) -> Snapshot {
    let mut rx = handle.subscribe();
    let snapshot = tokio::time::timeout(WAIT, rx.wait_for(pred))
        .await
        .expect("snapshot condition not reached in time")
        .expect("engine stopped");
    snapshot.clone()
}

/// Round-trips one `Input.Home` call.
///
/// Frames are handled in order, so once this returns every frame the server
/// sent earlier has been applied, and the engine sent nothing in between.
pub async fn barrier(handle: &RemoteHandle, kodi: &mut FakeKodi) {
    let reply = handle.home();
    let request = kodi.expect("Input.Home").await;
    kodi.respond(request.id, json!("OK")).await;
    reply.await.expect("barrier call");
}
