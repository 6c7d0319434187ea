//! JSON-RPC envelope types exchanged with the Kodi server.
//!
//! # Frame shapes
//!
//! ```text
//! request       {"jsonrpc":"2.0","method":"Input.Left","id":7}
//! response      {"id":7,"jsonrpc":"2.0","result":"OK"}
//! error         {"id":7,"jsonrpc":"2.0","error":{"code":-32601,"message":"Method not found."}}
//! notification  {"jsonrpc":"2.0","method":"Player.OnPause","params":{"data":{...},"sender":"xbmc"}}
//! ```
//!
//! Kodi parses requests strictly: the `jsonrpc` member must be exactly
//! `"2.0"` and `params`, when present, must be an object.  Requests without
//! parameters therefore omit the member entirely instead of sending `null`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The only protocol version Kodi accepts.
pub const JSONRPC_VERSION: &str = "2.0";

/// Correlation identifier of a request.
pub type RequestId = u64;

// ── Outbound ──────────────────────────────────────────────────────────────────

/// A single JSON-RPC request envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub jsonrpc: &'static str,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    pub id: RequestId,
}

impl Request {
    /// Builds a request envelope for `method`.
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
            id,
        }
    }
}

// ── Inbound ───────────────────────────────────────────────────────────────────

/// The `error` member of a failed response, kept exactly as the server sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorPayload {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A response correlated to one of our requests.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: RequestId,
    /// `Ok(result)` or the server-provided error payload.
    pub outcome: Result<Value, RpcErrorPayload>,
}

/// A server-pushed notification before it is interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct RawNotification {
    /// Dotted method name, e.g. `Player.OnPlay`.
    pub method: String,
    /// The `params` object (`Value::Null` when absent).
    pub params: Value,
}

impl RawNotification {
    /// Returns the `params.data` member, where Kodi puts the event payload.
    pub fn data(&self) -> Option<&Value> {
        self.params.get("data")
    }
}

/// Classification of one inbound text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    Response(Response),
    Notification(RawNotification),
}

// ── Kodi time ─────────────────────────────────────────────────────────────────

/// Kodi's `Global.Time` structure used by `Player.GetProperties` and
/// `Player.OnSeek`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KodiTime {
    #[serde(default)]
    pub hours: u64,
    #[serde(default)]
    pub minutes: u64,
    #[serde(default)]
    pub seconds: u64,
    #[serde(default)]
    pub milliseconds: u64,
}

impl KodiTime {
    /// Total length of the time, or `None` when the fields overflow a
    /// millisecond count.
    pub fn to_duration(self) -> Option<Duration> {
        let ms = self
            .hours
            .checked_mul(60)?
            .checked_add(self.minutes)?
            .checked_mul(60)?
            .checked_add(self.seconds)?
            .checked_mul(1000)?
            .checked_add(self.milliseconds)?;
        Some(Duration::from_millis(ms))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
