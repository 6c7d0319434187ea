//! Encoding of request envelopes and classification of inbound frames.
//!
//! # Classification rules
//!
//! An inbound frame is a **response** when it carries a non-null `id`
//! together with a `result` or `error` member.  It is a **notification** when
//! it has no `id` (or `id: null`) and names a `method`.  Anything else is a
//! malformed frame and yields a [`CodecError`]; callers log it and drop the
//! frame without tearing the connection down.
//!
//! Whether a response id actually belongs to a pending call is not decided
//! here.  That is the correlator's job.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::messages::{InboundFrame, RawNotification, Request, Response, RpcErrorPayload};

/// Errors produced while encoding or decoding JSON-RPC frames.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The text is not valid JSON, or a value could not be serialized.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame parsed but its `id` is not an unsigned integer.
    ///
    /// We only ever send numeric ids, so a string id cannot be ours.
    #[error("unsupported response id: {0}")]
    InvalidId(Value),

    /// The frame has neither a usable `id` nor a `method`.
    #[error("frame is neither a response nor a notification")]
    Unclassifiable,

    /// A known notification carried a payload of the wrong shape.
    #[error("malformed {method} payload: {reason}")]
    InvalidPayload { method: String, reason: String },
}

/// The permissive superset of every frame shape Kodi sends.
#[derive(Debug, Deserialize)]
struct WireFrame {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorPayload>,
}

/// Serializes a request envelope to the text sent over the WebSocket.
///
/// # Errors
///
/// Returns [`CodecError::Json`] if the parameters cannot be serialized.
pub fn encode_request(request: &Request) -> Result<String, CodecError> {
    Ok(serde_json::to_string(request)?)
}

/// Parses and classifies one inbound text frame.
///
/// # Errors
///
/// - [`CodecError::Json`] for text that is not a JSON object of the expected shape.
/// - [`CodecError::InvalidId`] for a response whose id is not a `u64`.
/// - [`CodecError::Unclassifiable`] for frames with neither `id` nor `method`.
pub fn decode_frame(text: &str) -> Result<InboundFrame, CodecError> {
    let frame: WireFrame = serde_json::from_str(text)?;

    match frame.id {
        Some(Value::Null) | None => {}
        Some(id) => {
            let id = id.as_u64().ok_or(CodecError::InvalidId(id))?;
            // Kodi always sends one of the two members; a bare id with
            // neither is treated as an empty successful result.
            let outcome = match frame.error {
                Some(error) => Err(error),
                None => Ok(frame.result.unwrap_or(Value::Null)),
            };
            return Ok(InboundFrame::Response(Response { id, outcome }));
        }
    }

    match frame.method {
        Some(method) => Ok(InboundFrame::Notification(RawNotification {
            method,
            params: frame.params.unwrap_or(Value::Null),
        })),
        None => Err(CodecError::Unclassifiable),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
