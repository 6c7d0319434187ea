//! Request/response correlation for JSON-RPC calls.
//!
//! The correlator allocates ids, keeps one [`PendingCall`] per outstanding
//! request and hands each call back exactly once: when its response arrives,
//! when its deadline passes, or when the connection goes away.  Whatever is
//! handed back has left the pending set, so nothing can complete it twice.
//!
//! The correlator performs no I/O and owns no timers.  The engine asks for
//! [`Correlator::next_deadline`], sleeps until then and calls
//! [`Correlator::expire`].
//!
//! Each call carries an opaque `purpose` chosen by the caller (a reply
//! channel, a follow-up action, ...); the correlator never looks inside it.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use kodi_remote_core::protocol::{encode_request, Request, RequestId, RequestIdCounter, Response};
use kodi_remote_core::CodecError;

use super::error::RemoteError;

/// One outstanding request.
#[derive(Debug)]
pub struct PendingCall<P> {
    pub id: RequestId,
    pub method: String,
    pub params: Option<Value>,
    pub created_at: Instant,
    pub deadline: Instant,
    pub purpose: P,
}

/// A call that left the pending set together with its outcome.
#[derive(Debug)]
pub struct Completed<P> {
    pub call: PendingCall<P>,
    pub outcome: Result<Value, RemoteError>,
}

/// Pending-call registry keyed by request id.
#[derive(Debug)]
pub struct Correlator<P> {
    ids: RequestIdCounter,
    pending: HashMap<RequestId, PendingCall<P>>,
}

impl<P> Default for Correlator<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Correlator<P> {
    pub fn new() -> Self {
        Self {
            ids: RequestIdCounter::new(),
            pending: HashMap::new(),
        }
    }

    /// Registers a call and returns its id with the encoded request frame.
    ///
    /// The call is pending as soon as this returns; if the frame then cannot
    /// be sent the caller must [`fail`](Self::fail) it.
    ///
    /// # Errors
    ///
    /// Returns the codec error, and hands the purpose back, if the request
    /// cannot be serialized.  Nothing is registered in that case.
    pub fn begin(
        &mut self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
        now: Instant,
        purpose: P,
    ) -> Result<(RequestId, String), (CodecError, P)> {
        let id = self.ids.next();
        let frame = match encode_request(&Request::new(id, method, params.clone())) {
            Ok(frame) => frame,
            Err(e) => return Err((e, purpose)),
        };
        self.pending.insert(
            id,
            PendingCall {
                id,
                method: method.to_string(),
                params,
                created_at: now,
                deadline: now + timeout,
                purpose,
            },
        );
        debug!(id, method, "call registered");
        Ok((id, frame))
    }

    /// Matches a response to its pending call.
    ///
    /// Returns `None` for ids that are unknown, already resolved or expired;
    /// such responses are dropped.
    pub fn resolve(&mut self, response: Response) -> Option<Completed<P>> {
        let Some(call) = self.pending.remove(&response.id) else {
            debug!(id = response.id, "dropping response with no pending call");
            return None;
        };
        let outcome = response.outcome.map_err(RemoteError::from);
        Some(Completed { call, outcome })
    }

    /// Removes and returns every call whose deadline is at or before `now`,
    /// each failed with `RpcTimeout`.
    pub fn expire(&mut self, now: Instant) -> Vec<Completed<P>> {
        let expired: Vec<RequestId> = self
            .pending
            .values()
            .filter(|call| call.deadline <= now)
            .map(|call| call.id)
            .collect();

        let mut done: Vec<Completed<P>> = expired
            .into_iter()
            .filter_map(|id| self.pending.remove(&id))
            .map(|call| {
                warn!(
                    id = call.id,
                    method = %call.method,
                    waited_ms = now.saturating_duration_since(call.created_at).as_millis() as u64,
                    "call timed out"
                );
                let outcome = Err(RemoteError::RpcTimeout { method: call.method.clone() });
                Completed { call, outcome }
            })
            .collect();
        done.sort_by_key(|c| c.call.id);
        done
    }

    /// Fails one call, e.g. because its frame could not be sent.
    pub fn fail(&mut self, id: RequestId, error: RemoteError) -> Option<Completed<P>> {
        self.pending.remove(&id).map(|call| Completed { call, outcome: Err(error) })
    }

    /// Fails every pending call with `error`, in id order.
    pub fn fail_all(&mut self, error: RemoteError) -> Vec<Completed<P>> {
        let mut done: Vec<Completed<P>> = self
            .pending
            .drain()
            .map(|(_, call)| Completed { call, outcome: Err(error.clone()) })
            .collect();
        done.sort_by_key(|c| c.call.id);
        done
    }

    /// Earliest deadline among pending calls.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|call| call.deadline).min()
    }

    pub fn is_pending(&self, id: RequestId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use kodi_remote_core::RpcErrorPayload;
    use serde_json::json;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn ok(id: RequestId, result: Value) -> Response {
        Response { id, outcome: Ok(result) }
    }

    #[test]
    fn test_begin_encodes_request_with_fresh_ids() {
        // Arrange
        let mut c: Correlator<&str> = Correlator::new();
        let now = Instant::now();

        // Act
        let (a, frame) = c.begin("Input.Up", None, TIMEOUT, now, "a").unwrap();
        let (b, _) = c.begin("Input.Down", None, TIMEOUT, now, "b").unwrap();

        // Assert
        assert_ne!(a, b);
        let sent: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(sent, json!({"jsonrpc": "2.0", "method": "Input.Up", "id": a}));
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn test_response_resolves_call_exactly_once() {
        let mut c: Correlator<u8> = Correlator::new();
        let (id, _) = c.begin("Input.Select", None, TIMEOUT, Instant::now(), 7).unwrap();

        let first = c.resolve(ok(id, json!("OK"))).expect("pending call resolves");
        assert_eq!(first.call.purpose, 7);
        assert_eq!(first.outcome, Ok(json!("OK")));

        assert!(c.resolve(ok(id, json!("OK"))).is_none(), "duplicate response is dropped");
        assert!(c.is_empty());
    }

    #[test]
    fn test_error_response_maps_to_rpc_error() {
        let mut c: Correlator<()> = Correlator::new();
        let (id, _) = c.begin("Player.Stop", None, TIMEOUT, Instant::now(), ()).unwrap();

        let done = c
            .resolve(Response {
                id,
                outcome: Err(RpcErrorPayload {
                    code: -32602,
                    message: "Invalid params.".to_string(),
                    data: None,
                }),
            })
            .unwrap();

        assert_eq!(
            done.outcome,
            Err(RemoteError::RpcError { code: -32602, message: "Invalid params.".to_string() })
        );
    }

    #[test]
    fn test_unknown_id_is_dropped() {
        let mut c: Correlator<()> = Correlator::new();
        c.begin("Input.Home", None, TIMEOUT, Instant::now(), ()).unwrap();
        assert!(c.resolve(ok(999, Value::Null)).is_none());
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_expire_only_removes_overdue_calls() {
        // Arrange: one short and one long call
        let mut c: Correlator<()> = Correlator::new();
        let start = Instant::now();
        let (short, _) = c.begin("Input.Up", None, Duration::from_secs(1), start, ()).unwrap();
        let (long, _) = c.begin("Input.Down", None, Duration::from_secs(10), start, ()).unwrap();

        // Act
        let expired = c.expire(start + Duration::from_secs(2));

        // Assert
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].call.id, short);
        assert_eq!(
            expired[0].outcome,
            Err(RemoteError::RpcTimeout { method: "Input.Up".to_string() })
        );
        assert!(c.is_pending(long));
        assert_eq!(c.next_deadline(), Some(start + Duration::from_secs(10)));
    }

    #[test]
    fn test_late_response_after_timeout_is_discarded() {
        let mut c: Correlator<()> = Correlator::new();
        let start = Instant::now();
        let (id, _) = c.begin("Input.Info", None, TIMEOUT, start, ()).unwrap();
        let (other, _) = c.begin("Input.Back", None, TIMEOUT * 2, start, ()).unwrap();

        c.expire(start + TIMEOUT);

        assert!(c.resolve(ok(id, json!("OK"))).is_none());
        assert!(c.is_pending(other), "unrelated calls are untouched");
    }

    #[test]
    fn test_fail_all_drains_in_id_order() {
        let mut c: Correlator<()> = Correlator::new();
        let now = Instant::now();
        let (a, _) = c.begin("Input.Up", None, TIMEOUT, now, ()).unwrap();
        let (b, _) = c.begin("Input.Down", None, TIMEOUT, now, ()).unwrap();

        let failed = c.fail_all(RemoteError::ConnectionLost);

        assert_eq!(failed.iter().map(|f| f.call.id).collect::<Vec<_>>(), vec![a, b]);
        assert!(failed.iter().all(|f| f.outcome == Err(RemoteError::ConnectionLost)));
        assert!(c.is_empty());
        assert_eq!(c.next_deadline(), None);
    }
}
