//! Monotonic allocator for JSON-RPC request ids.
//!
//! Every request carries an id that the server echoes back in its response.
//! Ids must be unique among the calls that are still pending, so the counter
//! only ever moves forward.  Id `0` is never handed out: some JSON-RPC
//! servers treat a falsy id like a missing one and answer as if the request
//! were a notification.

use std::sync::atomic::{AtomicU64, Ordering};

use super::messages::RequestId;

/// A thread-safe, monotonically increasing request-id counter.
///
/// # Examples
///
/// ```rust
/// use kodi_remote_core::protocol::RequestIdCounter;
///
/// let ids = RequestIdCounter::new();
/// assert_eq!(ids.next(), 1);
/// assert_eq!(ids.next(), 2);
/// ```
#[derive(Debug)]
pub struct RequestIdCounter {
    inner: AtomicU64,
}

impl RequestIdCounter {
    /// Creates a counter whose first id is 1.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Creates a counter whose first id is `first`.
    pub fn starting_at(first: RequestId) -> Self {
        Self {
            inner: AtomicU64::new(first),
        }
    }

    /// Returns the next id and advances the counter.
    ///
    /// On overflow the counter wraps past `u64::MAX` straight to 1.
    pub fn next(&self) -> RequestId {
        loop {
            let id = self.inner.fetch_add(1, Ordering::Relaxed);
            if id != 0 {
                return id;
            }
        }
    }
}

impl Default for RequestIdCounter {
    fn default() -> Self {
        Self::new()
    }
}
