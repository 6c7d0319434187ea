//! Application layer: the connection and state-synchronization engine.
//!
//! # Sub-modules
//!
//! - **`engine`**     – The actor task that owns the connection, the pending
//!   calls and the state model.  Everything else talks to it through
//!   channels.
//! - **`commands`**   – [`RemoteHandle`], the public command façade, and the
//!   [`PendingReply`] future every command returns.
//! - **`correlator`** – Request-id allocation and response matching with
//!   per-call deadlines.
//! - **`router`**     – Frame classification and notification → model
//!   update translation.
//! - **`transport`**  – The [`Connector`] port implemented by the
//!   infrastructure layer.
//! - **`reconnect`**  – Optional supervisor that reconnects with backoff.
//! - **`error`**      – [`RemoteError`].
//!
//! This layer depends on `domain` and `kodi-remote-core` only.  Concrete
//! sockets are injected through [`Connector`].

pub mod commands;
pub mod correlator;
pub mod engine;
pub mod error;
pub mod reconnect;
pub mod router;
pub mod transport;

pub use commands::{InputAction, PendingReply, PlayMode, RemoteHandle};
pub use engine::start;
pub use error::RemoteError;
pub use reconnect::{supervise, ReconnectPolicy};
pub use transport::{CloseReason, Connector, TransportError, TransportEvent, TransportLink};
