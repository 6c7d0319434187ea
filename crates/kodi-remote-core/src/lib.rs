//! # kodi-remote-core
//!
//! Shared library for the Kodi remote containing the JSON-RPC wire codec and
//! the pure state model that mirrors the server's player and playlist.
//!
//! This crate has zero dependencies on sockets, async runtimes, or timers.
//! Everything in it can be driven synchronously from a unit test.
//!
//! # Architecture overview
//!
//! Kodi exposes a JSON-RPC 2.0 API over a WebSocket (port 9090 by default).
//! The same socket carries two kinds of inbound traffic:
//!
//! - **Responses** to requests we sent, correlated by the `id` field.
//! - **Notifications** pushed by the server (`Player.OnPlay`,
//!   `Playlist.OnAdd`, ...) which carry no `id`.
//!
//! This crate defines:
//!
//! - **`protocol`** – Request envelopes, inbound frame classification, typed
//!   notifications, Kodi's time format, and the request-id counter.
//!
//! - **`domain`** – The local mirror of the server: `PlayerState`,
//!   `PlaylistState`, the playlist switch guard, and the immutable `Snapshot`
//!   handed to readers.  All mutations funnel through `Model::apply`.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `kodi_remote_core::Model` instead of `kodi_remote_core::domain::model::Model`.
pub use domain::model::{Model, ModelUpdate, PlayerProperties};
pub use domain::player::{ItemTime, PlayerState};
pub use domain::playlist::{PlaylistItem, PlaylistState};
pub use domain::snapshot::{ConnectionState, Snapshot};
pub use domain::switching::{SwitchGuard, SwitchOutcome};
pub use protocol::codec::{decode_frame, encode_request, CodecError};
pub use protocol::messages::{InboundFrame, Request, RequestId, Response, RpcErrorPayload};
pub use protocol::notifications::Notification;
pub use protocol::results::ApplicationProperties;
pub use protocol::sequence::RequestIdCounter;
