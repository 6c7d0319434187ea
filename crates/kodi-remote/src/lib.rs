//! kodi-remote library crate.
//!
//! A connection and state-synchronization engine for Kodi's JSON-RPC
//! WebSocket API.  Callers issue typed commands through a
//! [`RemoteHandle`](application::RemoteHandle) and read the player and
//! playlist state through snapshots.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! CLI / UI
//!     ↕  RemoteHandle (commands) + watch::Receiver<Snapshot>
//! [kodi-remote]
//!   ├── domain/           RemoteConfig, re-exported state types
//!   ├── application/      Engine actor, correlator, notification router
//!   └── infrastructure/
//!         ├── transport/  WebSocket connector (tokio-tungstenite)
//!         └── storage/    TOML config file
//!     ↕  JSON-RPC 2.0 over WebSocket
//! Kodi
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `kodi-remote-core` only; sockets
//!   are injected through the `Connector` trait.
//! - `infrastructure` depends on all other layers plus `tokio-tungstenite`.

/// Domain layer: configuration and state types.
pub mod domain;

/// Application layer: the engine and its command façade.
pub mod application;

/// Infrastructure layer: WebSocket transport and config persistence.
pub mod infrastructure;
