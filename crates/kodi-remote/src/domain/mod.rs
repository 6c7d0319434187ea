//! Domain layer: engine configuration.
//!
//! The player / playlist model itself lives in `kodi-remote-core` and is
//! re-exported here so callers need a single import path.

pub mod config;

pub use config::{ConfigError, RemoteConfig};
pub use kodi_remote_core::domain::{
    ConnectionState, ItemTime, PlayerState, PlaylistItem, PlaylistState, Snapshot,
};
