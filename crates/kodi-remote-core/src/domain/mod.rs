//! Domain layer: the local mirror of the Kodi server's playback state.
//!
//! Nothing in here performs I/O or knows about time sources.  Time-based
//! transitions (the playlist switch grace period) are triggered by the caller,
//! which owns the timers.

pub mod model;
pub mod player;
pub mod playlist;
pub mod snapshot;
pub mod switching;

pub use model::{Model, ModelUpdate, PlayerProperties};
pub use player::{ItemTime, PlayerState};
pub use playlist::{PlaylistItem, PlaylistState};
pub use snapshot::{ConnectionState, Snapshot};
pub use switching::{SwitchGuard, SwitchOutcome};
