//! Immutable point-in-time view handed to the presentation layer.
//!
//! A [`Snapshot`] is an owned copy.  Holding one never blocks the engine and
//! never observes later mutations; readers ask for a fresh snapshot (or wait
//! for a change notification) to see newer state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::player::{ItemTime, PlayerState};
use super::playlist::{PlaylistItem, PlaylistState};

/// Lifecycle of the transport connection as seen by readers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

/// Point-in-time copy of connection, player and playlist state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub connection: ConnectionState,
    pub player: PlayerState,
    pub playlist: PlaylistState,
}

impl Snapshot {
    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    pub fn is_player_on(&self) -> bool {
        self.player.is_player_on
    }

    pub fn is_playing(&self) -> bool {
        self.player.is_playing
    }

    pub fn speed(&self) -> i32 {
        self.player.speed
    }

    pub fn volume(&self) -> u8 {
        self.player.volume
    }

    pub fn is_muted(&self) -> bool {
        self.player.muted
    }

    pub fn elapsed(&self) -> Duration {
        self.player.elapsed
    }

    pub fn total(&self) -> Duration {
        self.player.total
    }

    pub fn elapsed_time(&self) -> ItemTime {
        self.player.elapsed.into()
    }

    pub fn total_time(&self) -> ItemTime {
        self.player.total.into()
    }

    /// Elapsed position in percent of the total duration.
    pub fn elapsed_percentage(&self) -> f64 {
        self.player.percentage()
    }

    pub fn playlist_items(&self) -> &[PlaylistItem] {
        self.playlist.items()
    }

    pub fn playlist_titles(&self) -> Vec<&str> {
        self.playlist.items().iter().map(|i| i.title.as_str()).collect()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.playlist.current_index()
    }

    pub fn current_item_title(&self) -> Option<&str> {
        self.playlist.current_item().map(|i| i.title.as_str())
    }

    /// True when the playlist holds more than one item.
    pub fn is_playlist_on(&self) -> bool {
        self.playlist.len() > 1
    }

    pub fn switching_in_progress(&self) -> bool {
        self.playlist.switching_in_progress()
    }

    /// Index of the outstanding jump, if one is awaiting confirmation.
    pub fn switch_target(&self) -> Option<usize> {
        self.playlist.guard().target()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot_is_disconnected_and_empty() {
        let snap = Snapshot::default();
        assert!(!snap.is_connected());
        assert!(!snap.is_player_on());
        assert!(snap.playlist_titles().is_empty());
        assert_eq!(snap.current_index(), None);
        assert!(!snap.is_playlist_on());
    }

    #[test]
    fn test_time_accessors_split_durations() {
        let snap = Snapshot {
            player: PlayerState {
                elapsed: Duration::from_secs(75),
                total: Duration::from_secs(3600 + 300),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(snap.elapsed_time(), ItemTime { hours: 0, minutes: 1, seconds: 15 });
        assert_eq!(snap.total_time(), ItemTime { hours: 1, minutes: 5, seconds: 0 });
    }
}
