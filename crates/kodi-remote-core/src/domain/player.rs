//! Player state: on/off, play/pause, speed, time cursor and volume.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Slowest rewind speed Kodi supports.
pub const MIN_SPEED: i32 = -32;
/// Fastest forward speed Kodi supports.
pub const MAX_SPEED: i32 = 32;
/// Maximum application volume.
pub const MAX_VOLUME: u8 = 100;

/// Speeds accepted by `Player.SetSpeed`.
pub const SPEED_STEPS: [i32; 13] = [-32, -16, -8, -4, -2, -1, 0, 1, 2, 4, 8, 16, 32];

/// Returns true when `speed` is one of the steps Kodi accepts.
pub fn is_supported_speed(speed: i32) -> bool {
    SPEED_STEPS.contains(&speed)
}

/// Kodi's video player; used until the server reports an active player.
pub const DEFAULT_PLAYER_ID: i64 = 1;

/// Hours / minutes / seconds breakdown of a playback position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTime {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl From<Duration> for ItemTime {
    fn from(d: Duration) -> Self {
        let secs = d.as_secs();
        Self {
            hours: secs / 3600,
            minutes: (secs / 60) % 60,
            seconds: secs % 60,
        }
    }
}

impl std::fmt::Display for ItemTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.hours > 0 {
            write!(f, "{}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
        } else {
            write!(f, "{:02}:{:02}", self.minutes, self.seconds)
        }
    }
}

/// Current playback status.
///
/// `is_playing` and `speed` are independent: `speed` is the play / fast-forward
/// / rewind rate, `is_playing` says whether the time cursor is advancing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// True while a player is active on the server (something is loaded).
    pub is_player_on: bool,
    pub is_playing: bool,
    /// Rate in `[MIN_SPEED, MAX_SPEED]`.
    pub speed: i32,
    pub elapsed: Duration,
    pub total: Duration,
    /// Volume in `[0, MAX_VOLUME]`.
    pub volume: u8,
    pub muted: bool,
    /// Kodi player id commands are addressed to.
    pub player_id: i64,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            is_player_on: false,
            is_playing: false,
            speed: 0,
            elapsed: Duration::ZERO,
            total: Duration::ZERO,
            volume: 0,
            muted: false,
            player_id: DEFAULT_PLAYER_ID,
        }
    }
}

impl PlayerState {
    /// Elapsed position as a percentage of the total, 0 when the total is unknown.
    pub fn percentage(&self) -> f64 {
        if self.total.is_zero() {
            return 0.0;
        }
        (self.elapsed.as_secs_f64() / self.total.as_secs_f64() * 100.0).clamp(0.0, 100.0)
    }

    /// Resets the time cursor and rate, as after a stop.
    pub(crate) fn reset_playback(&mut self) {
        self.is_player_on = false;
        self.is_playing = false;
        self.speed = 0;
        self.elapsed = Duration::ZERO;
        self.total = Duration::ZERO;
    }

    /// Re-establishes `elapsed <= total` whenever the total is known.
    pub(crate) fn enforce_time_invariant(&mut self) {
        if !self.total.is_zero() && self.elapsed > self.total {
            self.elapsed = self.total;
        }
    }
}
