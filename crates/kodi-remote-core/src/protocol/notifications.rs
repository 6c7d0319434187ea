//! Typed interpretation of the server-pushed notifications the remote cares about.
//!
//! Kodi wraps every event payload as `params.data`.  Only the fields the state
//! model consumes are extracted; everything else in the payload is ignored so
//! newer servers adding members do not break parsing.
//!
//! Unknown method names are not errors: they become [`Notification::Other`]
//! and are dropped by the router.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::codec::CodecError;
use super::messages::{KodiTime, RawNotification};

/// A notification relevant to the player / playlist mirror.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// `Player.OnPlay`, `Player.OnAVStart`, `Player.OnResume`.
    PlayerStarted { player_id: Option<i64>, speed: i32 },
    /// `Player.OnPause`.
    PlayerPaused { player_id: Option<i64> },
    /// `Player.OnSpeedChanged`.
    SpeedChanged { speed: i32 },
    /// `Player.OnSeek`; each member is present when the server includes it.
    Seeked { elapsed: Option<Duration>, speed: Option<i32> },
    /// `Player.OnPropertyChanged` (repeat, shuffle, ...): only triggers a refresh.
    PropertiesChanged,
    /// `Player.OnStop`; `ended` is true when playback reached the end of the item.
    PlayerStopped { ended: bool },
    /// `Playlist.OnAdd`, `Playlist.OnRemove`, `Playlist.OnClear`.
    PlaylistChanged { playlist_id: Option<i64> },
    /// `Application.OnVolumeChanged`.
    VolumeChanged { volume: u8, muted: bool },
    /// `System.OnQuit`, `System.OnRestart`: the server is going away.
    ServerQuitting,
    /// Any other method name.
    Other(String),
}

#[derive(Debug, Default, Deserialize)]
struct PlayerRef {
    #[serde(default)]
    playerid: Option<i64>,
    #[serde(default)]
    speed: Option<f64>,
    #[serde(default)]
    time: Option<KodiTime>,
}

#[derive(Debug, Default, Deserialize)]
struct PlayerData {
    #[serde(default)]
    player: PlayerRef,
}

#[derive(Debug, Default, Deserialize)]
struct StopData {
    #[serde(default)]
    end: bool,
}

#[derive(Debug, Default, Deserialize)]
struct PlaylistData {
    #[serde(default)]
    playlistid: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct VolumeData {
    volume: f64,
    #[serde(default)]
    muted: bool,
}

impl Notification {
    /// Interprets a raw notification.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidPayload`] when a known event carries a
    /// payload that does not match its documented shape.
    pub fn from_raw(raw: &RawNotification) -> Result<Self, CodecError> {
        let method = raw.method.as_str();
        let notification = match method {
            "Player.OnPlay" | "Player.OnAVStart" | "Player.OnResume" => {
                let data: PlayerData = parse_data(raw)?;
                Notification::PlayerStarted {
                    player_id: data.player.playerid,
                    // A start without an explicit speed means normal playback.
                    speed: data.player.speed.map(speed_from_wire).unwrap_or(1),
                }
            }
            "Player.OnPause" => {
                let data: PlayerData = parse_data(raw)?;
                Notification::PlayerPaused { player_id: data.player.playerid }
            }
            "Player.OnSpeedChanged" => {
                let data: PlayerData = parse_data(raw)?;
                let speed = data.player.speed.ok_or_else(|| invalid(raw, "missing player.speed"))?;
                Notification::SpeedChanged { speed: speed_from_wire(speed) }
            }
            "Player.OnSeek" => {
                let data: PlayerData = parse_data(raw)?;
                let elapsed = match data.player.time {
                    Some(time) => Some(
                        time.to_duration().ok_or_else(|| invalid(raw, "player.time out of range"))?,
                    ),
                    None => None,
                };
                Notification::Seeked { elapsed, speed: data.player.speed.map(speed_from_wire) }
            }
            "Player.OnPropertyChanged" => Notification::PropertiesChanged,
            "Player.OnStop" => {
                let data: StopData = parse_data(raw)?;
                Notification::PlayerStopped { ended: data.end }
            }
            "Playlist.OnAdd" | "Playlist.OnRemove" | "Playlist.OnClear" => {
                let data: PlaylistData = parse_data(raw)?;
                Notification::PlaylistChanged { playlist_id: data.playlistid }
            }
            "Application.OnVolumeChanged" => {
                let data: VolumeData = parse_required_data(raw)?;
                Notification::VolumeChanged {
                    volume: data.volume.round().clamp(0.0, 100.0) as u8,
                    muted: data.muted,
                }
            }
            "System.OnQuit" | "System.OnRestart" => Notification::ServerQuitting,
            other => Notification::Other(other.to_string()),
        };
        Ok(notification)
    }
}

/// Kodi reports speed as an integer but the schema types it as a number.
fn speed_from_wire(speed: f64) -> i32 {
    speed.round().clamp(-32.0, 32.0) as i32
}

fn invalid(raw: &RawNotification, reason: impl Into<String>) -> CodecError {
    CodecError::InvalidPayload {
        method: raw.method.clone(),
        reason: reason.into(),
    }
}

/// Parses `params.data`, treating an absent payload as all-default.
fn parse_data<T>(raw: &RawNotification) -> Result<T, CodecError>
where
    T: for<'de> Deserialize<'de> + Default,
{
    match raw.data() {
        None | Some(Value::Null) => Ok(T::default()),
        Some(data) => {
            serde_json::from_value(data.clone()).map_err(|e| invalid(raw, e.to_string()))
        }
    }
}

/// Parses `params.data` for events whose payload is mandatory.
fn parse_required_data<T>(raw: &RawNotification) -> Result<T, CodecError>
where
    T: for<'de> Deserialize<'de>,
{
    let data = raw.data().ok_or_else(|| invalid(raw, "missing params.data"))?;
    serde_json::from_value(data.clone()).map_err(|e| invalid(raw, e.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
