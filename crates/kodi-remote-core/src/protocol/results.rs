//! Decoding of the `result` members returned by the queries the engine issues.
//!
//! Only the members requested by the engine are read.  Missing optional
//! members fall back to "unknown" rather than failing the whole result.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::codec::CodecError;
use super::messages::KodiTime;
use crate::domain::model::PlayerProperties;
use crate::domain::playlist::PlaylistItem;

/// Property names requested through `Player.GetProperties`.
pub const PLAYER_PROPERTY_NAMES: [&str; 5] = ["speed", "time", "totaltime", "position", "percentage"];

/// Property names requested through `Application.GetProperties`.
pub const APPLICATION_PROPERTY_NAMES: [&str; 2] = ["volume", "muted"];

/// Item fields requested through `Playlist.GetItems`.
pub const PLAYLIST_ITEM_FIELDS: [&str; 2] = ["title", "file"];

#[derive(Debug, Deserialize)]
struct ActivePlayer {
    playerid: i64,
}

#[derive(Debug, Default, Deserialize)]
struct PlayerPropertiesResult {
    #[serde(default)]
    speed: Option<f64>,
    #[serde(default)]
    time: Option<KodiTime>,
    #[serde(default)]
    totaltime: Option<KodiTime>,
    #[serde(default)]
    position: Option<i64>,
}

/// Volume and mute state of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicationProperties {
    pub volume: u8,
    pub muted: bool,
}

#[derive(Debug, Deserialize)]
struct ApplicationPropertiesResult {
    #[serde(default)]
    volume: f64,
    #[serde(default)]
    muted: bool,
}

#[derive(Debug, Default, Deserialize)]
struct PlaylistItemsResult {
    #[serde(default)]
    items: Vec<PlaylistItemResult>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemResult {
    #[serde(default)]
    label: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    file: String,
}

fn invalid(method: &str, reason: impl Into<String>) -> CodecError {
    CodecError::InvalidPayload {
        method: method.to_string(),
        reason: reason.into(),
    }
}

fn decode<T>(method: &str, result: &Value) -> Result<T, CodecError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(result.clone()).map_err(|e| invalid(method, e.to_string()))
}

/// `Player.GetActivePlayers`: the first active player id, if any.
pub fn parse_active_players(result: &Value) -> Result<Option<i64>, CodecError> {
    let players: Vec<ActivePlayer> = decode("Player.GetActivePlayers", result)?;
    Ok(players.first().map(|p| p.playerid))
}

/// `Player.GetProperties` with [`PLAYER_PROPERTY_NAMES`].
///
/// A `position` of -1 (not playing from a playlist) maps to `None`.
pub fn parse_player_properties(result: &Value) -> Result<PlayerProperties, CodecError> {
    let raw: PlayerPropertiesResult = decode("Player.GetProperties", result)?;
    Ok(PlayerProperties {
        speed: raw.speed.map(|s| s.round().clamp(-32.0, 32.0) as i32),
        elapsed: property_duration("time", raw.time)?,
        total: property_duration("totaltime", raw.totaltime)?,
        position: raw.position.and_then(|p| usize::try_from(p).ok()),
    })
}

fn property_duration(name: &str, time: Option<KodiTime>) -> Result<Option<Duration>, CodecError> {
    time.map(|t| {
        t.to_duration()
            .ok_or_else(|| invalid("Player.GetProperties", format!("{name} out of range")))
    })
    .transpose()
}

/// `Application.GetProperties` with [`APPLICATION_PROPERTY_NAMES`].
pub fn parse_application_properties(result: &Value) -> Result<ApplicationProperties, CodecError> {
    let raw: ApplicationPropertiesResult = decode("Application.GetProperties", result)?;
    Ok(ApplicationProperties {
        volume: raw.volume.round().clamp(0.0, 100.0) as u8,
        muted: raw.muted,
    })
}

/// `Playlist.GetItems` with [`PLAYLIST_ITEM_FIELDS`].
///
/// Items without a title (plain files, streams) fall back to their label.
/// An empty playlist may omit `items` entirely.
pub fn parse_playlist_items(result: &Value) -> Result<Vec<PlaylistItem>, CodecError> {
    let raw: PlaylistItemsResult = match result {
        Value::Null => PlaylistItemsResult::default(),
        other => decode("Playlist.GetItems", other)?,
    };
    Ok(raw
        .items
        .into_iter()
        .map(|item| {
            let title = if item.title.is_empty() { item.label } else { item.title };
            PlaylistItem::new(title, item.file)
        })
        .collect())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
