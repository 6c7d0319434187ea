//! Inbound frame dispatch and notification routing.
//!
//! Every text frame from the server goes through [`classify`]: responses go
//! to the correlator, notifications are translated by [`route`] into model
//! updates plus the follow-up query the engine should issue.  Malformed
//! frames are logged and dropped; they never close the connection.

use kodi_remote_core::protocol::{decode_frame, InboundFrame, RawNotification, Response};
use kodi_remote_core::{ModelUpdate, Notification};
use tracing::{debug, info, warn};

/// Work the engine should schedule after applying a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    /// Re-read speed, time, total time and playlist position.
    RefreshPlayer,
    /// Re-fetch the whole playlist of the given id (`None`: the tracked one).
    RefetchPlaylist(Option<i64>),
}

/// Outcome of routing one notification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Routed {
    /// Applied in order, each as one atomic step.
    pub updates: Vec<ModelUpdate>,
    pub follow_up: Option<FollowUp>,
}

impl Routed {
    fn update(update: ModelUpdate) -> Self {
        Self { updates: vec![update], follow_up: None }
    }

    fn follow_up(mut self, follow_up: FollowUp) -> Self {
        self.follow_up = Some(follow_up);
        self
    }
}

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Response(Response),
    Notification(Notification),
}

/// Decodes and classifies one text frame.  Returns `None` for malformed input.
pub fn classify(text: &str) -> Option<Inbound> {
    match decode_frame(text) {
        Ok(InboundFrame::Response(response)) => Some(Inbound::Response(response)),
        Ok(InboundFrame::Notification(raw)) => interpret(&raw).map(Inbound::Notification),
        Err(e) => {
            warn!("dropping malformed frame: {e}");
            None
        }
    }
}

fn interpret(raw: &RawNotification) -> Option<Notification> {
    match Notification::from_raw(raw) {
        Ok(n) => Some(n),
        Err(e) => {
            warn!("dropping notification: {e}");
            None
        }
    }
}

/// Translates a notification into model updates and a follow-up.
pub fn route(notification: Notification) -> Routed {
    match notification {
        Notification::PlayerStarted { player_id, speed } => {
            Routed::update(ModelUpdate::PlayerStarted { player_id, speed })
                .follow_up(FollowUp::RefreshPlayer)
        }
        Notification::PlayerPaused { .. } => Routed::update(ModelUpdate::PlayerPaused),
        Notification::SpeedChanged { speed } => {
            Routed::update(ModelUpdate::SpeedChanged { speed })
        }
        Notification::Seeked { elapsed: Some(elapsed), speed } => {
            Routed::update(ModelUpdate::Seeked { elapsed, speed })
        }
        // A seek without a position still moved the cursor somewhere.
        Notification::Seeked { elapsed: None, speed: Some(speed) } => {
            Routed::update(ModelUpdate::SpeedChanged { speed })
                .follow_up(FollowUp::RefreshPlayer)
        }
        Notification::Seeked { elapsed: None, speed: None } => {
            Routed::default().follow_up(FollowUp::RefreshPlayer)
        }
        Notification::PropertiesChanged => Routed::default().follow_up(FollowUp::RefreshPlayer),
        Notification::PlayerStopped { ended } => {
            debug!(ended, "player stopped");
            Routed::update(ModelUpdate::PlayerStopped)
        }
        Notification::PlaylistChanged { playlist_id } => {
            Routed::default().follow_up(FollowUp::RefetchPlaylist(playlist_id))
        }
        Notification::VolumeChanged { volume, muted } => {
            Routed::update(ModelUpdate::Volume { volume, muted: Some(muted) })
        }
        Notification::ServerQuitting => {
            info!("server is shutting down");
            Routed::default()
        }
        Notification::Other(method) => {
            debug!(%method, "ignoring notification");
            Routed::default()
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
