//! The owned state model and its single mutation entry point.
//!
//! Every change to the mirror, whether it comes from a notification, an RPC
//! response or a local command, is expressed as a [`ModelUpdate`] and applied
//! through [`Model::apply`].  One update is one atomic step: a reader taking a
//! snapshot between two updates never sees half of one.  After each step the
//! model re-establishes its invariants (`elapsed <= total`, speed and volume
//! ranges, playlist cursor in bounds).

use std::time::Duration;

use super::player::{PlayerState, MAX_SPEED, MAX_VOLUME, MIN_SPEED};
use super::playlist::{PlaylistItem, PlaylistState};
use super::snapshot::{ConnectionState, Snapshot};

/// Result of a `Player.GetProperties` refresh, applied as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerProperties {
    pub speed: Option<i32>,
    pub elapsed: Option<Duration>,
    pub total: Option<Duration>,
    /// Now-playing playlist position; `None` when not playing from a playlist.
    pub position: Option<usize>,
}

/// One atomic change to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelUpdate {
    Connection(ConnectionState),
    /// A player started or resumed.
    PlayerStarted { player_id: Option<i64>, speed: i32 },
    PlayerPaused,
    SpeedChanged { speed: i32 },
    /// `speed` is set when the seek also reported the current speed.
    Seeked { elapsed: Duration, speed: Option<i32> },
    /// Playback stopped: player off and the time cursor reset to zero.
    PlayerStopped,
    /// Authoritative refresh from the server.
    ///
    /// Kodi reports a paused player with speed 0, so the refresh also settles
    /// `is_playing`.
    Properties(PlayerProperties),
    /// Result of `Player.GetActivePlayers`: the active player id, or none.
    ActivePlayer(Option<i64>),
    Volume { volume: u8, muted: Option<bool> },
    PlaylistReplaced(Vec<PlaylistItem>),
    /// The server reports this playlist position as playing.
    NowPlaying(usize),
    SwitchStarted(usize),
    SwitchAbandoned(usize),
    SwitchGraceElapsed,
    /// Explicit disconnect: back to the freshly constructed state.
    Cleared,
}

/// Owned mirror of the server state.
#[derive(Debug, Clone, Default)]
pub struct Model {
    connection: ConnectionState,
    player: PlayerState,
    playlist: PlaylistState,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn playlist(&self) -> &PlaylistState {
        &self.playlist
    }

    /// Returns an owned copy sharing no storage with the live model.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            connection: self.connection,
            player: self.player.clone(),
            playlist: self.playlist.clone(),
        }
    }

    /// Applies one update and re-establishes the invariants.
    pub fn apply(&mut self, update: ModelUpdate) {
        match update {
            ModelUpdate::Connection(state) => self.connection = state,
            ModelUpdate::PlayerStarted { player_id, speed } => {
                self.player.is_player_on = true;
                self.player.is_playing = true;
                self.player.speed = speed;
                if let Some(id) = player_id {
                    self.player.player_id = id;
                }
            }
            ModelUpdate::PlayerPaused => {
                self.player.is_playing = false;
                self.player.speed = 0;
            }
            ModelUpdate::SpeedChanged { speed } => self.player.speed = speed,
            ModelUpdate::Seeked { elapsed, speed } => {
                self.player.elapsed = elapsed;
                if let Some(speed) = speed {
                    self.player.speed = speed;
                }
            }
            ModelUpdate::PlayerStopped => self.player.reset_playback(),
            ModelUpdate::Properties(props) => {
                self.player.is_player_on = true;
                if let Some(total) = props.total {
                    self.player.total = total;
                }
                if let Some(elapsed) = props.elapsed {
                    self.player.elapsed = elapsed;
                }
                if let Some(speed) = props.speed {
                    self.player.speed = speed;
                    self.player.is_playing = speed != 0;
                }
                if let Some(position) = props.position {
                    self.playlist.observe_now_playing(position);
                }
            }
            ModelUpdate::ActivePlayer(Some(id)) => {
                self.player.is_player_on = true;
                self.player.player_id = id;
            }
            ModelUpdate::ActivePlayer(None) => self.player.reset_playback(),
            ModelUpdate::Volume { volume, muted } => {
                self.player.volume = volume;
                if let Some(muted) = muted {
                    self.player.muted = muted;
                }
            }
            ModelUpdate::PlaylistReplaced(items) => self.playlist.replace_items(items),
            ModelUpdate::NowPlaying(index) => self.playlist.observe_now_playing(index),
            ModelUpdate::SwitchStarted(target) => self.playlist.start_switch(target),
            ModelUpdate::SwitchAbandoned(target) => self.playlist.abandon_switch(target),
            ModelUpdate::SwitchGraceElapsed => self.playlist.grace_elapsed(),
            ModelUpdate::Cleared => *self = Model::default(),
        }
        self.enforce_invariants();
    }

    fn enforce_invariants(&mut self) {
        self.player.speed = self.player.speed.clamp(MIN_SPEED, MAX_SPEED);
        self.player.volume = self.player.volume.min(MAX_VOLUME);
        self.player.enforce_time_invariant();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: usize) -> Vec<PlaylistItem> {
        (0..n)
            .map(|i| PlaylistItem::new(format!("item {i}"), format!("/media/{i}.mkv")))
            .collect()
    }

    /// Small deterministic generator so sequences are reproducible.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self) -> u64 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            self.0 >> 33
        }
    }

    fn random_update(rng: &mut Lcg) -> ModelUpdate {
        let secs = |rng: &mut Lcg| Duration::from_secs(rng.next() % 7200);
        match rng.next() % 8 {
            0 => ModelUpdate::PlayerStarted { player_id: Some(1), speed: 1 },
            1 => ModelUpdate::PlayerPaused,
            2 => ModelUpdate::SpeedChanged { speed: (rng.next() % 65) as i32 - 32 },
            3 => ModelUpdate::Seeked { elapsed: secs(rng), speed: None },
            4 => ModelUpdate::PlayerStopped,
            5 => ModelUpdate::Properties(PlayerProperties {
                speed: Some(1),
                elapsed: Some(secs(rng)),
                total: Some(secs(rng)),
                position: None,
            }),
            6 => ModelUpdate::Properties(PlayerProperties {
                elapsed: Some(secs(rng)),
                ..Default::default()
            }),
            _ => ModelUpdate::Properties(PlayerProperties {
                total: Some(secs(rng)),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_elapsed_never_exceeds_total_for_any_sequence() {
        // Arrange: many seeded sequences of player-property updates
        for seed in 0..200u64 {
            let mut rng = Lcg(seed);
            let mut model = Model::new();

            // Act / Assert after every single step
            for step in 0..100 {
                model.apply(random_update(&mut rng));
                let p = model.player();
                if !p.total.is_zero() {
                    assert!(
                        p.elapsed <= p.total,
                        "seed {seed} step {step}: elapsed {:?} > total {:?}",
                        p.elapsed,
                        p.total
                    );
                }
            }
        }
    }

    #[test]
    fn test_properties_apply_as_one_unit() {
        // Arrange
        let mut model = Model::new();

        // Act
        model.apply(ModelUpdate::Properties(PlayerProperties {
            speed: Some(2),
            elapsed: Some(Duration::from_secs(40)),
            total: Some(Duration::from_secs(100)),
            position: None,
        }));

        // Assert: every field from the refresh is visible in the same snapshot
        let snap = model.snapshot();
        assert!(snap.is_player_on());
        assert!(snap.is_playing());
        assert_eq!(snap.speed(), 2);
        assert_eq!(snap.elapsed(), Duration::from_secs(40));
        assert_eq!(snap.total(), Duration::from_secs(100));
    }

    #[test]
    fn test_stop_resets_times_and_flags() {
        let mut model = Model::new();
        model.apply(ModelUpdate::PlayerStarted { player_id: Some(0), speed: 1 });
        model.apply(ModelUpdate::Properties(PlayerProperties {
            elapsed: Some(Duration::from_secs(10)),
            total: Some(Duration::from_secs(20)),
            ..Default::default()
        }));

        model.apply(ModelUpdate::PlayerStopped);

        let p = model.player();
        assert!(!p.is_player_on);
        assert!(!p.is_playing);
        assert_eq!(p.elapsed, Duration::ZERO);
        assert_eq!(p.total, Duration::ZERO);
    }

    #[test]
    fn test_pause_keeps_player_on() {
        let mut model = Model::new();
        model.apply(ModelUpdate::PlayerStarted { player_id: None, speed: 1 });
        model.apply(ModelUpdate::PlayerPaused);
        assert!(model.player().is_player_on);
        assert!(!model.player().is_playing);
    }

    #[test]
    fn test_speed_change_does_not_touch_playing_flag() {
        let mut model = Model::new();
        model.apply(ModelUpdate::PlayerStarted { player_id: None, speed: 1 });
        model.apply(ModelUpdate::SpeedChanged { speed: 0 });
        assert!(model.player().is_playing, "playing is a distinct flag");
    }

    #[test]
    fn test_seek_during_fast_forward_moves_time_and_speed_in_one_step() {
        // Arrange
        let mut model = Model::new();
        model.apply(ModelUpdate::PlayerStarted { player_id: Some(1), speed: 1 });

        // Act
        model.apply(ModelUpdate::Seeked { elapsed: Duration::from_secs(600), speed: Some(8) });

        // Assert
        assert_eq!(model.player().elapsed, Duration::from_secs(600));
        assert_eq!(model.player().speed, 8);
    }

    #[test]
    fn test_switch_guard_ignores_old_item_and_confirms_target() {
        // Arrange: five items, currently on 1, jump to 3 requested
        let mut model = Model::new();
        model.apply(ModelUpdate::PlaylistReplaced(items(5)));
        model.apply(ModelUpdate::NowPlaying(1));
        model.apply(ModelUpdate::SwitchStarted(3));

        // Act: stale report for the previous item
        model.apply(ModelUpdate::NowPlaying(1));

        // Assert: nothing moved, still switching
        assert_eq!(model.playlist().current_index(), Some(1));
        assert!(model.playlist().switching_in_progress());

        // Act: confirmation for the target
        model.apply(ModelUpdate::NowPlaying(3));

        // Assert
        assert_eq!(model.playlist().current_index(), Some(3));
        assert!(!model.playlist().switching_in_progress());
    }

    #[test]
    fn test_refresh_position_goes_through_switch_guard() {
        let mut model = Model::new();
        model.apply(ModelUpdate::PlaylistReplaced(items(5)));
        model.apply(ModelUpdate::SwitchStarted(4));

        model.apply(ModelUpdate::Properties(PlayerProperties {
            position: Some(0),
            ..Default::default()
        }));

        assert!(model.playlist().switching_in_progress());
        assert_eq!(model.playlist().current_index(), Some(0));
    }

    #[test]
    fn test_grace_elapsed_releases_stuck_switch() {
        let mut model = Model::new();
        model.apply(ModelUpdate::PlaylistReplaced(items(5)));
        model.apply(ModelUpdate::SwitchStarted(4));
        model.apply(ModelUpdate::NowPlaying(2));

        model.apply(ModelUpdate::SwitchGraceElapsed);

        assert!(!model.playlist().switching_in_progress());
        assert_eq!(model.playlist().current_index(), Some(2));
    }

    #[test]
    fn test_volume_is_capped_at_maximum() {
        let mut model = Model::new();
        model.apply(ModelUpdate::Volume { volume: 250, muted: None });
        assert_eq!(model.player().volume, MAX_VOLUME);
    }

    #[test]
    fn test_cleared_resets_everything() {
        let mut model = Model::new();
        model.apply(ModelUpdate::Connection(ConnectionState::Connected));
        model.apply(ModelUpdate::PlaylistReplaced(items(3)));
        model.apply(ModelUpdate::Volume { volume: 50, muted: Some(true) });

        model.apply(ModelUpdate::Cleared);

        assert_eq!(model.snapshot(), Snapshot::default());
    }

    #[test]
    fn test_snapshot_does_not_observe_later_mutation() {
        let mut model = Model::new();
        model.apply(ModelUpdate::Volume { volume: 10, muted: None });
        let snap = model.snapshot();

        model.apply(ModelUpdate::Volume { volume: 90, muted: None });

        assert_eq!(snap.volume(), 10);
        assert_eq!(model.snapshot().volume(), 90);
    }
}
