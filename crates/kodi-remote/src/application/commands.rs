//! Command façade: the public handle presentation code talks to.
//!
//! [`RemoteHandle`] is cheap to clone and safe to use from any task.  Each
//! command is validated locally, enqueued to the engine without blocking and
//! answered through a [`PendingReply`] future.  Arguments that fail
//! validation are rejected with `InvalidArgument` and never reach the wire.
//!
//! State is read through [`RemoteHandle::snapshot`] or by watching the
//! receiver returned from [`RemoteHandle::subscribe`].

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, watch};

use kodi_remote_core::domain::player::{is_supported_speed, MAX_SPEED, MAX_VOLUME, MIN_SPEED};
use kodi_remote_core::Snapshot;

use super::error::RemoteError;
use crate::domain::RemoteConfig;

pub(crate) type Reply<T> = oneshot::Sender<Result<T, RemoteError>>;

// ── Engine mailbox ────────────────────────────────────────────────────────────

/// Messages from handles to the engine task.
#[derive(Debug)]
pub(crate) enum EngineCommand {
    Connect { reply: Reply<()> },
    Disconnect { reply: Reply<()> },
    Reconfigure { config: RemoteConfig, reply: Reply<()> },
    Call { call: RemoteCall, reply: Reply<Value> },
    JumpTo { index: usize, reply: Reply<Value> },
}

/// Menu navigation keys (`Input.*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Up,
    Down,
    Left,
    Right,
    Select,
    Back,
    ContextMenu,
    Info,
    Home,
}

impl InputAction {
    pub fn method(self) -> &'static str {
        match self {
            InputAction::Up => "Input.Up",
            InputAction::Down => "Input.Down",
            InputAction::Left => "Input.Left",
            InputAction::Right => "Input.Right",
            InputAction::Select => "Input.Select",
            InputAction::Back => "Input.Back",
            InputAction::ContextMenu => "Input.ContextMenu",
            InputAction::Info => "Input.Info",
            InputAction::Home => "Input.Home",
        }
    }
}

/// The `play` argument of `Player.PlayPause`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayMode {
    Toggle,
    Play,
    Pause,
}

impl PlayMode {
    fn to_param(self) -> Value {
        match self {
            PlayMode::Toggle => json!("toggle"),
            PlayMode::Play => json!(true),
            PlayMode::Pause => json!(false),
        }
    }
}

/// Local model change applied when a command succeeds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Effect {
    None,
    Volume(u8),
    Speed(i32),
    /// `Application.SetMute` answers with the new mute state.
    Mute,
}

/// A validated single-RPC command.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RemoteCall {
    Input(InputAction),
    SendText(String),
    PlayPause(PlayMode),
    Stop,
    Seek { percentage: f64 },
    SetSpeed(i32),
    NextItem,
    SetVolume(u8),
    ToggleMute,
}

impl RemoteCall {
    pub(crate) fn method(&self) -> &'static str {
        match self {
            RemoteCall::Input(action) => action.method(),
            RemoteCall::SendText(_) => "Input.SendText",
            RemoteCall::PlayPause(_) => "Player.PlayPause",
            RemoteCall::Stop => "Player.Stop",
            RemoteCall::Seek { .. } => "Player.Seek",
            RemoteCall::SetSpeed(_) => "Player.SetSpeed",
            RemoteCall::NextItem => "Player.GoTo",
            RemoteCall::SetVolume(_) => "Application.SetVolume",
            RemoteCall::ToggleMute => "Application.SetMute",
        }
    }

    /// Request parameters; player commands are addressed to `player_id`.
    pub(crate) fn params(&self, player_id: i64) -> Option<Value> {
        match self {
            RemoteCall::Input(_) => None,
            RemoteCall::SendText(text) => Some(json!({"text": text, "done": true})),
            RemoteCall::PlayPause(mode) => {
                Some(json!({"playerid": player_id, "play": mode.to_param()}))
            }
            RemoteCall::Stop => Some(json!({"playerid": player_id})),
            RemoteCall::Seek { percentage } => {
                Some(json!({"playerid": player_id, "value": {"percentage": percentage}}))
            }
            RemoteCall::SetSpeed(speed) => Some(json!({"playerid": player_id, "speed": speed})),
            RemoteCall::NextItem => Some(json!({"playerid": player_id, "to": "next"})),
            RemoteCall::SetVolume(volume) => Some(json!({"volume": volume})),
            RemoteCall::ToggleMute => Some(json!({"mute": "toggle"})),
        }
    }

    pub(crate) fn effect(&self) -> Effect {
        match self {
            RemoteCall::SetVolume(volume) => Effect::Volume(*volume),
            RemoteCall::SetSpeed(speed) => Effect::Speed(*speed),
            RemoteCall::ToggleMute => Effect::Mute,
            _ => Effect::None,
        }
    }
}

// ── Validation ────────────────────────────────────────────────────────────────

fn validate_volume(volume: i32) -> Result<u8, RemoteError> {
    u8::try_from(volume)
        .ok()
        .filter(|v| *v <= MAX_VOLUME)
        .ok_or_else(|| {
            RemoteError::InvalidArgument(format!("volume {volume} outside 0..={MAX_VOLUME}"))
        })
}

fn validate_speed(speed: i32) -> Result<i32, RemoteError> {
    if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
        return Err(RemoteError::InvalidArgument(format!(
            "speed {speed} outside {MIN_SPEED}..={MAX_SPEED}"
        )));
    }
    if !is_supported_speed(speed) {
        return Err(RemoteError::InvalidArgument(format!("speed {speed} is not a supported step")));
    }
    Ok(speed)
}

fn validate_percentage(percentage: f64) -> Result<f64, RemoteError> {
    if percentage.is_finite() && (0.0..=100.0).contains(&percentage) {
        Ok(percentage)
    } else {
        Err(RemoteError::InvalidArgument(format!("seek position {percentage} outside 0..=100")))
    }
}

// ── PendingReply ──────────────────────────────────────────────────────────────

/// Completion of one command.
///
/// Resolves to the server's result payload or the error the command failed
/// with.  Dropping it only discards the result; the command still runs.
#[derive(Debug)]
#[must_use = "a PendingReply does nothing unless awaited or dropped deliberately"]
pub struct PendingReply<T> {
    state: ReplyState<T>,
}

#[derive(Debug)]
enum ReplyState<T> {
    Ready(Option<Result<T, RemoteError>>),
    Waiting(oneshot::Receiver<Result<T, RemoteError>>),
}

impl<T> PendingReply<T> {
    pub(crate) fn ready(result: Result<T, RemoteError>) -> Self {
        Self { state: ReplyState::Ready(Some(result)) }
    }

    pub(crate) fn waiting(rx: oneshot::Receiver<Result<T, RemoteError>>) -> Self {
        Self { state: ReplyState::Waiting(rx) }
    }
}

impl<T: Unpin> Future for PendingReply<T> {
    type Output = Result<T, RemoteError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            ReplyState::Ready(result) => {
                Poll::Ready(result.take().unwrap_or(Err(RemoteError::EngineStopped)))
            }
            // A dropped sender means the engine went away mid-call.
            ReplyState::Waiting(rx) => Pin::new(rx)
                .poll(cx)
                .map(|r| r.unwrap_or(Err(RemoteError::EngineStopped))),
        }
    }
}

// ── RemoteHandle ──────────────────────────────────────────────────────────────

/// Public surface of a running engine.
#[derive(Debug, Clone)]
pub struct RemoteHandle {
    commands: mpsc::UnboundedSender<EngineCommand>,
    snapshots: watch::Receiver<Snapshot>,
}

impl RemoteHandle {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<EngineCommand>,
        snapshots: watch::Receiver<Snapshot>,
    ) -> Self {
        Self { commands, snapshots }
    }

    fn request<T>(&self, make: impl FnOnce(Reply<T>) -> EngineCommand) -> PendingReply<T> {
        let (tx, rx) = oneshot::channel();
        match self.commands.send(make(tx)) {
            Ok(()) => PendingReply::waiting(rx),
            Err(_) => PendingReply::ready(Err(RemoteError::EngineStopped)),
        }
    }

    fn call(&self, call: RemoteCall) -> PendingReply<Value> {
        self.request(|reply| EngineCommand::Call { call, reply })
    }

    // ── Connection lifecycle ──────────────────────────────────────────────────

    /// Opens the connection and performs the initial state sync.
    ///
    /// Completes once the transport is up; already-connected engines answer
    /// immediately.
    pub fn connect(&self) -> PendingReply<()> {
        self.request(|reply| EngineCommand::Connect { reply })
    }

    /// Closes the connection, fails outstanding calls with `ConnectionLost`
    /// and clears the mirrored state.
    pub fn disconnect(&self) -> PendingReply<()> {
        self.request(|reply| EngineCommand::Disconnect { reply })
    }

    /// Replaces host, port, credentials and timings.  Only allowed while
    /// disconnected.
    pub fn reconfigure(&self, config: RemoteConfig) -> PendingReply<()> {
        self.request(|reply| EngineCommand::Reconfigure { config, reply })
    }

    // ── State ─────────────────────────────────────────────────────────────────

    /// Latest published state.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that is notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    // ── Navigation ────────────────────────────────────────────────────────────

    pub fn input(&self, action: InputAction) -> PendingReply<Value> {
        self.call(RemoteCall::Input(action))
    }

    pub fn up(&self) -> PendingReply<Value> {
        self.input(InputAction::Up)
    }

    pub fn down(&self) -> PendingReply<Value> {
        self.input(InputAction::Down)
    }

    pub fn left(&self) -> PendingReply<Value> {
        self.input(InputAction::Left)
    }

    pub fn right(&self) -> PendingReply<Value> {
        self.input(InputAction::Right)
    }

    pub fn select(&self) -> PendingReply<Value> {
        self.input(InputAction::Select)
    }

    pub fn back(&self) -> PendingReply<Value> {
        self.input(InputAction::Back)
    }

    pub fn menu(&self) -> PendingReply<Value> {
        self.input(InputAction::ContextMenu)
    }

    pub fn info(&self) -> PendingReply<Value> {
        self.input(InputAction::Info)
    }

    pub fn home(&self) -> PendingReply<Value> {
        self.input(InputAction::Home)
    }

    /// Types `text` into the focused input field and submits it.
    pub fn send_text(&self, text: impl Into<String>) -> PendingReply<Value> {
        self.call(RemoteCall::SendText(text.into()))
    }

    // ── Playback ──────────────────────────────────────────────────────────────

    pub fn play_pause(&self) -> PendingReply<Value> {
        self.call(RemoteCall::PlayPause(PlayMode::Toggle))
    }

    pub fn play(&self) -> PendingReply<Value> {
        self.call(RemoteCall::PlayPause(PlayMode::Play))
    }

    pub fn pause(&self) -> PendingReply<Value> {
        self.call(RemoteCall::PlayPause(PlayMode::Pause))
    }

    pub fn stop(&self) -> PendingReply<Value> {
        self.call(RemoteCall::Stop)
    }

    /// Seeks to `percentage` of the current item, in `[0, 100]`.
    pub fn seek(&self, percentage: f64) -> PendingReply<Value> {
        match validate_percentage(percentage) {
            Ok(percentage) => self.call(RemoteCall::Seek { percentage }),
            Err(e) => PendingReply::ready(Err(e)),
        }
    }

    /// Sets the playback rate to one of Kodi's speed steps.
    pub fn set_speed(&self, speed: i32) -> PendingReply<Value> {
        match validate_speed(speed) {
            Ok(speed) => self.call(RemoteCall::SetSpeed(speed)),
            Err(e) => PendingReply::ready(Err(e)),
        }
    }

    /// Jumps to playlist position `index`.
    ///
    /// The index is checked against the engine's current playlist; the
    /// cursor moves only once the server confirms the jump.
    pub fn jump_to(&self, index: usize) -> PendingReply<Value> {
        self.request(|reply| EngineCommand::JumpTo { index, reply })
    }

    pub fn next_item(&self) -> PendingReply<Value> {
        self.call(RemoteCall::NextItem)
    }

    // ── Volume ────────────────────────────────────────────────────────────────

    /// Sets the volume; values outside `[0, 100]` are rejected, not clamped.
    pub fn set_volume(&self, volume: i32) -> PendingReply<Value> {
        match validate_volume(volume) {
            Ok(volume) => self.call(RemoteCall::SetVolume(volume)),
            Err(e) => PendingReply::ready(Err(e)),
        }
    }

    pub fn toggle_mute(&self) -> PendingReply<Value> {
        self.call(RemoteCall::ToggleMute)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, task};

    fn handle() -> (RemoteHandle, mpsc::UnboundedReceiver<EngineCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (_snap_tx, snap_rx) = watch::channel(Snapshot::default());
        (RemoteHandle::new(tx, snap_rx), rx)
    }

    #[test]
    fn test_volume_bounds() {
        assert_eq!(validate_volume(0), Ok(0));
        assert_eq!(validate_volume(100), Ok(100));
        assert!(validate_volume(-5).is_err());
        assert!(validate_volume(150).is_err());
    }

    #[test]
    fn test_speed_must_be_a_kodi_step() {
        assert_eq!(validate_speed(-32), Ok(-32));
        assert_eq!(validate_speed(0), Ok(0));
        assert!(validate_speed(3).is_err());
        assert!(validate_speed(33).is_err());
    }

    #[test]
    fn test_percentage_bounds() {
        assert!(validate_percentage(0.0).is_ok());
        assert!(validate_percentage(100.0).is_ok());
        assert!(validate_percentage(-0.1).is_err());
        assert!(validate_percentage(f64::NAN).is_err());
    }

    #[test]
    fn test_player_params_carry_player_id() {
        assert_eq!(
            RemoteCall::PlayPause(PlayMode::Toggle).params(1),
            Some(json!({"playerid": 1, "play": "toggle"}))
        );
        assert_eq!(
            RemoteCall::Seek { percentage: 42.0 }.params(0),
            Some(json!({"playerid": 0, "value": {"percentage": 42.0}}))
        );
        assert_eq!(RemoteCall::NextItem.params(1), Some(json!({"playerid": 1, "to": "next"})));
    }

    #[test]
    fn test_input_commands_have_no_params() {
        let call = RemoteCall::Input(InputAction::ContextMenu);
        assert_eq!(call.method(), "Input.ContextMenu");
        assert_eq!(call.params(1), None);
    }

    #[tokio::test]
    async fn test_invalid_volume_never_reaches_engine() {
        // Arrange
        let (handle, mut rx) = handle();

        // Act
        let result = handle.set_volume(150).await;

        // Assert
        assert!(matches!(result, Err(RemoteError::InvalidArgument(_))));
        assert!(rx.try_recv().is_err(), "nothing was enqueued");
    }

    #[tokio::test]
    async fn test_valid_volume_is_enqueued_verbatim() {
        let (handle, mut rx) = handle();

        let _reply = handle.set_volume(0);

        match rx.try_recv() {
            Ok(EngineCommand::Call { call, .. }) => assert_eq!(call, RemoteCall::SetVolume(0)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_reply_stays_pending_until_engine_answers() {
        // Arrange
        let (handle, mut rx) = handle();
        let mut reply = task::spawn(handle.stop());

        // Assert: nothing answered yet
        assert_pending!(reply.poll());

        // Act: the engine answers
        let Ok(EngineCommand::Call { reply: tx, .. }) = rx.try_recv() else {
            panic!("expected a call");
        };
        tx.send(Ok(json!("OK"))).unwrap();

        // Assert
        assert!(reply.is_woken());
        assert_eq!(tokio_test::assert_ready!(reply.poll()), Ok(json!("OK")));
    }

    #[tokio::test]
    async fn test_stopped_engine_fails_commands() {
        let (handle, rx) = handle();
        drop(rx);
        assert_eq!(handle.home().await, Err(RemoteError::EngineStopped));
    }
}
