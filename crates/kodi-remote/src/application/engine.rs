//! The engine actor: single owner of the connection, pending calls and model.
//!
//! # Task layout
//!
//! ```text
//!  RemoteHandle ──EngineCommand (unbounded mpsc)──▶ ┌──────────────┐
//!                                                   │              │ ──frames──▶ transport
//!  connect task ──(generation, link | error)──────▶ │ engine actor │ ◀─events─── transport
//!                                                   │              │
//!  RemoteHandle ◀──────── Snapshot (watch) ──────── └──────────────┘
//! ```
//!
//! The actor is the only writer of the [`Model`], the [`Correlator`] and the
//! timers (RPC deadlines, switch grace period, poll interval).  Each loop
//! iteration handles one event completely and then publishes a snapshot, so
//! readers never observe a half-applied step.
//!
//! # Generations
//!
//! Every connection attempt bumps a generation counter.  A connect task
//! reports back with the generation it was started under; results from an
//! older generation (for example a handshake that completes after the user
//! already called `disconnect()`) are discarded.

use std::future::pending;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use kodi_remote_core::protocol::results::{
    parse_active_players, parse_application_properties, parse_player_properties,
    parse_playlist_items, APPLICATION_PROPERTY_NAMES, PLAYER_PROPERTY_NAMES, PLAYLIST_ITEM_FIELDS,
};
use kodi_remote_core::{ConnectionState, Model, ModelUpdate, Snapshot};

use super::commands::{Effect, EngineCommand, RemoteCall, RemoteHandle, Reply};
use super::correlator::{Completed, Correlator};
use super::error::RemoteError;
use super::router::{classify, route, FollowUp, Inbound};
use super::transport::{CloseReason, Connector, TransportError, TransportEvent, TransportLink};
use crate::domain::RemoteConfig;

/// Starts an engine task on the current Tokio runtime.
///
/// The engine runs until every [`RemoteHandle`] has been dropped.
pub fn start(config: RemoteConfig, connector: Arc<dyn Connector>) -> RemoteHandle {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::default());
    let actor = EngineActor::new(config, connector, commands_rx, snapshot_tx);
    let span = tracing::info_span!("engine", id = %actor.id);
    tokio::spawn(actor.run().instrument(span));
    RemoteHandle::new(commands_tx, snapshot_rx)
}

// ── Call bookkeeping ──────────────────────────────────────────────────────────

/// Read-only queries the engine issues on its own behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Query {
    ActivePlayers,
    ApplicationProperties,
    PlayerProperties,
    PlaylistItems,
}

impl Query {
    fn request(self, player_id: i64) -> (&'static str, Option<Value>) {
        match self {
            Query::ActivePlayers => ("Player.GetActivePlayers", None),
            Query::ApplicationProperties => (
                "Application.GetProperties",
                Some(json!({"properties": APPLICATION_PROPERTY_NAMES})),
            ),
            Query::PlayerProperties => (
                "Player.GetProperties",
                Some(json!({"playerid": player_id, "properties": PLAYER_PROPERTY_NAMES})),
            ),
            // Kodi numbers the audio and video playlists like their players.
            Query::PlaylistItems => (
                "Playlist.GetItems",
                Some(json!({"playlistid": player_id, "properties": PLAYLIST_ITEM_FIELDS})),
            ),
        }
    }
}

/// What to do when a call completes.
#[derive(Debug)]
enum Purpose {
    Command { reply: Reply<Value>, effect: Effect },
    Jump { reply: Reply<Value>, target: usize },
    Query(Query),
}

struct ActiveLink {
    outbound: mpsc::UnboundedSender<String>,
    inbound: mpsc::Receiver<TransportEvent>,
}

type ConnectResult = (u64, Result<TransportLink, TransportError>);

// ── Actor ─────────────────────────────────────────────────────────────────────

struct EngineActor {
    id: Uuid,
    config: RemoteConfig,
    connector: Arc<dyn Connector>,
    commands: mpsc::UnboundedReceiver<EngineCommand>,
    snapshot_tx: watch::Sender<Snapshot>,
    connect_tx: mpsc::UnboundedSender<ConnectResult>,
    connect_rx: mpsc::UnboundedReceiver<ConnectResult>,
    model: Model,
    correlator: Correlator<Purpose>,
    link: Option<ActiveLink>,
    generation: u64,
    connect_waiters: Vec<Reply<()>>,
    switch_deadline: Option<Instant>,
    poll: Option<Interval>,
    player_refresh_pending: bool,
}

impl EngineActor {
    fn new(
        config: RemoteConfig,
        connector: Arc<dyn Connector>,
        commands: mpsc::UnboundedReceiver<EngineCommand>,
        snapshot_tx: watch::Sender<Snapshot>,
    ) -> Self {
        let (connect_tx, connect_rx) = mpsc::unbounded_channel();
        let poll = poll_timer(&config);
        Self {
            id: Uuid::new_v4(),
            config,
            connector,
            commands,
            snapshot_tx,
            connect_tx,
            connect_rx,
            model: Model::new(),
            correlator: Correlator::new(),
            link: None,
            generation: 0,
            connect_waiters: Vec::new(),
            switch_deadline: None,
            poll,
            player_refresh_pending: false,
        }
    }

    async fn run(mut self) {
        info!("engine started for {}", self.config.endpoint_url());

        loop {
            let rpc_deadline = self.correlator.next_deadline();
            let switch_deadline = self.switch_deadline;

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some((generation, result)) = self.connect_rx.recv() => {
                    self.handle_connect_result(generation, result);
                }
                event = next_transport_event(&mut self.link) => self.handle_transport_event(event),
                _ = sleep_until(rpc_deadline) => self.expire_calls(),
                _ = sleep_until(switch_deadline) => {
                    debug!("switch confirmation did not arrive in time");
                    self.switch_deadline = None;
                    self.apply(ModelUpdate::SwitchGraceElapsed);
                }
                _ = tick(&mut self.poll) => self.poll_player(),
            }

            self.publish();
        }

        self.stop();
        info!("engine stopped");
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    fn handle_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Connect { reply } => self.connect(reply),
            EngineCommand::Disconnect { reply } => {
                self.disconnect();
                let _ = reply.send(Ok(()));
            }
            EngineCommand::Reconfigure { config, reply } => {
                let _ = reply.send(self.reconfigure(config));
            }
            EngineCommand::Call { call, reply } => self.command_call(call, reply),
            EngineCommand::JumpTo { index, reply } => self.jump_to(index, reply),
        }
    }

    fn connect(&mut self, reply: Reply<()>) {
        match self.model.connection() {
            ConnectionState::Connected => {
                let _ = reply.send(Ok(()));
                return;
            }
            ConnectionState::Connecting => {
                self.connect_waiters.push(reply);
                return;
            }
            ConnectionState::Disconnected | ConnectionState::Closing => {}
        }
        if let Err(e) = self.config.validate() {
            let _ = reply.send(Err(e.into()));
            return;
        }

        self.generation += 1;
        self.connect_waiters.push(reply);
        self.apply(ModelUpdate::Connection(ConnectionState::Connecting));
        info!("connecting to {}", self.config.endpoint_url());

        let connector = Arc::clone(&self.connector);
        let config = self.config.clone();
        let results = self.connect_tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let result = connector.connect(&config).await;
            let _ = results.send((generation, result));
        });
    }

    fn disconnect(&mut self) {
        self.generation += 1;
        self.apply(ModelUpdate::Connection(ConnectionState::Closing));
        self.publish();

        // Dropping the outbound sender closes the socket.
        self.link = None;
        let reason = "disconnected before the connection was established";
        for waiter in self.connect_waiters.drain(..) {
            let _ = waiter.send(Err(RemoteError::ConnectionError {
                endpoint: self.config.endpoint_url(),
                reason: reason.to_string(),
            }));
        }
        self.fail_pending(RemoteError::ConnectionLost);
        self.switch_deadline = None;
        self.player_refresh_pending = false;
        self.apply(ModelUpdate::Cleared);
        info!("disconnected");
    }

    fn reconfigure(&mut self, config: RemoteConfig) -> Result<(), RemoteError> {
        if self.model.connection() != ConnectionState::Disconnected {
            return Err(RemoteError::ReconfigureWhileConnected);
        }
        config.validate()?;
        info!("reconfigured for {}", config.endpoint_url());
        self.poll = poll_timer(&config);
        self.config = config;
        Ok(())
    }

    fn command_call(&mut self, call: RemoteCall, reply: Reply<Value>) {
        let params = call.params(self.model.player().player_id);
        let effect = call.effect();
        self.send_call(call.method(), params, Purpose::Command { reply, effect });
    }

    fn jump_to(&mut self, index: usize, reply: Reply<Value>) {
        if self.link.is_none() {
            let _ = reply.send(Err(RemoteError::NotConnected));
            return;
        }
        let len = self.model.playlist().len();
        if index >= len {
            let _ = reply.send(Err(RemoteError::InvalidArgument(format!(
                "playlist index {index} out of range for {len} items"
            ))));
            return;
        }

        self.apply(ModelUpdate::SwitchStarted(index));
        self.switch_deadline = Some(Instant::now() + self.config.switch_grace);
        let params = json!({"playerid": self.model.player().player_id, "to": index});
        self.send_call("Player.GoTo", Some(params), Purpose::Jump { reply, target: index });
    }

    // ── Calls ─────────────────────────────────────────────────────────────────

    fn send_call(&mut self, method: &str, params: Option<Value>, purpose: Purpose) {
        let Some(link) = &self.link else {
            self.complete(purpose, Err(RemoteError::NotConnected));
            return;
        };

        let timeout = self.config.request_timeout;
        match self.correlator.begin(method, params, timeout, Instant::now(), purpose) {
            Ok((id, frame)) => {
                if link.outbound.send(frame).is_err() {
                    if let Some(done) = self.correlator.fail(id, RemoteError::NotConnected) {
                        self.finish(done);
                    }
                }
            }
            Err((e, purpose)) => self.complete(purpose, Err(e.into())),
        }
    }

    fn query(&mut self, query: Query) {
        if query == Query::PlayerProperties {
            self.player_refresh_pending = true;
        }
        let (method, params) = query.request(self.model.player().player_id);
        self.send_call(method, params, Purpose::Query(query));
    }

    fn finish(&mut self, done: Completed<Purpose>) {
        debug!(id = done.call.id, method = %done.call.method, ok = done.outcome.is_ok(), "call completed");
        self.complete(done.call.purpose, done.outcome);
    }

    fn complete(&mut self, purpose: Purpose, outcome: Result<Value, RemoteError>) {
        match purpose {
            Purpose::Command { reply, effect } => {
                if let Ok(result) = &outcome {
                    self.apply_effect(effect, result);
                }
                let _ = reply.send(outcome);
            }
            Purpose::Jump { reply, target } => {
                if outcome.is_err() {
                    self.apply(ModelUpdate::SwitchAbandoned(target));
                }
                let _ = reply.send(outcome);
            }
            Purpose::Query(query) => {
                if query == Query::PlayerProperties {
                    self.player_refresh_pending = false;
                }
                match outcome {
                    Ok(result) => self.apply_query_result(query, &result),
                    Err(e) => warn!("{query:?} query failed: {e}"),
                }
            }
        }
    }

    fn apply_effect(&mut self, effect: Effect, result: &Value) {
        match effect {
            Effect::None => {}
            Effect::Volume(volume) => self.apply(ModelUpdate::Volume { volume, muted: None }),
            Effect::Speed(speed) => self.apply(ModelUpdate::SpeedChanged { speed }),
            Effect::Mute => {
                if let Some(muted) = result.as_bool() {
                    let volume = self.model.player().volume;
                    self.apply(ModelUpdate::Volume { volume, muted: Some(muted) });
                }
            }
        }
    }

    fn apply_query_result(&mut self, query: Query, result: &Value) {
        let parsed = match query {
            Query::ActivePlayers => parse_active_players(result).map(|active| {
                self.apply(ModelUpdate::ActivePlayer(active));
                if active.is_some() {
                    self.query(Query::PlayerProperties);
                    self.query(Query::PlaylistItems);
                }
            }),
            Query::ApplicationProperties => parse_application_properties(result).map(|app| {
                self.apply(ModelUpdate::Volume { volume: app.volume, muted: Some(app.muted) });
            }),
            Query::PlayerProperties => parse_player_properties(result)
                .map(|props| self.apply(ModelUpdate::Properties(props))),
            Query::PlaylistItems => parse_playlist_items(result)
                .map(|items| self.apply(ModelUpdate::PlaylistReplaced(items))),
        };
        if let Err(e) = parsed {
            warn!("ignoring {query:?} result: {e}");
        }
    }

    fn expire_calls(&mut self) {
        for done in self.correlator.expire(Instant::now()) {
            self.finish(done);
        }
    }

    fn fail_pending(&mut self, error: RemoteError) {
        for done in self.correlator.fail_all(error) {
            self.finish(done);
        }
    }

    // ── Transport ─────────────────────────────────────────────────────────────

    fn handle_connect_result(&mut self, generation: u64, result: Result<TransportLink, TransportError>) {
        if generation != self.generation {
            debug!(generation, current = self.generation, "discarding stale connection attempt");
            return;
        }

        match result {
            Ok(link) => {
                self.link = Some(ActiveLink { outbound: link.outbound, inbound: link.inbound });
                self.apply(ModelUpdate::Connection(ConnectionState::Connected));
                info!("connected to {}", self.config.endpoint_url());
                for waiter in self.connect_waiters.drain(..) {
                    let _ = waiter.send(Ok(()));
                }
                self.initial_sync();
            }
            Err(e) => {
                warn!("connection failed: {e}");
                self.apply(ModelUpdate::Connection(ConnectionState::Disconnected));
                let endpoint = self.config.endpoint_url();
                for waiter in self.connect_waiters.drain(..) {
                    let _ = waiter.send(Err(RemoteError::ConnectionError {
                        endpoint: endpoint.clone(),
                        reason: e.to_string(),
                    }));
                }
            }
        }
    }

    fn initial_sync(&mut self) {
        self.query(Query::ActivePlayers);
        self.query(Query::ApplicationProperties);
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Received(text) => match classify(&text) {
                Some(Inbound::Response(response)) => {
                    if let Some(done) = self.correlator.resolve(response) {
                        self.finish(done);
                    }
                }
                Some(Inbound::Notification(notification)) => {
                    debug!("notification: {notification:?}");
                    let routed = route(notification);
                    let previous_player = self.model.player().player_id;
                    for update in routed.updates {
                        self.apply(update);
                    }
                    // Kodi announces the new player's playlist before the
                    // player starts, while the old playlist is still tracked.
                    let player = self.model.player().player_id;
                    if player != previous_player {
                        debug!(previous_player, player, "active player changed");
                        self.query(Query::PlaylistItems);
                    }
                    match routed.follow_up {
                        Some(FollowUp::RefreshPlayer) => self.query(Query::PlayerProperties),
                        Some(FollowUp::RefetchPlaylist(id)) => self.refetch_playlist(id),
                        None => {}
                    }
                }
                None => {}
            },
            TransportEvent::Closed(reason) => self.connection_closed(reason),
        }
    }

    fn refetch_playlist(&mut self, playlist_id: Option<i64>) {
        let tracked = self.model.player().player_id;
        match playlist_id {
            Some(id) if id != tracked => {
                debug!(id, tracked, "ignoring change to an untracked playlist");
            }
            _ => self.query(Query::PlaylistItems),
        }
    }

    fn connection_closed(&mut self, reason: CloseReason) {
        info!("connection closed: {reason}");
        self.link = None;
        self.fail_pending(RemoteError::ConnectionLost);
        self.player_refresh_pending = false;
        self.apply(ModelUpdate::Connection(ConnectionState::Disconnected));
    }

    fn poll_player(&mut self) {
        if self.link.is_some() && self.model.player().is_player_on && !self.player_refresh_pending {
            self.query(Query::PlayerProperties);
        }
    }

    // ── Model ─────────────────────────────────────────────────────────────────

    fn apply(&mut self, update: ModelUpdate) {
        self.model.apply(update);
        if !self.model.playlist().switching_in_progress() {
            self.switch_deadline = None;
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_if_modified(|current| {
            let next = self.model.snapshot();
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    fn stop(&mut self) {
        self.link = None;
        for waiter in self.connect_waiters.drain(..) {
            let _ = waiter.send(Err(RemoteError::EngineStopped));
        }
        self.fail_pending(RemoteError::EngineStopped);
    }
}

// ── select! helpers ───────────────────────────────────────────────────────────

async fn next_transport_event(link: &mut Option<ActiveLink>) -> TransportEvent {
    match link {
        Some(link) => link.inbound.recv().await.unwrap_or_else(|| {
            TransportEvent::Closed(CloseReason::Error("transport task ended".to_string()))
        }),
        None => pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => pending().await,
    }
}

fn poll_timer(config: &RemoteConfig) -> Option<Interval> {
    if config.poll_interval.is_zero() {
        return None;
    }
    let mut interval = time::interval(config.poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    Some(interval)
}

async fn tick(poll: &mut Option<Interval>) {
    match poll {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending().await,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::transport::MockConnector;
    use std::time::Duration;

    fn quiet_config() -> RemoteConfig {
        RemoteConfig {
            host: "127.0.0.1".to_string(),
            poll_interval: Duration::ZERO,
            ..RemoteConfig::default()
        }
    }

    #[tokio::test]
    async fn test_connect_failure_reports_connection_error() {
        // Arrange: a connector that always refuses
        let mut connector = MockConnector::new();
        connector.expect_connect().times(1).returning(|config| {
            Err(TransportError::Handshake {
                endpoint: config.endpoint_url(),
                reason: "connection refused".to_string(),
            })
        });
        let handle = start(quiet_config(), Arc::new(connector));

        // Act
        let result = handle.connect().await;

        // Assert
        assert!(matches!(result, Err(RemoteError::ConnectionError { .. })));
        assert_eq!(handle.snapshot().connection, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_commands_while_disconnected_fail_fast() {
        let handle = start(quiet_config(), Arc::new(MockConnector::new()));
        assert_eq!(handle.stop().await, Err(RemoteError::NotConnected));
        assert_eq!(handle.jump_to(0).await, Err(RemoteError::NotConnected));
    }

    #[tokio::test]
    async fn test_reconfigure_allowed_while_disconnected() {
        let handle = start(quiet_config(), Arc::new(MockConnector::new()));
        let result = handle.reconfigure(RemoteConfig::for_host("10.0.0.9", 8080)).await;
        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn test_reconfigure_rejects_invalid_config() {
        let handle = start(quiet_config(), Arc::new(MockConnector::new()));
        let result = handle.reconfigure(RemoteConfig::for_host("", 9090)).await;
        assert!(matches!(result, Err(RemoteError::InvalidArgument(_))));
    }

    #[test]
    fn test_query_requests_use_player_id() {
        let (method, params) = Query::PlayerProperties.request(0);
        assert_eq!(method, "Player.GetProperties");
        assert_eq!(params.unwrap()["playerid"], 0);

        let (method, params) = Query::PlaylistItems.request(1);
        assert_eq!(method, "Playlist.GetItems");
        assert_eq!(params.unwrap(), json!({"playlistid": 1, "properties": ["title", "file"]}));
    }
}
