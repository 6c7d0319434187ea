//! kodi-remote: command-line front end for the Kodi remote engine.
//!
//! Each invocation starts an engine, connects to Kodi, runs one command and
//! disconnects.  `watch` instead stays connected (reconnecting with backoff)
//! and prints a status line whenever the player or playlist changes.
//!
//! # Usage
//!
//! ```text
//! kodi-remote [OPTIONS] <COMMAND>
//!
//! Commands:
//!   status, watch
//!   up, down, left, right, select, back, menu, info, home, text <TEXT>
//!   play-pause, play, pause, stop, seek <PCT>, speed <N>, jump <INDEX>, next
//!   volume <LEVEL>, mute
//!   config show | save | path
//! ```
//!
//! # Settings precedence
//!
//! CLI flags and environment variables override the config file, which
//! overrides the built-in defaults.
//!
//! | Variable             | Flag                   | Default          |
//! |----------------------|------------------------|------------------|
//! | `KODI_HOST`          | `--host`               | `192.168.0.100`  |
//! | `KODI_PORT`          | `--port`               | `9090`           |
//! | `KODI_USERNAME`      | `--username`           | empty            |
//! | `KODI_PASSWORD`      | `--password`           | empty            |
//! | `KODI_REMOTE_CONFIG` | `--config`             | platform path    |

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::sync::watch;
use tokio::time;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use kodi_remote::application::{self, supervise, PendingReply, ReconnectPolicy, RemoteHandle};
use kodi_remote::domain::{RemoteConfig, Snapshot};
use kodi_remote::infrastructure::storage::config::{
    self as config_file, ConfigFileError, StoredConfig,
};
use kodi_remote::infrastructure::transport::WebSocketConnector;

/// How long `status` waits for the initial sync to go quiet.
const SETTLE_QUIET: Duration = Duration::from_millis(300);

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Remote control for Kodi over its JSON-RPC WebSocket API.
#[derive(Debug, Parser)]
#[command(name = "kodi-remote", about = "Remote control for Kodi media center", version)]
struct Cli {
    /// Hostname or IP address of the Kodi machine.
    #[arg(long, env = "KODI_HOST")]
    host: Option<String>,

    /// Kodi's JSON-RPC WebSocket port.
    #[arg(long, env = "KODI_PORT")]
    port: Option<u16>,

    /// Web server user name.
    #[arg(long, env = "KODI_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "KODI_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Config file to use instead of the platform default.
    #[arg(long, env = "KODI_REMOTE_CONFIG")]
    config: Option<PathBuf>,

    /// Request timeout in milliseconds.
    #[arg(long)]
    request_timeout_ms: Option<u64>,

    /// How long a playlist jump waits for confirmation, in milliseconds.
    #[arg(long)]
    switch_grace_ms: Option<u64>,

    /// Player poll period in milliseconds; 0 disables polling.
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
enum Command {
    /// Print the player and playlist state once.
    Status,
    /// Stay connected and print state changes until Ctrl+C.
    Watch,
    Up,
    Down,
    Left,
    Right,
    Select,
    Back,
    /// Open the context menu.
    Menu,
    Info,
    Home,
    /// Send text to the focused input field.
    Text { text: String },
    /// Toggle between playing and paused.
    PlayPause,
    Play,
    Pause,
    Stop,
    /// Seek to a percentage (0-100) of the current item.
    Seek { percentage: f64 },
    /// Set the playback speed (-32..=32, a power of two or 0).
    Speed {
        #[arg(allow_negative_numbers = true)]
        speed: i32,
    },
    /// Jump to a playlist position (0-based).
    Jump { index: usize },
    /// Skip to the next playlist item.
    Next,
    /// Set the volume (0-100).
    Volume {
        #[arg(allow_negative_numbers = true)]
        level: i32,
    },
    /// Toggle mute.
    Mute,
    /// Inspect or persist the effective settings.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum ConfigAction {
    /// Print the effective settings as TOML (password masked).
    Show,
    /// Write the effective settings to the config file.
    Save,
    /// Print the config file location.
    Path,
}

impl Cli {
    /// Overlays flags and environment variables on `base`.
    ///
    /// The result is not validated: `config show` and `config path` must work
    /// even when a setting is unusable.
    fn resolve_config(&self, base: RemoteConfig) -> RemoteConfig {
        let mut cfg = base;
        if let Some(host) = &self.host {
            cfg.host = host.clone();
        }
        if let Some(port) = self.port {
            cfg.port = port;
        }
        if let Some(username) = &self.username {
            cfg.username = username.clone();
        }
        if let Some(password) = &self.password {
            cfg.password = password.clone();
        }
        if let Some(ms) = self.request_timeout_ms {
            cfg.request_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.switch_grace_ms {
            cfg.switch_grace = Duration::from_millis(ms);
        }
        if let Some(ms) = self.poll_interval_ms {
            cfg.poll_interval = Duration::from_millis(ms);
        }
        cfg
    }

    fn config_path(&self) -> Result<PathBuf, ConfigFileError> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => config_file::config_file_path(),
        }
    }

    /// Settings from the config file, or defaults when there is no file.
    fn load_base_config(&self) -> anyhow::Result<RemoteConfig> {
        match self.config_path() {
            Ok(path) => config_file::load_config_from(&path)
                .with_context(|| format!("failed to load {}", path.display())),
            Err(ConfigFileError::NoPlatformConfigDir) => Ok(RemoteConfig::default()),
            Err(e) => Err(e.into()),
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output on stdout stays scriptable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.resolve_config(cli.load_base_config()?);

    if let Command::Config { action } = &cli.command {
        return run_config_action(&cli, *action, &config);
    }
    config.validate().context("invalid settings")?;

    info!("using Kodi endpoint {}", config.endpoint_url());
    let handle = application::start(config.clone(), Arc::new(WebSocketConnector::new()));

    if cli.command == Command::Watch {
        return run_watch(handle).await;
    }

    handle
        .connect()
        .await
        .with_context(|| format!("could not reach Kodi at {}", config.endpoint_url()))?;

    let outcome = run_command(&handle, &cli.command, config.request_timeout).await;
    if let Err(e) = handle.disconnect().await {
        error!("disconnect failed: {e}");
    }
    outcome
}

async fn run_command(
    handle: &RemoteHandle,
    command: &Command,
    request_timeout: Duration,
) -> anyhow::Result<()> {
    let reply: PendingReply<Value> = match command {
        Command::Status => {
            let mut snapshots = handle.subscribe();
            settle(&mut snapshots, request_timeout).await;
            println!("{}", describe(&handle.snapshot()));
            return Ok(());
        }
        Command::Up => handle.up(),
        Command::Down => handle.down(),
        Command::Left => handle.left(),
        Command::Right => handle.right(),
        Command::Select => handle.select(),
        Command::Back => handle.back(),
        Command::Menu => handle.menu(),
        Command::Info => handle.info(),
        Command::Home => handle.home(),
        Command::Text { text } => handle.send_text(text.clone()),
        Command::PlayPause => handle.play_pause(),
        Command::Play => handle.play(),
        Command::Pause => handle.pause(),
        Command::Stop => handle.stop(),
        Command::Seek { percentage } => handle.seek(*percentage),
        Command::Speed { speed } => handle.set_speed(*speed),
        Command::Jump { index } => {
            // Playlist indices are only known after the initial sync.
            let mut snapshots = handle.subscribe();
            settle(&mut snapshots, request_timeout).await;
            handle.jump_to(*index)
        }
        Command::Next => handle.next_item(),
        Command::Volume { level } => handle.set_volume(*level),
        Command::Mute => handle.toggle_mute(),
        Command::Watch | Command::Config { .. } => return Ok(()),
    };

    let result = reply.await?;
    println!("{result}");
    Ok(())
}

/// Waits until the snapshot stops changing for [`SETTLE_QUIET`], or `limit`.
async fn settle(snapshots: &mut watch::Receiver<Snapshot>, limit: Duration) {
    let deadline = time::Instant::now() + limit;
    loop {
        let quiet_until = (time::Instant::now() + SETTLE_QUIET).min(deadline);
        match time::timeout_at(quiet_until, snapshots.changed()).await {
            Ok(Ok(())) if time::Instant::now() < deadline => continue,
            _ => return,
        }
    }
}

async fn run_watch(handle: RemoteHandle) -> anyhow::Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let supervisor = tokio::spawn(supervise(handle.clone(), ReconnectPolicy::default(), shutdown_rx));

    let mut snapshots = handle.subscribe();
    let mut last_line = String::new();
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    error!("failed to listen for Ctrl+C signal: {e}");
                }
                info!("received Ctrl+C; shutting down");
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let line = describe(&snapshots.borrow_and_update());
                if line != last_line {
                    println!("{line}");
                    last_line = line;
                }
            }
        }
    }

    let _ = shutdown_tx.send(true);
    if let Err(e) = handle.disconnect().await {
        error!("disconnect failed: {e}");
    }
    supervisor.await.context("reconnect supervisor panicked")?;
    Ok(())
}

fn run_config_action(cli: &Cli, action: ConfigAction, config: &RemoteConfig) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let mut stored = StoredConfig::from(config);
            if !stored.connection.password.is_empty() {
                stored.connection.password = "********".to_string();
            }
            print!("{}", toml::to_string_pretty(&stored)?);
        }
        ConfigAction::Save => {
            config.validate().context("refusing to save invalid settings")?;
            let path = cli.config_path()?;
            config_file::save_config_to(&path, config)?;
            println!("saved {}", path.display());
        }
        ConfigAction::Path => println!("{}", cli.config_path()?.display()),
    }
    Ok(())
}

/// One-line human summary of a snapshot.
fn describe(snapshot: &Snapshot) -> String {
    if !snapshot.is_connected() {
        return format!("{:?}", snapshot.connection).to_lowercase();
    }

    let mut line = if !snapshot.is_player_on() {
        "idle".to_string()
    } else {
        let state = if snapshot.is_playing() { "playing" } else { "paused" };
        let mut s = format!("{state} {}/{}", snapshot.elapsed_time(), snapshot.total_time());
        if snapshot.speed() != 0 && snapshot.speed() != 1 {
            s.push_str(&format!(" x{}", snapshot.speed()));
        }
        s
    };

    if let (Some(index), Some(title)) = (snapshot.current_index(), snapshot.current_item_title()) {
        line.push_str(&format!(
            " [{}/{}] {title}",
            index + 1,
            snapshot.playlist_items().len()
        ));
    }
    if snapshot.switching_in_progress() {
        line.push_str(" (switching)");
    }

    let volume = if snapshot.is_muted() {
        "muted".to_string()
    } else {
        format!("vol {}", snapshot.volume())
    };
    format!("{line} | {volume}")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
