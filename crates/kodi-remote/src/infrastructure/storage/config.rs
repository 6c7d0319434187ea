//! TOML persistence for the connection settings.
//!
//! The file lives at the platform-appropriate location:
//! - Windows:  `%APPDATA%\KodiRemote\config.toml`
//! - Linux:    `~/.config/kodi-remote/config.toml`
//! - macOS:    `~/Library/Application Support/KodiRemote/config.toml`
//!
//! ```toml
//! [connection]
//! host = "192.168.0.100"
//! port = 9090
//! username = "kodi"
//! password = ""
//!
//! [engine]
//! request_timeout_ms = 5000
//! switch_grace_ms = 5000
//! poll_interval_ms = 1000
//! ```
//!
//! Every field has a serde default, so a missing file, a missing section, or
//! an older file without newer keys all load to working settings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::RemoteConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// On-disk form of [`RemoteConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoredConfig {
    #[serde(default)]
    pub connection: ConnectionSection,
    #[serde(default)]
    pub engine: EngineSection,
}

/// Where the Kodi server is and how to authenticate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Engine timings, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineSection {
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_switch_grace_ms")]
    pub switch_grace_ms: u64,
    /// `0` disables player polling.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_host() -> String {
    RemoteConfig::default().host
}
fn default_port() -> u16 {
    RemoteConfig::default().port
}
fn default_request_timeout_ms() -> u64 {
    duration_ms(RemoteConfig::default().request_timeout)
}
fn default_switch_grace_ms() -> u64 {
    duration_ms(RemoteConfig::default().switch_grace)
}
fn default_poll_interval_ms() -> u64 {
    duration_ms(RemoteConfig::default().poll_interval)
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: String::new(),
            password: String::new(),
        }
    }
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            switch_grace_ms: default_switch_grace_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl From<&RemoteConfig> for StoredConfig {
    fn from(cfg: &RemoteConfig) -> Self {
        Self {
            connection: ConnectionSection {
                host: cfg.host.clone(),
                port: cfg.port,
                username: cfg.username.clone(),
                password: cfg.password.clone(),
            },
            engine: EngineSection {
                request_timeout_ms: duration_ms(cfg.request_timeout),
                switch_grace_ms: duration_ms(cfg.switch_grace),
                poll_interval_ms: duration_ms(cfg.poll_interval),
            },
        }
    }
}

impl From<StoredConfig> for RemoteConfig {
    fn from(stored: StoredConfig) -> Self {
        Self {
            host: stored.connection.host,
            port: stored.connection.port,
            username: stored.connection.username,
            password: stored.connection.password,
            request_timeout: Duration::from_millis(stored.engine.request_timeout_ms),
            switch_grace: Duration::from_millis(stored.engine.switch_grace_ms),
            poll_interval: Duration::from_millis(stored.engine.poll_interval_ms),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigFileError::NoPlatformConfigDir`] when the base directory
/// cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigFileError> {
    platform_config_dir().ok_or(ConfigFileError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// See [`config_dir`].
pub fn config_file_path() -> Result<PathBuf, ConfigFileError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads settings from the platform config file.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<RemoteConfig, ConfigFileError> {
    load_config_from(&config_file_path()?)
}

/// Loads settings from `path`, returning defaults if the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigFileError::Io`] for file-system errors other than "not
/// found", and [`ConfigFileError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<RemoteConfig, ConfigFileError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let stored: StoredConfig = toml::from_str(&content)?;
            Ok(stored.into())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RemoteConfig::default()),
        Err(source) => Err(ConfigFileError::Io { path: path.to_path_buf(), source }),
    }
}

/// Persists `config` to the platform config file.
///
/// # Errors
///
/// See [`save_config_to`].
pub fn save_config(config: &RemoteConfig) -> Result<PathBuf, ConfigFileError> {
    let path = config_file_path()?;
    save_config_to(&path, config)?;
    Ok(path)
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigFileError::Io`] for file-system failures or
/// [`ConfigFileError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &RemoteConfig) -> Result<(), ConfigFileError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigFileError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(&StoredConfig::from(config))?;
    std::fs::write(path, content).map_err(|source| ConfigFileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("KodiRemote"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("kodi-remote"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("KodiRemote")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
