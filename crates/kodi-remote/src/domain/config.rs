//! Engine configuration.
//!
//! [`RemoteConfig`] carries everything the engine needs to reach a Kodi
//! server plus the timing knobs of the synchronization loop.  It is a plain
//! struct: the infrastructure layer fills it from the TOML file and the CLI,
//! and the engine only ever reads it.

use std::time::Duration;

use thiserror::Error;

/// Path of Kodi's JSON-RPC WebSocket endpoint.
pub const JSONRPC_PATH: &str = "/jsonrpc";

/// A setting the engine cannot work with.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("host must not be empty")]
    EmptyHost,
    #[error("port must not be 0")]
    ZeroPort,
    #[error("request timeout must be positive")]
    ZeroRequestTimeout,
}

/// Connection and timing settings for one engine.
///
/// # Example
///
/// ```rust
/// use kodi_remote::domain::RemoteConfig;
///
/// let cfg = RemoteConfig::default();
/// assert_eq!(cfg.port, 9090);
/// assert_eq!(cfg.endpoint_url(), "ws://192.168.0.100:9090/jsonrpc");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Hostname or IP address of the Kodi machine.
    pub host: String,
    /// Kodi's WebSocket (TCP) port.
    pub port: u16,
    /// Web server user name; empty means no credentials are sent.
    pub username: String,
    pub password: String,
    /// How long a call may stay unanswered before it fails with `RpcTimeout`.
    pub request_timeout: Duration,
    /// How long a playlist jump waits for the server to confirm it.
    pub switch_grace: Duration,
    /// Player-properties poll period while something is playing.
    /// `Duration::ZERO` disables polling.
    pub poll_interval: Duration,
}

impl Default for RemoteConfig {
    /// | Field           | Default           |
    /// |-----------------|-------------------|
    /// | host            | `192.168.0.100`   |
    /// | port            | `9090`            |
    /// | username        | empty             |
    /// | password        | empty             |
    /// | request_timeout | 5 seconds         |
    /// | switch_grace    | 5 seconds         |
    /// | poll_interval   | 1 second          |
    fn default() -> Self {
        Self {
            host: "192.168.0.100".to_string(),
            port: 9090,
            username: String::new(),
            password: String::new(),
            request_timeout: Duration::from_secs(5),
            switch_grace: Duration::from_secs(5),
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl RemoteConfig {
    /// Builds a config for `host:port` with default credentials and timings.
    pub fn for_host(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// The WebSocket URL of the JSON-RPC endpoint.
    pub fn endpoint_url(&self) -> String {
        format!("ws://{}:{}{}", self.host, self.port, JSONRPC_PATH)
    }

    /// True when the handshake should carry HTTP Basic credentials.
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }

    /// Rejects settings the engine cannot work with.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroRequestTimeout);
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_host_and_port() {
        // Arrange / Act
        let cfg = RemoteConfig::default();
        // Assert
        assert_eq!(cfg.host, "192.168.0.100");
        assert_eq!(cfg.port, 9090);
    }

    #[test]
    fn test_default_has_no_credentials() {
        let cfg = RemoteConfig::default();
        assert!(cfg.username.is_empty());
        assert!(cfg.password.is_empty());
        assert!(!cfg.has_credentials());
    }

    #[test]
    fn test_default_timings() {
        let cfg = RemoteConfig::default();
        assert_eq!(cfg.request_timeout, Duration::from_secs(5));
        assert_eq!(cfg.switch_grace, Duration::from_secs(5));
        assert_eq!(cfg.poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_endpoint_url_uses_jsonrpc_path() {
        let cfg = RemoteConfig::for_host("htpc.local", 9999);
        assert_eq!(cfg.endpoint_url(), "ws://htpc.local:9999/jsonrpc");
    }

    #[test]
    fn test_validate_rejects_empty_host() {
        let cfg = RemoteConfig::for_host("  ", 9090);
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyHost));
    }

    #[test]
    fn test_validate_rejects_port_zero() {
        let cfg = RemoteConfig::for_host("10.0.0.2", 0);
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroPort));
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(RemoteConfig::default().validate().is_ok());
    }
}
