//! Reconnect supervisor with exponential backoff.
//!
//! The engine itself never reconnects: a transient close leaves it
//! `Disconnected` with its model intact.  Long-running front ends (the
//! `watch` CLI command) run [`supervise`] next to the engine to bring the
//! connection back.
//!
//! ```text
//! connect ──ok──▶ wait until Disconnected ──▶ connect ...
//!    │
//!    └─err──▶ sleep(backoff) ──▶ connect   (backoff doubles up to max_delay)
//! ```

use std::time::Duration;

use tokio::sync::watch;
use tokio::time;
use tracing::{info, warn};

use kodi_remote_core::ConnectionState;

use super::commands::RemoteHandle;
use super::error::RemoteError;

/// Backoff schedule between failed connection attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1).saturating_pow(attempt);
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Keeps `handle` connected until `shutdown` becomes `true`.
///
/// Returns when shutdown is requested or the engine stops.
pub async fn supervise(handle: RemoteHandle, policy: ReconnectPolicy, mut shutdown: watch::Receiver<bool>) {
    let mut snapshots = handle.subscribe();
    let mut attempt: u32 = 0;

    while !*shutdown.borrow() {
        match handle.connect().await {
            Ok(()) => {
                if attempt > 0 {
                    info!("reconnected after {attempt} failed attempt(s)");
                }
                attempt = 0;
                tokio::select! {
                    changed = snapshots.wait_for(|s| s.connection == ConnectionState::Disconnected) => {
                        if changed.is_err() {
                            return;
                        }
                        info!("connection lost; reconnecting");
                    }
                    _ = shutdown.changed() => {}
                }
            }
            Err(RemoteError::EngineStopped) => return,
            Err(e) => {
                let delay = policy.delay_for(attempt);
                attempt = attempt.saturating_add(1);
                warn!("connect attempt {attempt} failed: {e}; retrying in {delay:?}");
                tokio::select! {
                    _ = time::sleep(delay) => {}
                    _ = shutdown.changed() => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_doubles_from_one_second() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(10), Duration::from_secs(30));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_multiplier_of_zero_means_constant_delay() {
        let policy = ReconnectPolicy { multiplier: 0, ..ReconnectPolicy::default() };
        assert_eq!(policy.delay_for(5), Duration::from_secs(1));
    }
}
