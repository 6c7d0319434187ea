//! Guard that suppresses stale "now playing" positions after a playlist jump.
//!
//! After the remote asks Kodi to jump to another playlist item, the server
//! may still report the *previous* item for a moment.  Applying those reports
//! would make the cursor flicker back to the old item.  The guard holds the
//! jump target until the server confirms it.
//!
//! ```text
//!            start_switch(t)
//!   Idle ───────────────────────▶ AwaitingConfirmation(t)
//!    ▲                                  │  observe(i), i != t  → Hold (i recorded)
//!    │  observe(t)          → Apply(t)  │
//!    └──────────────────────────────────┤
//!       grace_timeout()   → Apply(last observed) or Hold
//! ```

/// State of the playlist switch guard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SwitchGuard {
    #[default]
    Idle,
    AwaitingConfirmation {
        target: usize,
        /// Most recent non-matching position reported while waiting.
        last_observed: Option<usize>,
    },
}

/// What the caller should do with the playlist cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Set the current index to this value.
    Apply(usize),
    /// Leave the current index untouched.
    Hold,
}

impl SwitchGuard {
    /// StartSwitch: a jump to `target` was requested.
    pub fn start_switch(&mut self, target: usize) {
        *self = SwitchGuard::AwaitingConfirmation { target, last_observed: None };
    }

    /// ConfirmationReceived (or a stale report): the server says `index` is playing.
    pub fn observe(&mut self, index: usize) -> SwitchOutcome {
        match *self {
            SwitchGuard::Idle => SwitchOutcome::Apply(index),
            SwitchGuard::AwaitingConfirmation { target, .. } if target == index => {
                *self = SwitchGuard::Idle;
                SwitchOutcome::Apply(index)
            }
            SwitchGuard::AwaitingConfirmation { target, .. } => {
                *self = SwitchGuard::AwaitingConfirmation { target, last_observed: Some(index) };
                SwitchOutcome::Hold
            }
        }
    }

    /// GraceTimeout: the confirmation never came.
    ///
    /// The guard is released and the last position the server reported while
    /// waiting, if any, becomes current.
    pub fn grace_timeout(&mut self) -> SwitchOutcome {
        match std::mem::take(self) {
            SwitchGuard::AwaitingConfirmation { last_observed: Some(index), .. } => {
                SwitchOutcome::Apply(index)
            }
            _ => SwitchOutcome::Hold,
        }
    }

    /// Releases the guard if it is still waiting for `target` (the jump failed).
    pub fn abandon(&mut self, target: usize) {
        if self.target() == Some(target) {
            *self = SwitchGuard::Idle;
        }
    }

    pub fn is_switching(&self) -> bool {
        matches!(self, SwitchGuard::AwaitingConfirmation { .. })
    }

    pub fn target(&self) -> Option<usize> {
        match self {
            SwitchGuard::AwaitingConfirmation { target, .. } => Some(*target),
            SwitchGuard::Idle => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_guard_applies_every_observation() {
        let mut guard = SwitchGuard::Idle;
        assert_eq!(guard.observe(4), SwitchOutcome::Apply(4));
        assert!(!guard.is_switching());
    }

    #[test]
    fn test_stale_observation_is_held_and_recorded() {
        // Arrange
        let mut guard = SwitchGuard::default();
        guard.start_switch(3);

        // Act
        let outcome = guard.observe(1);

        // Assert
        assert_eq!(outcome, SwitchOutcome::Hold);
        assert_eq!(
            guard,
            SwitchGuard::AwaitingConfirmation { target: 3, last_observed: Some(1) }
        );
    }

    #[test]
    fn test_matching_observation_confirms_switch() {
        let mut guard = SwitchGuard::default();
        guard.start_switch(3);
        guard.observe(1);

        assert_eq!(guard.observe(3), SwitchOutcome::Apply(3));
        assert_eq!(guard, SwitchGuard::Idle);
    }

    #[test]
    fn test_grace_timeout_applies_last_observed() {
        let mut guard = SwitchGuard::default();
        guard.start_switch(5);
        guard.observe(1);
        guard.observe(2);

        assert_eq!(guard.grace_timeout(), SwitchOutcome::Apply(2));
        assert!(!guard.is_switching());
    }

    #[test]
    fn test_grace_timeout_without_observation_holds() {
        let mut guard = SwitchGuard::default();
        guard.start_switch(5);

        assert_eq!(guard.grace_timeout(), SwitchOutcome::Hold);
        assert_eq!(guard, SwitchGuard::Idle);
    }

    #[test]
    fn test_grace_timeout_on_idle_guard_is_noop() {
        let mut guard = SwitchGuard::Idle;
        assert_eq!(guard.grace_timeout(), SwitchOutcome::Hold);
    }

    #[test]
    fn test_new_switch_replaces_previous_target() {
        let mut guard = SwitchGuard::default();
        guard.start_switch(2);
        guard.start_switch(6);

        assert_eq!(guard.target(), Some(6));
        assert_eq!(guard.observe(2), SwitchOutcome::Hold);
    }

    #[test]
    fn test_abandon_only_releases_matching_target() {
        let mut guard = SwitchGuard::default();
        guard.start_switch(6);

        guard.abandon(2);
        assert!(guard.is_switching(), "a stale failure must not release a newer jump");

        guard.abandon(6);
        assert!(!guard.is_switching());
    }
}
