//! Playlist mirror: ordered items, the now-playing cursor, and the switch guard.

use super::switching::{SwitchGuard, SwitchOutcome};

/// One entry of the play queue.  Insertion order is playback order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistItem {
    pub title: String,
    /// Opaque source reference (Kodi's `file` member).
    pub source: String,
}

impl PlaylistItem {
    pub fn new(title: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source: source.into(),
        }
    }
}

/// Playlist contents plus cursor.
///
/// `current_index` is always `< items.len()` when `items` is non-empty and is
/// meaningless (kept at 0) when the playlist is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistState {
    items: Vec<PlaylistItem>,
    current_index: usize,
    guard: SwitchGuard,
    /// A server position that was past the end when it arrived.
    deferred_position: Option<usize>,
}

impl PlaylistState {
    pub fn items(&self) -> &[PlaylistItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The now-playing index, `None` for an empty playlist.
    pub fn current_index(&self) -> Option<usize> {
        (!self.items.is_empty()).then_some(self.current_index)
    }

    pub fn current_item(&self) -> Option<&PlaylistItem> {
        self.current_index().and_then(|i| self.items.get(i))
    }

    pub fn guard(&self) -> SwitchGuard {
        self.guard
    }

    pub fn switching_in_progress(&self) -> bool {
        self.guard.is_switching()
    }

    /// Replaces the whole item list in one step.
    ///
    /// The cursor survives when it is still in range, otherwise it resets to 0.
    /// A position the server reported before the items arrived takes
    /// precedence when the new list covers it.
    pub(crate) fn replace_items(&mut self, items: Vec<PlaylistItem>) {
        self.items = items;
        if let Some(position) = self.deferred_position.take() {
            if position < self.items.len() {
                self.current_index = position;
            }
        }
        if self.current_index >= self.items.len() {
            self.current_index = 0;
        }
    }

    pub(crate) fn start_switch(&mut self, target: usize) {
        self.guard.start_switch(target);
    }

    pub(crate) fn abandon_switch(&mut self, target: usize) {
        self.guard.abandon(target);
    }

    /// Feeds a server-reported now-playing position through the guard.
    pub(crate) fn observe_now_playing(&mut self, index: usize) {
        let outcome = self.guard.observe(index);
        self.apply_outcome(outcome);
    }

    pub(crate) fn grace_elapsed(&mut self) {
        let outcome = self.guard.grace_timeout();
        self.apply_outcome(outcome);
    }

    fn apply_outcome(&mut self, outcome: SwitchOutcome) {
        match outcome {
            // Positions past the end can arrive before the re-fetch lands;
            // the cursor only moves to indices that exist.
            SwitchOutcome::Apply(index) if index < self.items.len() => {
                self.current_index = index;
                self.deferred_position = None;
            }
            SwitchOutcome::Apply(index) => {
                tracing::debug!("now-playing position {index} outside playlist of {}", self.items.len());
                self.deferred_position = Some(index);
            }
            SwitchOutcome::Hold => {}
        }
    }
}
