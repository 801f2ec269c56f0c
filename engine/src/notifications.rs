//! Per-board notification history with a two-phase load/save lifecycle.
//!
//! Persistence is one JSON key per board (`notifications_<boardId>.json`)
//! and is completely independent of board refetches: reconciliation never
//! touches this state.
//!
//! The lifecycle guards against clobbering history: saves are suppressed
//! until the load phase has run. Without the gate, a notification arriving
//! during startup would persist a one-element list over the stored history.

use std::path::{Path, PathBuf};

use plank_types::NotificationItem;

use crate::persist;

#[derive(Debug)]
pub struct NotificationAggregator {
    path: PathBuf,
    items: Vec<NotificationItem>,
    loaded: bool,
}

impl NotificationAggregator {
    /// Create an aggregator for one board. Call [`load`](Self::load) before
    /// recording anything; saves are gated until then.
    #[must_use]
    pub fn new(data_dir: &Path, board_id: &str) -> Self {
        Self {
            path: data_dir.join(format!("notifications_{board_id}.json")),
            items: Vec::new(),
            loaded: false,
        }
    }

    /// Phase 1: hydrate from storage. A missing file is an empty history.
    pub fn load(&mut self) {
        match persist::load_json::<Vec<NotificationItem>>(&self.path) {
            Ok(Some(items)) => self.items = items,
            Ok(None) => {}
            Err(e) => {
                // Unreadable history is dropped, not fatal: notifications are
                // derived data and the next activity repopulates them.
                tracing::warn!(path = %self.path.display(), "Failed to load notifications: {e}");
            }
        }
        self.loaded = true;
    }

    /// Phase 2: persist. Strictly gated on the load phase having completed.
    fn save(&self) {
        if !self.loaded {
            tracing::debug!("Notification save suppressed: load phase not complete");
            return;
        }
        if let Err(e) = persist::atomic_write_json(&self.path, &self.items) {
            tracing::warn!(path = %self.path.display(), "Failed to save notifications: {e}");
        }
    }

    /// Record a newly synthesized notification (newest first) and persist.
    pub fn record(&mut self, item: NotificationItem) {
        self.items.insert(0, item);
        self.save();
    }

    #[must_use]
    pub fn items(&self) -> &[NotificationItem] {
        &self.items
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|i| !i.is_read).count()
    }

    pub fn mark_read(&mut self, id: &str) {
        if let Some(item) = self.items.iter_mut().find(|i| i.id == id) {
            item.is_read = true;
            self.save();
        }
    }

    pub fn mark_all_read(&mut self) {
        for item in &mut self.items {
            item.is_read = true;
        }
        self.save();
    }

    /// Drop the in-memory list and purge the persisted key.
    ///
    /// Clearing settles the stored history just as loading does, so the
    /// save gate opens and a later [`load`](Self::load) cannot resurrect
    /// the cleared items.
    pub fn clear_all(&mut self) {
        self.items.clear();
        self.loaded = true;
        if let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %self.path.display(), "Failed to purge notifications: {e}");
        }
    }
}
