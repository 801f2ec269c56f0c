//! User-facing notifications derived from activity log entries.
//!
//! Classification is a fixed, ordered substring scan over the free-text
//! `action` field. Order matters: `"created task"` must win over the later
//! rules even though a rename could mention a task, and `"comment"` must be
//! checked before `"moved"`/`"deleted"` so comment edits on moved cards do
//! not misclassify.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ActivityLogEntry;

/// Category of a notification, used for filtering and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Create,
    Update,
    Comment,
    Delete,
    Other,
}

impl NotificationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Create => "create",
            NotificationKind::Update => "update",
            NotificationKind::Comment => "comment",
            NotificationKind::Delete => "delete",
            NotificationKind::Other => "other",
        }
    }
}

/// Classify free-text activity wording into a [`NotificationKind`].
///
/// The rules are ordered; the first matching substring wins.
#[must_use]
pub fn classify_action(action: &str) -> NotificationKind {
    const RULES: &[(&str, NotificationKind)] = &[
        ("created task", NotificationKind::Create),
        ("created list", NotificationKind::Create),
        ("comment", NotificationKind::Comment),
        ("moved", NotificationKind::Update),
        ("deleted", NotificationKind::Delete),
        ("renamed", NotificationKind::Update),
    ];

    let lower = action.to_lowercase();
    RULES
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map_or(NotificationKind::Other, |(_, kind)| *kind)
}

/// One synthesized notification, persisted per board.
///
/// Lives independently of the board tree: refetches and reconciliation never
/// touch the notification list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationItem {
    pub id: String,
    pub user: String,
    pub action: String,
    #[serde(default)]
    pub target: String,
    pub timestamp: DateTime<Utc>,
    pub kind: NotificationKind,
    pub is_read: bool,
}

impl NotificationItem {
    /// Synthesize a notification from an observed activity entry.
    #[must_use]
    pub fn from_activity(entry: &ActivityLogEntry) -> Self {
        Self {
            id: entry.id.clone(),
            user: entry.user.clone(),
            action: entry.action.clone(),
            target: entry.target.clone(),
            timestamp: entry.created_at,
            kind: classify_action(&entry.action),
            is_read: false,
        }
    }
}
