//! Core domain types for plank.
//!
//! This crate contains pure domain types with no IO, no async, and minimal
//! dependencies. Everything here can be used from any layer of the client:
//! the in-memory board tree, the two-space member identity model, activity
//! log entries, and the notification classifier.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod ids;
mod notification;

pub use ids::EntityId;
pub use notification::{NotificationItem, NotificationKind, classify_action};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Board tree
// ============================================================================

/// Board visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

/// A board: the root of the local state tree.
///
/// `activities` is append-only and time-ordered; consumers advance through it
/// with a monotonic cursor (the last seen activity id), never an index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Board {
    pub id: EntityId,
    pub name: String,
    pub visibility: Visibility,
    pub members: Vec<Member>,
    pub labels: Vec<Label>,
    pub columns: Vec<Column>,
    pub activities: Vec<ActivityLogEntry>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Board {
    #[must_use]
    pub fn column(&self, id: &EntityId) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == *id)
    }

    pub fn column_mut(&mut self, id: &EntityId) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.id == *id)
    }

    /// Locate a task anywhere on the board along with its owning column index.
    #[must_use]
    pub fn find_task(&self, id: &EntityId) -> Option<(usize, usize)> {
        self.columns.iter().enumerate().find_map(|(ci, col)| {
            col.tasks
                .iter()
                .position(|t| t.id == *id)
                .map(|ti| (ci, ti))
        })
    }
}

/// An ordered column of tasks. Position in `tasks` is the only ordering
/// signal; there is no explicit index field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Column {
    pub id: EntityId,
    pub title: String,
    pub color: String,
    pub tasks: Vec<Task>,
}

/// A task card.
///
/// `status` is a denormalized copy of the owning column's title and must be
/// kept consistent on every move. `assignees` holds account/user ids, not
/// board-membership ids.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Task {
    pub id: EntityId,
    pub title: String,
    pub tag: String,
    pub priority: Priority,
    pub status: String,
    pub assignees: Vec<String>,
    pub due: DueRange,
    pub checklist_count: u32,
    pub comments_count: u32,
    pub attachments_count: u32,
}

impl Task {
    /// Display color for this task's tag, derived from a stable palette hash.
    #[must_use]
    pub fn tag_color(&self) -> &'static str {
        tag_color(&self.tag)
    }
}

/// Optional due-date range on a task.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DueRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// A board label.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Label {
    pub id: EntityId,
    pub name: String,
    pub color: String,
}

/// A checklist item on an open task.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChecklistItem {
    pub id: EntityId,
    pub text: String,
    pub done: bool,
}

/// A comment on an open task.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Comment {
    pub id: EntityId,
    pub author_id: String,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Sub-entities of the task currently open in a detail view.
///
/// These lists are fed incrementally by the per-task delta stream; the rest
/// of the board tree is only replaced wholesale by refetches.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskDetail {
    pub task_id: EntityId,
    pub checklist: Vec<ChecklistItem>,
    pub comments: Vec<Comment>,
    pub activity: Vec<ActivityLogEntry>,
}

// ============================================================================
// Membership & identity
// ============================================================================

/// Role of a board member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Editor,
    Viewer,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }

    #[must_use]
    pub fn can_edit(self) -> bool {
        matches!(self, Role::Owner | Role::Editor)
    }
}

/// A board membership record.
///
/// Memberships live in their own identity space: `membership_id` identifies
/// the membership row, `user_id` identifies the account. Task assignment
/// stores account ids, so assignment paths must cross-map explicitly via
/// [`Member::user_id`].
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub membership_id: EntityId,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// The authenticated viewer, as supplied by the identity source.
///
/// Only used for permission matching against the board member list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub email: String,
}

// ============================================================================
// Activity log
// ============================================================================

/// One entry of a board's append-only activity log.
///
/// `action` is free text written by clients (e.g. `"created task: Design
/// mockups"`); the notification classifier keys off substrings of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    pub id: String,
    pub user: String,
    pub action: String,
    #[serde(default)]
    pub target: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Tag colors
// ============================================================================

const TAG_PALETTE: &[&str] = &[
    "#e06c75", "#d19a66", "#e5c07b", "#98c379", "#56b6c2", "#61afef", "#c678dd",
];

/// Stable display color for a tag.
///
/// Same tag, same color, on every client; uses a small FNV-1a over the tag
/// text rather than anything order-dependent.
#[must_use]
pub fn tag_color(tag: &str) -> &'static str {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in tag.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    TAG_PALETTE[(hash % TAG_PALETTE.len() as u64) as usize]
}
