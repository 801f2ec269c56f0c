//! Bridges from the push channels into the session event loop.
//!
//! The coarse board stream collapses to "refetch now" signals; the fine
//! per-task stream is forwarded as deltas and applied incrementally by
//! [`apply_task_delta`]. Application is idempotent: the backend may redeliver
//! an event after a reconnect, and a delta can race the echo of the
//! viewer's own optimistic mutation.

use plank_api::events::{BoardStreamEvent, DeletedRef, TaskStreamEvent};
use plank_types::{ChecklistItem, Comment, EntityId, TaskDetail};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::mutation::{Syncable, upsert_by_id};
use crate::session::SessionEvent;

/// Forward coarse board-updated signals for one board as refetch requests.
///
/// Signals for other boards on the same deployment are dropped here.
pub fn spawn_board_bridge(
    mut events: mpsc::Receiver<BoardStreamEvent>,
    board_id: String,
    tx: mpsc::Sender<SessionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                BoardStreamEvent::BoardUpdated { board_id: updated } if updated == board_id => {
                    if tx.send(SessionEvent::RefetchRequested).await.is_err() {
                        return;
                    }
                }
                BoardStreamEvent::BoardUpdated { .. } | BoardStreamEvent::Unknown => {}
            }
        }
    })
}

/// Forward fine-grained deltas for one open task into the session.
pub fn spawn_task_bridge(
    mut events: mpsc::Receiver<TaskStreamEvent>,
    task_id: EntityId,
    tx: mpsc::Sender<SessionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let delta = SessionEvent::TaskDelta {
                task_id: task_id.clone(),
                event,
            };
            if tx.send(delta).await.is_err() {
                return;
            }
        }
    })
}

/// Apply one stream delta to an open task detail. Pure and idempotent.
pub fn apply_task_delta(detail: &mut TaskDetail, event: TaskStreamEvent) {
    match event {
        TaskStreamEvent::ChecklistCreated(dto) => {
            let item = dto.into_model();
            if !is_duplicate_create(&detail.checklist, &item.id, &item.text) {
                detail.checklist.push(item);
            }
        }
        TaskStreamEvent::ChecklistUpdated(dto) => {
            upsert_by_id(&mut detail.checklist, dto.into_model());
        }
        TaskStreamEvent::ChecklistDeleted(DeletedRef { id }) => {
            detail.checklist.retain(|i| !i.id.matches_remote(&id));
        }
        TaskStreamEvent::CommentCreated(dto) => {
            let comment = dto.into_model();
            if !is_duplicate_create(&detail.comments, &comment.id, &comment.text) {
                detail.comments.push(comment);
            }
        }
        TaskStreamEvent::CommentUpdated(dto) => {
            upsert_by_id(&mut detail.comments, dto.into_model());
        }
        TaskStreamEvent::CommentDeleted(DeletedRef { id }) => {
            detail.comments.retain(|c| !c.id.matches_remote(&id));
        }
        TaskStreamEvent::ActivityCreated(entry) => {
            if !detail.activity.iter().any(|a| a.id == entry.id) {
                detail.activity.push(entry);
            }
        }
        TaskStreamEvent::Unknown => {}
    }
}

/// A stream create is a duplicate when the id is already present (redelivery)
/// or when a still-Temporary local entry carries the same trimmed text (the
/// echo of the viewer's own optimistic add, racing its confirmation).
fn is_duplicate_create<T>(list: &[T], id: &EntityId, text: &str) -> bool
where
    T: Syncable + HasText,
{
    list.iter().any(|entry| {
        entry.entity_id() == id
            || (!entry.entity_id().is_confirmed() && entry.text().trim() == text.trim())
    })
}

trait HasText {
    fn text(&self) -> &str;
}

impl HasText for ChecklistItem {
    fn text(&self) -> &str {
        &self.text
    }
}

impl HasText for Comment {
    fn text(&self) -> &str {
        &self.text
    }
}
