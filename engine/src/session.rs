//! The board session: one mounted board, one event loop.
//!
//! All state lives on a single owner ([`BoardSession`]) and is only touched
//! from the caller's loop; background work (polling, streams, remote commits)
//! runs on spawned tasks that report back over one mpsc channel. Mutation
//! entry points apply their local splice synchronously before any remote
//! call is issued, so the caller observes the change immediately.
//!
//! Teardown is a flag, not a join: [`BoardSession::close`] aborts the
//! background tasks and marks the session closed, after which every event
//! still in flight is dropped on arrival and every mutation entry point
//! refuses with [`SyncError::SessionClosed`].

use std::path::PathBuf;
use std::time::Duration;

use plank_api::board::{
    ChecklistPatch, ColumnPatch, LabelPatch, NewActivity, NewChecklistItem, NewColumn, NewComment,
    NewLabel, NewTask, TaskPatch,
};
use plank_api::events::TaskStreamEvent;
use plank_api::{ApiClient, ApiError};
use plank_types::{
    ActivityLogEntry, Board, ChecklistItem, Column, Comment, DueRange, EntityId, Identity, Label,
    NotificationItem, Priority, Task,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::bridge::{apply_task_delta, spawn_board_bridge, spawn_task_bridge};
use crate::errors::SyncError;
use crate::identity::TempIdAllocator;
use crate::mutation::{discard, resolve_confirmed, restore, splice_optimistic};
use crate::notifications::NotificationAggregator;
use crate::permissions::{Access, resolve_access};
use crate::poller::spawn_activity_poller;
use crate::reorder::{Location, reorder};
use crate::store::BoardStateStore;

const SESSION_CHANNEL_CAPACITY: usize = 256;

/// Tunables carried from configuration into a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub poll_interval: Duration,
    pub stream_idle_timeout: Duration,
    pub data_dir: PathBuf,
}

/// Everything the background tasks can tell the session.
#[derive(Debug)]
pub enum SessionEvent {
    /// A fresh full snapshot; replaces the tree wholesale.
    BoardFetched(Board),
    /// Something changed remotely; fetch a fresh snapshot.
    RefetchRequested,
    RefetchFailed(ApiError),
    /// The poller saw a new most-recent activity entry.
    ActivityObserved(ActivityLogEntry),
    /// Fine-grained delta for the open task.
    TaskDelta {
        task_id: EntityId,
        event: TaskStreamEvent,
    },
    /// Initial activity history for a freshly opened task.
    TaskActivityFetched {
        task_id: EntityId,
        entries: Vec<ActivityLogEntry>,
    },
    ColumnCommitted {
        temp: EntityId,
        column: Column,
    },
    TaskCommitted {
        temp: EntityId,
        column_id: EntityId,
        task: Task,
    },
    LabelCommitted {
        temp: EntityId,
        label: Label,
    },
    ChecklistCommitted {
        temp: EntityId,
        task_id: EntityId,
        item: ChecklistItem,
    },
    CommentCommitted {
        temp: EntityId,
        task_id: EntityId,
        comment: Comment,
    },
    /// A remote create failed: the optimistic entity is filtered back out.
    CreateFailed {
        target: EntityRef,
        what: String,
        error: ApiError,
    },
    /// A remote update failed: local state may have diverged, so refetch.
    UpdateFailed {
        what: String,
        error: ApiError,
    },
    /// A remote delete failed: the removed entity is reinserted.
    DeleteFailed {
        restore: RestoreEntity,
        what: String,
        error: ApiError,
    },
    /// Order persistence failed after a drag; recovery is a refetch, never a
    /// local inverse move.
    OrderPersistFailed {
        error: ApiError,
    },
}

/// Addresses an optimistic entity for rollback.
#[derive(Debug, Clone)]
pub enum EntityRef {
    Column(EntityId),
    Task {
        column_id: EntityId,
        task_id: EntityId,
    },
    Label(EntityId),
    Checklist {
        task_id: EntityId,
        item_id: EntityId,
    },
    Comment {
        task_id: EntityId,
        comment_id: EntityId,
    },
}

/// A removed entity plus where to put it back.
#[derive(Debug, Clone)]
pub enum RestoreEntity {
    Column {
        index: usize,
        column: Column,
    },
    Task {
        column_id: EntityId,
        index: usize,
        task: Task,
    },
    Label {
        index: usize,
        label: Label,
    },
    Checklist {
        task_id: EntityId,
        index: usize,
        item: ChecklistItem,
    },
    Comment {
        task_id: EntityId,
        index: usize,
        comment: Comment,
    },
}

/// Fields for an optimistic task create.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub tag: String,
    pub priority: Priority,
    pub due: DueRange,
}

pub struct BoardSession {
    api: ApiClient,
    board_id: String,
    viewer: Identity,
    access: Access,
    store: BoardStateStore,
    notifications: NotificationAggregator,
    ids: TempIdAllocator,
    tx: mpsc::Sender<SessionEvent>,
    rx: mpsc::Receiver<SessionEvent>,
    notices: Vec<String>,
    closed: bool,
    stream_idle_timeout: Duration,
    background: Vec<JoinHandle<()>>,
    task_stream: Option<JoinHandle<()>>,
}

impl BoardSession {
    /// Fetch the board, resolve the viewer's access, and start the
    /// background machinery (activity poller, board-updated bridge).
    ///
    /// Fails with [`SyncError::AccessDenied`] when the viewer is not a member
    /// of a private board.
    pub async fn mount(
        api: ApiClient,
        board_id: &str,
        viewer: Identity,
        options: &SessionOptions,
    ) -> Result<Self, SyncError> {
        let board = api.get_board(board_id).await?;
        let access = resolve_access(&board, &viewer);
        if access == Access::Denied {
            return Err(SyncError::AccessDenied);
        }

        let mut notifications = NotificationAggregator::new(&options.data_dir, board_id);
        notifications.load();

        let (tx, rx) = mpsc::channel(SESSION_CHANNEL_CAPACITY);
        let poller = spawn_activity_poller(
            api.clone(),
            board_id.to_string(),
            options.poll_interval,
            tx.clone(),
        );
        let board_events = api.open_board_stream(options.stream_idle_timeout);
        let board_bridge = spawn_board_bridge(board_events, board_id.to_string(), tx.clone());

        Ok(Self {
            api,
            board_id: board_id.to_string(),
            viewer,
            access,
            store: BoardStateStore::new(board),
            notifications,
            ids: TempIdAllocator::new(),
            tx,
            rx,
            notices: Vec::new(),
            closed: false,
            stream_idle_timeout: options.stream_idle_timeout,
            background: vec![poller, board_bridge],
            task_stream: None,
        })
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        self.store.board()
    }

    #[must_use]
    pub fn store(&self) -> &BoardStateStore {
        &self.store
    }

    #[must_use]
    pub fn access(&self) -> Access {
        self.access
    }

    #[must_use]
    pub fn viewer(&self) -> &Identity {
        &self.viewer
    }

    #[must_use]
    pub fn notifications(&self) -> &NotificationAggregator {
        &self.notifications
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// User-facing failure notices accumulated since the last call.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    pub fn mark_notification_read(&mut self, id: &str) {
        self.notifications.mark_read(id);
    }

    pub fn mark_all_notifications_read(&mut self) {
        self.notifications.mark_all_read();
    }

    pub fn clear_notifications(&mut self) {
        self.notifications.clear_all();
    }

    // ------------------------------------------------------------------
    // Event loop
    // ------------------------------------------------------------------

    /// Wait for the next background event. `None` only after all senders
    /// are gone, which cannot happen while the session holds its own `tx`.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }

    /// Non-blocking variant for drain loops in tests and shutdown paths.
    pub fn try_next_event(&mut self) -> Option<SessionEvent> {
        self.rx.try_recv().ok()
    }

    /// Apply every event already queued.
    pub fn drain_events(&mut self) {
        while let Some(event) = self.try_next_event() {
            self.apply(event);
        }
    }

    /// Apply one event to local state. No-op after [`close`](Self::close):
    /// a commit or rollback racing teardown must neither write state nor
    /// persist anything.
    pub fn apply(&mut self, event: SessionEvent) {
        if self.closed {
            tracing::debug!("Dropping session event after close");
            return;
        }

        match event {
            SessionEvent::BoardFetched(board) => self.store.install(board),
            SessionEvent::RefetchRequested => self.request_refetch(),
            SessionEvent::RefetchFailed(error) => {
                tracing::warn!("Board refetch failed: {error}");
                self.notices.push("Couldn't refresh the board.".to_string());
            }
            SessionEvent::ActivityObserved(entry) => {
                self.notifications
                    .record(NotificationItem::from_activity(&entry));
                // The change behind the entry is not in the local tree yet.
                self.request_refetch();
            }
            SessionEvent::TaskDelta { task_id, event } => {
                if let Some(detail) = self
                    .store
                    .open_task_detail_mut()
                    .filter(|d| d.task_id == task_id)
                {
                    apply_task_delta(detail, event);
                }
            }
            SessionEvent::TaskActivityFetched { task_id, entries } => {
                if let Some(detail) = self
                    .store
                    .open_task_detail_mut()
                    .filter(|d| d.task_id == task_id)
                {
                    detail.activity = entries;
                }
            }
            SessionEvent::ColumnCommitted { temp, column } => {
                self.commit_column(&temp, column);
            }
            SessionEvent::TaskCommitted {
                temp,
                column_id,
                task,
            } => {
                // A refetch may have removed the column; the snapshot that
                // removed it is authoritative, so the commit is dropped.
                if let Some(tasks) = self.store.column_tasks_mut(&column_id) {
                    resolve_confirmed(tasks, &temp, task);
                }
            }
            SessionEvent::LabelCommitted { temp, label } => {
                resolve_confirmed(self.store.labels_mut(), &temp, label);
            }
            SessionEvent::ChecklistCommitted {
                temp,
                task_id,
                item,
            } => {
                if let Some(list) = self.store.open_checklist_mut(&task_id) {
                    resolve_confirmed(list, &temp, item);
                }
            }
            SessionEvent::CommentCommitted {
                temp,
                task_id,
                comment,
            } => {
                if let Some(list) = self.store.open_comments_mut(&task_id) {
                    resolve_confirmed(list, &temp, comment);
                }
            }
            SessionEvent::CreateFailed {
                target,
                what,
                error,
            } => {
                tracing::warn!("Create failed for {what}: {error}");
                self.rollback_create(target);
                self.notices
                    .push(format!("Couldn't create {what}; the change was undone."));
            }
            SessionEvent::UpdateFailed { what, error } => {
                tracing::warn!("Update failed for {what}: {error}");
                self.notices
                    .push(format!("Couldn't save changes to {what}; refreshing."));
                self.request_refetch();
            }
            SessionEvent::DeleteFailed {
                restore: entity,
                what,
                error,
            } => {
                tracing::warn!("Delete failed for {what}: {error}");
                self.apply_restore(entity);
                self.notices
                    .push(format!("Couldn't delete {what}; it was restored."));
            }
            SessionEvent::OrderPersistFailed { error } => {
                tracing::warn!("Order persistence failed: {error}");
                self.notices
                    .push("Couldn't save the new task order; refreshing.".to_string());
                self.request_refetch();
            }
        }
    }

    /// Fetch a fresh snapshot in the background. Overlapping requests are
    /// fine: installation is last-fetch-wins.
    pub fn request_refetch(&self) {
        let api = self.api.clone();
        let board_id = self.board_id.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let event = match api.get_board(&board_id).await {
                Ok(board) => SessionEvent::BoardFetched(board),
                Err(error) => SessionEvent::RefetchFailed(error),
            };
            let _ = tx.send(event).await;
        });
    }

    /// Tear the session down. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        for handle in self.background.drain(..) {
            handle.abort();
        }
        if let Some(handle) = self.task_stream.take() {
            handle.abort();
        }
    }

    // ------------------------------------------------------------------
    // Columns
    // ------------------------------------------------------------------

    /// Create a column. An empty (post-trim) title is a silent no-op.
    pub fn create_column(&mut self, title: &str) -> Result<(), SyncError> {
        self.guard_mutation()?;
        let title = title.trim();
        if title.is_empty() {
            return Ok(());
        }

        let temp = self.ids.issue();
        splice_optimistic(
            self.store.columns_mut(),
            Column {
                id: temp.clone(),
                title: title.to_string(),
                ..Column::default()
            },
            None,
        );

        let api = self.api.clone();
        let board_id = self.board_id.clone();
        let tx = self.tx.clone();
        let user = self.viewer.name.clone();
        let title = title.to_string();
        tokio::spawn(async move {
            let payload = NewColumn {
                title: title.clone(),
                color: None,
            };
            match api.create_column(&board_id, &payload).await {
                Ok(column) => {
                    let _ = tx.send(SessionEvent::ColumnCommitted { temp, column }).await;
                    record_activity(
                        &api,
                        &board_id,
                        &user,
                        format!("created list: {title}"),
                        Some(title.clone()),
                    )
                    .await;
                }
                Err(error) => {
                    let _ = tx
                        .send(SessionEvent::CreateFailed {
                            target: EntityRef::Column(temp),
                            what: format!("list \"{title}\""),
                            error,
                        })
                        .await;
                }
            }
        });
        Ok(())
    }

    /// Rename a column, mirroring the new title into its tasks' `status`.
    pub fn rename_column(&mut self, column_id: &EntityId, title: &str) -> Result<(), SyncError> {
        self.guard_mutation()?;
        let title = title.trim();
        if title.is_empty() {
            return Ok(());
        }

        let Some(column) = self.store.board_mut().column_mut(column_id) else {
            return Ok(());
        };
        column.title = title.to_string();
        for task in &mut column.tasks {
            task.status = title.to_string();
        }

        // Still pending confirmation: the rename stays local for now, and
        // the commit handler patches the title once an id exists.
        let Some(remote) = column_id.as_remote().map(String::from) else {
            return Ok(());
        };

        let api = self.api.clone();
        let board_id = self.board_id.clone();
        let tx = self.tx.clone();
        let user = self.viewer.name.clone();
        let title = title.to_string();
        tokio::spawn(async move {
            let patch = ColumnPatch {
                title: Some(title.clone()),
                color: None,
            };
            match api.update_column(&remote, &patch).await {
                Ok(()) => {
                    record_activity(
                        &api,
                        &board_id,
                        &user,
                        format!("renamed list: {title}"),
                        Some(title.clone()),
                    )
                    .await;
                }
                Err(error) => {
                    let _ = tx
                        .send(SessionEvent::UpdateFailed {
                            what: format!("list \"{title}\""),
                            error,
                        })
                        .await;
                }
            }
        });
        Ok(())
    }

    pub fn delete_column(&mut self, column_id: &EntityId) -> Result<(), SyncError> {
        self.guard_mutation()?;
        let Some((index, column)) = discard(self.store.columns_mut(), column_id) else {
            return Ok(());
        };
        // Never confirmed remotely, so the removal is purely local.
        let Some(remote) = column_id.as_remote().map(String::from) else {
            return Ok(());
        };

        let api = self.api.clone();
        let board_id = self.board_id.clone();
        let tx = self.tx.clone();
        let user = self.viewer.name.clone();
        tokio::spawn(async move {
            match api.delete_column(&remote).await {
                Ok(()) => {
                    record_activity(
                        &api,
                        &board_id,
                        &user,
                        format!("deleted list: {}", column.title),
                        Some(column.title.clone()),
                    )
                    .await;
                }
                Err(error) => {
                    let what = format!("list \"{}\"", column.title);
                    let _ = tx
                        .send(SessionEvent::DeleteFailed {
                            restore: RestoreEntity::Column { index, column },
                            what,
                            error,
                        })
                        .await;
                }
            }
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    /// Create a task in a column. An empty (post-trim) title is a silent
    /// no-op. A task created inside a still-unconfirmed column stays
    /// local-only; the next full refetch reconciles it away.
    pub fn create_task(&mut self, column_id: &EntityId, draft: TaskDraft) -> Result<(), SyncError> {
        self.guard_mutation()?;
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Ok(());
        }
        let Some(column) = self.store.board().column(column_id) else {
            return Ok(());
        };
        let status = column.title.clone();

        let temp = self.ids.issue();
        let task = Task {
            id: temp.clone(),
            title: title.clone(),
            tag: draft.tag.trim().to_string(),
            priority: draft.priority,
            status: status.clone(),
            due: draft.due.clone(),
            ..Task::default()
        };
        if let Some(tasks) = self.store.column_tasks_mut(column_id) {
            splice_optimistic(tasks, task, None);
        }

        let Some(remote_column) = column_id.as_remote().map(String::from) else {
            return Ok(());
        };

        let api = self.api.clone();
        let board_id = self.board_id.clone();
        let column_id = column_id.clone();
        let tx = self.tx.clone();
        let user = self.viewer.name.clone();
        tokio::spawn(async move {
            let payload = NewTask {
                title: title.clone(),
                tag: if draft.tag.trim().is_empty() {
                    None
                } else {
                    Some(draft.tag.trim().to_string())
                },
                priority: Some(draft.priority),
                status,
                due_start: draft.due.start,
                due_end: draft.due.end,
            };
            match api.create_task(&remote_column, &payload).await {
                Ok(task) => {
                    let _ = tx
                        .send(SessionEvent::TaskCommitted {
                            temp,
                            column_id,
                            task,
                        })
                        .await;
                    record_activity(
                        &api,
                        &board_id,
                        &user,
                        format!("created task: {title}"),
                        Some(title.clone()),
                    )
                    .await;
                }
                Err(error) => {
                    let _ = tx
                        .send(SessionEvent::CreateFailed {
                            target: EntityRef::Task {
                                column_id,
                                task_id: temp,
                            },
                            what: format!("task \"{title}\""),
                            error,
                        })
                        .await;
                }
            }
        });
        Ok(())
    }

    /// Patch a task's fields. Applied locally first; the remote patch is
    /// skipped entirely while the task is unconfirmed.
    pub fn update_task(&mut self, task_id: &EntityId, patch: TaskPatch) -> Result<(), SyncError> {
        self.guard_mutation()?;
        let Some(task) = self.store.task_mut(task_id) else {
            return Ok(());
        };
        if let Some(title) = &patch.title {
            task.title = title.clone();
        }
        if let Some(tag) = &patch.tag {
            task.tag = tag.clone();
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(status) = &patch.status {
            task.status = status.clone();
        }
        if let Some(assignees) = &patch.assignees {
            task.assignees = assignees.clone();
        }
        if patch.due_start.is_some() {
            task.due.start = patch.due_start;
        }
        if patch.due_end.is_some() {
            task.due.end = patch.due_end;
        }
        let title = task.title.clone();

        let Some(remote) = task_id.as_remote().map(String::from) else {
            return Ok(());
        };
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            if let Err(error) = api.update_task(&remote, &patch).await {
                let _ = tx
                    .send(SessionEvent::UpdateFailed {
                        what: format!("task \"{title}\""),
                        error,
                    })
                    .await;
            }
        });
        Ok(())
    }

    pub fn delete_task(&mut self, task_id: &EntityId) -> Result<(), SyncError> {
        self.guard_mutation()?;
        let Some((ci, _)) = self.store.board().find_task(task_id) else {
            return Ok(());
        };
        let column_id = self.store.board().columns[ci].id.clone();
        let Some((index, task)) = self
            .store
            .column_tasks_mut(&column_id)
            .and_then(|tasks| discard(tasks, task_id))
        else {
            return Ok(());
        };
        let Some(remote) = task_id.as_remote().map(String::from) else {
            return Ok(());
        };

        let api = self.api.clone();
        let board_id = self.board_id.clone();
        let tx = self.tx.clone();
        let user = self.viewer.name.clone();
        tokio::spawn(async move {
            match api.delete_task(&remote).await {
                Ok(()) => {
                    record_activity(
                        &api,
                        &board_id,
                        &user,
                        format!("deleted task: {}", task.title),
                        Some(task.title.clone()),
                    )
                    .await;
                }
                Err(error) => {
                    let what = format!("task \"{}\"", task.title);
                    let _ = tx
                        .send(SessionEvent::DeleteFailed {
                            restore: RestoreEntity::Task {
                                column_id,
                                index,
                                task,
                            },
                            what,
                            error,
                        })
                        .await;
                }
            }
        });
        Ok(())
    }

    /// Drag a task between two locations.
    ///
    /// The local move is synchronous. Persistence ships the destination
    /// column's full confirmed-id order (and the task's new status on a
    /// cross-column move); its failure triggers a refetch rather than an
    /// inverse move. Unconfirmed tasks and columns move locally only.
    pub fn move_task(
        &mut self,
        task_id: &EntityId,
        source: &Location,
        destination: &Location,
    ) -> Result<(), SyncError> {
        self.guard_mutation()?;
        if source == destination {
            return Ok(());
        }
        if let Err(error) = reorder(self.store.board_mut(), task_id, source, destination) {
            tracing::debug!("Stale drag rejected: {error}");
            self.notices
                .push("The board changed while dragging; refreshing.".to_string());
            self.request_refetch();
            return Ok(());
        }

        let Some(remote_task) = task_id.as_remote().map(String::from) else {
            return Ok(());
        };
        let Some(dest_remote) = destination.column.as_remote().map(String::from) else {
            return Ok(());
        };

        let cross_column = source.column != destination.column;
        let board = self.store.board();
        let Some(dest_column) = board.column(&destination.column) else {
            return Ok(());
        };
        let order: Vec<String> = dest_column
            .tasks
            .iter()
            .filter_map(|t| t.id.as_remote().map(String::from))
            .collect();
        let status = dest_column.title.clone();
        let title = dest_column
            .tasks
            .iter()
            .find(|t| t.id == *task_id)
            .map(|t| t.title.clone())
            .unwrap_or_default();
        let source_order: Option<(String, Vec<String>)> = if cross_column {
            board.column(&source.column).and_then(|c| {
                c.id.as_remote().map(|remote| {
                    (
                        remote.to_string(),
                        c.tasks
                            .iter()
                            .filter_map(|t| t.id.as_remote().map(String::from))
                            .collect(),
                    )
                })
            })
        } else {
            None
        };

        let api = self.api.clone();
        let board_id = self.board_id.clone();
        let tx = self.tx.clone();
        let user = self.viewer.name.clone();
        tokio::spawn(async move {
            let result = async {
                if cross_column {
                    let patch = TaskPatch {
                        status: Some(status),
                        ..TaskPatch::default()
                    };
                    api.update_task(&remote_task, &patch).await?;
                    if let Some((src_remote, src_order)) = source_order {
                        api.persist_order(&src_remote, &src_order).await?;
                    }
                }
                api.persist_order(&dest_remote, &order).await
            }
            .await;
            match result {
                Ok(()) => {
                    record_activity(
                        &api,
                        &board_id,
                        &user,
                        format!("moved task: {title}"),
                        Some(title.clone()),
                    )
                    .await;
                }
                Err(error) => {
                    let _ = tx.send(SessionEvent::OrderPersistFailed { error }).await;
                }
            }
        });
        Ok(())
    }

    /// Toggle a member's assignment on a task, cross-mapping the board
    /// membership id to the account id stored on the task.
    pub fn assign_member(
        &mut self,
        task_id: &EntityId,
        membership_id: &EntityId,
    ) -> Result<(), SyncError> {
        self.guard_mutation()?;
        let Some(user_id) = self
            .store
            .board()
            .members
            .iter()
            .find(|m| m.membership_id == *membership_id)
            .map(|m| m.user_id.clone())
        else {
            tracing::debug!("Assignment toggle for unknown membership");
            return Ok(());
        };

        let Some(task) = self.store.task_mut(task_id) else {
            return Ok(());
        };
        if let Some(position) = task.assignees.iter().position(|a| *a == user_id) {
            task.assignees.remove(position);
        } else {
            task.assignees.push(user_id);
        }
        let assignees = task.assignees.clone();
        let title = task.title.clone();

        let Some(remote) = task_id.as_remote().map(String::from) else {
            return Ok(());
        };
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let patch = TaskPatch {
                assignees: Some(assignees),
                ..TaskPatch::default()
            };
            if let Err(error) = api.update_task(&remote, &patch).await {
                let _ = tx
                    .send(SessionEvent::UpdateFailed {
                        what: format!("assignees of \"{title}\""),
                        error,
                    })
                    .await;
            }
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Labels
    // ------------------------------------------------------------------

    pub fn create_label(&mut self, name: &str, color: &str) -> Result<(), SyncError> {
        self.guard_mutation()?;
        let name = name.trim();
        if name.is_empty() {
            return Ok(());
        }

        let temp = self.ids.issue();
        splice_optimistic(
            self.store.labels_mut(),
            Label {
                id: temp.clone(),
                name: name.to_string(),
                color: color.to_string(),
            },
            None,
        );

        let api = self.api.clone();
        let board_id = self.board_id.clone();
        let tx = self.tx.clone();
        let payload = NewLabel {
            name: name.to_string(),
            color: color.to_string(),
        };
        tokio::spawn(async move {
            match api.create_label(&board_id, &payload).await {
                Ok(label) => {
                    let _ = tx.send(SessionEvent::LabelCommitted { temp, label }).await;
                }
                Err(error) => {
                    let _ = tx
                        .send(SessionEvent::CreateFailed {
                            target: EntityRef::Label(temp),
                            what: format!("label \"{}\"", payload.name),
                            error,
                        })
                        .await;
                }
            }
        });
        Ok(())
    }

    pub fn update_label(
        &mut self,
        label_id: &EntityId,
        name: &str,
        color: &str,
    ) -> Result<(), SyncError> {
        self.guard_mutation()?;
        let name = name.trim();
        if name.is_empty() {
            return Ok(());
        }
        let Some(label) = self
            .store
            .labels_mut()
            .iter_mut()
            .find(|l| l.id == *label_id)
        else {
            return Ok(());
        };
        label.name = name.to_string();
        label.color = color.to_string();

        let Some(remote) = label_id.as_remote().map(String::from) else {
            return Ok(());
        };
        let api = self.api.clone();
        let tx = self.tx.clone();
        let patch = LabelPatch {
            name: Some(name.to_string()),
            color: Some(color.to_string()),
        };
        let what = format!("label \"{name}\"");
        tokio::spawn(async move {
            if let Err(error) = api.update_label(&remote, &patch).await {
                let _ = tx.send(SessionEvent::UpdateFailed { what, error }).await;
            }
        });
        Ok(())
    }

    pub fn delete_label(&mut self, label_id: &EntityId) -> Result<(), SyncError> {
        self.guard_mutation()?;
        let Some((index, label)) = discard(self.store.labels_mut(), label_id) else {
            return Ok(());
        };
        let Some(remote) = label_id.as_remote().map(String::from) else {
            return Ok(());
        };

        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            if let Err(error) = api.delete_label(&remote).await {
                let what = format!("label \"{}\"", label.name);
                let _ = tx
                    .send(SessionEvent::DeleteFailed {
                        restore: RestoreEntity::Label { index, label },
                        what,
                        error,
                    })
                    .await;
            }
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Open task detail
    // ------------------------------------------------------------------

    /// Open a task's detail view: start tracking its sub-entities, fetch its
    /// activity history, and attach the fine-grained delta stream.
    ///
    /// Read-only viewers may open tasks; only mutation is gated.
    pub fn open_task(&mut self, task_id: &EntityId) -> Result<(), SyncError> {
        if self.closed {
            return Err(SyncError::SessionClosed);
        }
        if let Some(handle) = self.task_stream.take() {
            handle.abort();
        }
        self.store.open_task(task_id.clone());

        let Some(remote) = task_id.as_remote().map(String::from) else {
            return Ok(());
        };

        let events = self.api.open_task_stream(&remote, self.stream_idle_timeout);
        self.task_stream = Some(spawn_task_bridge(events, task_id.clone(), self.tx.clone()));

        let api = self.api.clone();
        let board_id = self.board_id.clone();
        let tx = self.tx.clone();
        let owner = task_id.clone();
        tokio::spawn(async move {
            match api.get_activities(&board_id, Some(remote.as_str()), None).await {
                Ok(entries) => {
                    let _ = tx
                        .send(SessionEvent::TaskActivityFetched {
                            task_id: owner,
                            entries,
                        })
                        .await;
                }
                Err(e) => tracing::debug!("Task activity fetch failed: {e}"),
            }
        });
        Ok(())
    }

    pub fn close_task(&mut self) {
        if let Some(handle) = self.task_stream.take() {
            handle.abort();
        }
        self.store.close_task();
    }

    /// Add a checklist item to the open task. Empty text is a silent no-op.
    pub fn add_checklist_item(&mut self, task_id: &EntityId, text: &str) -> Result<(), SyncError> {
        self.guard_mutation()?;
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let temp = self.ids.issue();
        let Some(list) = self.store.open_checklist_mut(task_id) else {
            return Ok(());
        };
        list.push(ChecklistItem {
            id: temp.clone(),
            text: text.to_string(),
            done: false,
        });
        if let Some(task) = self.store.task_mut(task_id) {
            task.checklist_count += 1;
        }

        let Some(remote_task) = task_id.as_remote().map(String::from) else {
            return Ok(());
        };
        let api = self.api.clone();
        let tx = self.tx.clone();
        let task_id = task_id.clone();
        let payload = NewChecklistItem {
            text: text.to_string(),
        };
        tokio::spawn(async move {
            match api.create_checklist_item(&remote_task, &payload).await {
                Ok(item) => {
                    let _ = tx
                        .send(SessionEvent::ChecklistCommitted {
                            temp,
                            task_id,
                            item,
                        })
                        .await;
                }
                Err(error) => {
                    let _ = tx
                        .send(SessionEvent::CreateFailed {
                            target: EntityRef::Checklist {
                                task_id,
                                item_id: temp,
                            },
                            what: "checklist item".to_string(),
                            error,
                        })
                        .await;
                }
            }
        });
        Ok(())
    }

    pub fn toggle_checklist_item(
        &mut self,
        task_id: &EntityId,
        item_id: &EntityId,
    ) -> Result<(), SyncError> {
        self.guard_mutation()?;
        let Some(done) = self
            .store
            .open_checklist_mut(task_id)
            .and_then(|list| list.iter_mut().find(|i| i.id == *item_id))
            .map(|item| {
                item.done = !item.done;
                item.done
            })
        else {
            return Ok(());
        };

        let Some(remote) = item_id.as_remote().map(String::from) else {
            return Ok(());
        };
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let patch = ChecklistPatch {
                text: None,
                done: Some(done),
            };
            if let Err(error) = api.update_checklist_item(&remote, &patch).await {
                let _ = tx
                    .send(SessionEvent::UpdateFailed {
                        what: "checklist item".to_string(),
                        error,
                    })
                    .await;
            }
        });
        Ok(())
    }

    pub fn delete_checklist_item(
        &mut self,
        task_id: &EntityId,
        item_id: &EntityId,
    ) -> Result<(), SyncError> {
        self.guard_mutation()?;
        let Some((index, item)) = self
            .store
            .open_checklist_mut(task_id)
            .and_then(|list| discard(list, item_id))
        else {
            return Ok(());
        };
        if let Some(task) = self.store.task_mut(task_id) {
            task.checklist_count = task.checklist_count.saturating_sub(1);
        }
        let Some(remote) = item_id.as_remote().map(String::from) else {
            return Ok(());
        };

        let api = self.api.clone();
        let tx = self.tx.clone();
        let task_id = task_id.clone();
        tokio::spawn(async move {
            if let Err(error) = api.delete_checklist_item(&remote).await {
                let _ = tx
                    .send(SessionEvent::DeleteFailed {
                        restore: RestoreEntity::Checklist {
                            task_id,
                            index,
                            item,
                        },
                        what: "checklist item".to_string(),
                        error,
                    })
                    .await;
            }
        });
        Ok(())
    }

    /// Add a comment to the open task. Empty text is a silent no-op.
    pub fn add_comment(&mut self, task_id: &EntityId, text: &str) -> Result<(), SyncError> {
        self.guard_mutation()?;
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let temp = self.ids.issue();
        let author_id = self.viewer.id.clone();
        let Some(list) = self.store.open_comments_mut(task_id) else {
            return Ok(());
        };
        list.push(Comment {
            id: temp.clone(),
            author_id: author_id.clone(),
            text: text.to_string(),
            created_at: None,
        });
        let title = if let Some(task) = self.store.task_mut(task_id) {
            task.comments_count += 1;
            task.title.clone()
        } else {
            String::new()
        };

        let Some(remote_task) = task_id.as_remote().map(String::from) else {
            return Ok(());
        };
        let api = self.api.clone();
        let board_id = self.board_id.clone();
        let tx = self.tx.clone();
        let user = self.viewer.name.clone();
        let task_id = task_id.clone();
        let payload = NewComment {
            author_id,
            text: text.to_string(),
        };
        tokio::spawn(async move {
            match api.create_comment(&remote_task, &payload).await {
                Ok(comment) => {
                    let _ = tx
                        .send(SessionEvent::CommentCommitted {
                            temp,
                            task_id,
                            comment,
                        })
                        .await;
                    record_activity(
                        &api,
                        &board_id,
                        &user,
                        "added a comment".to_string(),
                        Some(title),
                    )
                    .await;
                }
                Err(error) => {
                    let _ = tx
                        .send(SessionEvent::CreateFailed {
                            target: EntityRef::Comment {
                                task_id,
                                comment_id: temp,
                            },
                            what: "comment".to_string(),
                            error,
                        })
                        .await;
                }
            }
        });
        Ok(())
    }

    pub fn update_comment(
        &mut self,
        task_id: &EntityId,
        comment_id: &EntityId,
        text: &str,
    ) -> Result<(), SyncError> {
        self.guard_mutation()?;
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let Some(comment) = self
            .store
            .open_comments_mut(task_id)
            .and_then(|list| list.iter_mut().find(|c| c.id == *comment_id))
        else {
            return Ok(());
        };
        comment.text = text.to_string();

        let Some(remote) = comment_id.as_remote().map(String::from) else {
            return Ok(());
        };
        let api = self.api.clone();
        let tx = self.tx.clone();
        let text = text.to_string();
        tokio::spawn(async move {
            if let Err(error) = api.update_comment(&remote, &text).await {
                let _ = tx
                    .send(SessionEvent::UpdateFailed {
                        what: "comment".to_string(),
                        error,
                    })
                    .await;
            }
        });
        Ok(())
    }

    pub fn delete_comment(
        &mut self,
        task_id: &EntityId,
        comment_id: &EntityId,
    ) -> Result<(), SyncError> {
        self.guard_mutation()?;
        let Some((index, comment)) = self
            .store
            .open_comments_mut(task_id)
            .and_then(|list| discard(list, comment_id))
        else {
            return Ok(());
        };
        if let Some(task) = self.store.task_mut(task_id) {
            task.comments_count = task.comments_count.saturating_sub(1);
        }
        let Some(remote) = comment_id.as_remote().map(String::from) else {
            return Ok(());
        };

        let api = self.api.clone();
        let tx = self.tx.clone();
        let task_id = task_id.clone();
        tokio::spawn(async move {
            if let Err(error) = api.delete_comment(&remote).await {
                let _ = tx
                    .send(SessionEvent::DeleteFailed {
                        restore: RestoreEntity::Comment {
                            task_id,
                            index,
                            comment,
                        },
                        what: "comment".to_string(),
                        error,
                    })
                    .await;
            }
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Activity
    // ------------------------------------------------------------------

    /// Write an activity entry in the background. Fire-and-forget: failures
    /// are logged, never surfaced, and nothing is rolled back.
    pub fn log_activity(&self, action: String, target: Option<String>) {
        if self.closed {
            return;
        }
        let api = self.api.clone();
        let board_id = self.board_id.clone();
        let user = self.viewer.name.clone();
        tokio::spawn(async move {
            record_activity(&api, &board_id, &user, action, target).await;
        });
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn guard_mutation(&self) -> Result<(), SyncError> {
        if self.closed {
            return Err(SyncError::SessionClosed);
        }
        if !self.access.can_write() {
            return Err(SyncError::PermissionDenied);
        }
        Ok(())
    }

    /// Resolve a committed column create without losing edits made while the
    /// create was in flight: the slot keeps its current title and tasks and
    /// only adopts the confirmed id. A rename that raced the create is then
    /// patched remotely, since the create carried the original title.
    fn commit_column(&mut self, temp: &EntityId, committed: Column) {
        let columns = self.store.columns_mut();
        if columns.iter().any(|c| c.id == committed.id) {
            // A refetch already brought the confirmed column in.
            columns.retain(|c| c.id != *temp);
            return;
        }
        let Some(slot) = columns.iter_mut().find(|c| c.id == *temp) else {
            columns.push(committed);
            return;
        };
        slot.id = committed.id.clone();
        if slot.title == committed.title {
            return;
        }
        let title = slot.title.clone();
        let Some(remote) = committed.id.as_remote().map(String::from) else {
            return;
        };
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let patch = ColumnPatch {
                title: Some(title.clone()),
                color: None,
            };
            if let Err(error) = api.update_column(&remote, &patch).await {
                let _ = tx
                    .send(SessionEvent::UpdateFailed {
                        what: format!("list \"{title}\""),
                        error,
                    })
                    .await;
            }
        });
    }

    fn rollback_create(&mut self, target: EntityRef) {
        match target {
            EntityRef::Column(id) => {
                discard(self.store.columns_mut(), &id);
            }
            EntityRef::Task { column_id, task_id } => {
                if let Some(tasks) = self.store.column_tasks_mut(&column_id) {
                    discard(tasks, &task_id);
                }
            }
            EntityRef::Label(id) => {
                discard(self.store.labels_mut(), &id);
            }
            EntityRef::Checklist { task_id, item_id } => {
                if let Some(list) = self.store.open_checklist_mut(&task_id) {
                    discard(list, &item_id);
                }
                if let Some(task) = self.store.task_mut(&task_id) {
                    task.checklist_count = task.checklist_count.saturating_sub(1);
                }
            }
            EntityRef::Comment {
                task_id,
                comment_id,
            } => {
                if let Some(list) = self.store.open_comments_mut(&task_id) {
                    discard(list, &comment_id);
                }
                if let Some(task) = self.store.task_mut(&task_id) {
                    task.comments_count = task.comments_count.saturating_sub(1);
                }
            }
        }
    }

    fn apply_restore(&mut self, entity: RestoreEntity) {
        match entity {
            RestoreEntity::Column { index, column } => {
                restore(self.store.columns_mut(), index, column);
            }
            RestoreEntity::Task {
                column_id,
                index,
                task,
            } => {
                if let Some(tasks) = self.store.column_tasks_mut(&column_id) {
                    restore(tasks, index, task);
                }
            }
            RestoreEntity::Label { index, label } => {
                restore(self.store.labels_mut(), index, label);
            }
            RestoreEntity::Checklist {
                task_id,
                index,
                item,
            } => {
                if let Some(list) = self.store.open_checklist_mut(&task_id) {
                    restore(list, index, item);
                }
                if let Some(task) = self.store.task_mut(&task_id) {
                    task.checklist_count += 1;
                }
            }
            RestoreEntity::Comment {
                task_id,
                index,
                comment,
            } => {
                if let Some(list) = self.store.open_comments_mut(&task_id) {
                    restore(list, index, comment);
                }
                if let Some(task) = self.store.task_mut(&task_id) {
                    task.comments_count += 1;
                }
            }
        }
    }
}

impl Drop for BoardSession {
    fn drop(&mut self) {
        self.close();
    }
}

async fn record_activity(
    api: &ApiClient,
    board_id: &str,
    user: &str,
    action: String,
    target: Option<String>,
) {
    let activity = NewActivity {
        user: user.to_string(),
        action,
        target,
    };
    if let Err(e) = api.create_activity(board_id, &activity).await {
        tracing::debug!("Activity write failed: {e}");
    }
}
