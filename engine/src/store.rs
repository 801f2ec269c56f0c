//! In-memory board state: the single source of UI truth.
//!
//! The tree is only ever replaced wholesale ([`BoardStateStore::install`]) or
//! edited through the optimistic mutation paths. The open-task detail lives
//! beside the tree, not inside it: it is fed by the fine-grained delta
//! stream and deliberately survives full refetches, as does everything else
//! that is not the tree (notifications, cursors).

use plank_types::{Board, ChecklistItem, Column, Comment, EntityId, Label, Task, TaskDetail};

#[derive(Debug, Default)]
pub struct BoardStateStore {
    board: Board,
    open_task: Option<TaskDetail>,
}

impl BoardStateStore {
    #[must_use]
    pub fn new(board: Board) -> Self {
        Self {
            board,
            open_task: None,
        }
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    /// Replace the whole tree with a fresh server snapshot.
    ///
    /// Idempotent and order-insensitive across overlapping refetches:
    /// last fetch wins. Open-task detail is untouched.
    pub fn install(&mut self, board: Board) {
        self.board = board;
    }

    // ------------------------------------------------------------------
    // Open-task detail
    // ------------------------------------------------------------------

    /// Begin tracking sub-entities for a task detail view.
    pub fn open_task(&mut self, task_id: EntityId) -> &mut TaskDetail {
        self.open_task.insert(TaskDetail {
            task_id,
            ..TaskDetail::default()
        })
    }

    pub fn close_task(&mut self) {
        self.open_task = None;
    }

    #[must_use]
    pub fn open_task_detail(&self) -> Option<&TaskDetail> {
        self.open_task.as_ref()
    }

    pub fn open_task_detail_mut(&mut self) -> Option<&mut TaskDetail> {
        self.open_task.as_mut()
    }

    // ------------------------------------------------------------------
    // List access for the mutation paths
    // ------------------------------------------------------------------

    pub fn columns_mut(&mut self) -> &mut Vec<Column> {
        &mut self.board.columns
    }

    pub fn labels_mut(&mut self) -> &mut Vec<Label> {
        &mut self.board.labels
    }

    pub fn column_tasks_mut(&mut self, column_id: &EntityId) -> Option<&mut Vec<Task>> {
        self.board.column_mut(column_id).map(|c| &mut c.tasks)
    }

    pub fn task_mut(&mut self, task_id: &EntityId) -> Option<&mut Task> {
        let (ci, ti) = self.board.find_task(task_id)?;
        Some(&mut self.board.columns[ci].tasks[ti])
    }

    /// Checklist list of the open task, if `task_id` is the open one.
    pub fn open_checklist_mut(&mut self, task_id: &EntityId) -> Option<&mut Vec<ChecklistItem>> {
        self.open_task
            .as_mut()
            .filter(|d| d.task_id == *task_id)
            .map(|d| &mut d.checklist)
    }

    pub fn open_comments_mut(&mut self, task_id: &EntityId) -> Option<&mut Vec<Comment>> {
        self.open_task
            .as_mut()
            .filter(|d| d.task_id == *task_id)
            .map(|d| &mut d.comments)
    }

    // ------------------------------------------------------------------
    // Audits
    // ------------------------------------------------------------------

    /// Number of tasks still carrying a Temporary id. Zero after convergence.
    #[must_use]
    pub fn temporary_task_count(&self) -> usize {
        self.board
            .columns
            .iter()
            .flat_map(|c| &c.tasks)
            .filter(|t| !t.id.is_confirmed())
            .count()
    }

    /// Number of columns still carrying a Temporary id.
    #[must_use]
    pub fn temporary_column_count(&self) -> usize {
        self.board
            .columns
            .iter()
            .filter(|c| !c.id.is_confirmed())
            .count()
    }
}
