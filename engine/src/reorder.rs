//! Pure drag-and-drop reordering over the board tree.
//!
//! This step is synchronous and local. Remote persistence of the resulting
//! order is a separate async concern owned by the session; its failure
//! triggers a full refetch, never a local inverse (the local splice has
//! already diverged in ways that are not cleanly invertible).

use plank_types::{Board, EntityId};

/// A drag endpoint: column plus index within that column's task array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub column: EntityId,
    pub index: usize,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReorderError {
    #[error("source column not on this board")]
    UnknownSourceColumn,
    #[error("destination column not on this board")]
    UnknownDestinationColumn,
    #[error("no task at the source location")]
    NoTaskAtSource,
}

/// Move a task between two locations, mirroring `status` on column change.
///
/// No-op (Ok) when source equals destination. The destination index is
/// clamped to the array length, matching what drop targets report at list
/// edges.
pub fn reorder(
    board: &mut Board,
    task_id: &EntityId,
    source: &Location,
    destination: &Location,
) -> Result<(), ReorderError> {
    if source == destination {
        return Ok(());
    }

    if source.column == destination.column {
        let column = board
            .column_mut(&source.column)
            .ok_or(ReorderError::UnknownSourceColumn)?;
        if column.tasks.get(source.index).map(|t| &t.id) != Some(task_id) {
            return Err(ReorderError::NoTaskAtSource);
        }
        let task = column.tasks.remove(source.index);
        let index = destination.index.min(column.tasks.len());
        column.tasks.insert(index, task);
        return Ok(());
    }

    // Cross-column: remove, retitle status, insert.
    if board.column(&destination.column).is_none() {
        return Err(ReorderError::UnknownDestinationColumn);
    }
    let source_column = board
        .column_mut(&source.column)
        .ok_or(ReorderError::UnknownSourceColumn)?;
    if source_column.tasks.get(source.index).map(|t| &t.id) != Some(task_id) {
        return Err(ReorderError::NoTaskAtSource);
    }
    let mut task = source_column.tasks.remove(source.index);

    let destination_column = board
        .column_mut(&destination.column)
        .ok_or(ReorderError::UnknownDestinationColumn)?;
    task.status = destination_column.title.clone();
    let index = destination.index.min(destination_column.tasks.len());
    destination_column.tasks.insert(index, task);
    Ok(())
}
