//! The generic optimistic-mutation pattern.
//!
//! Every create/update/delete across every entity kind (task, column, label,
//! checklist item, comment) goes through the same three operations on an
//! id-keyed list:
//!
//! 1. [`splice_optimistic`] - insert the locally-built entity immediately
//! 2. [`resolve_confirmed`] - on remote success, swap the Temporary entity
//!    for the Confirmed one at the same structural position
//! 3. [`discard`] - on remote failure, filter the optimistic entity back out
//!
//! Resolution is idempotent by construction: if a concurrent full refetch
//! already installed the Confirmed entity, the Temporary one is gone and the
//! incoming entity either matches an existing Confirmed id (dropped) or is
//! appended. Delivering the same confirmation twice therefore converges to
//! one entity.

use plank_types::{ChecklistItem, Column, Comment, EntityId, Label, Task};

/// An entity that participates in optimistic synchronization.
pub trait Syncable {
    fn entity_id(&self) -> &EntityId;
}

macro_rules! impl_syncable {
    ($($ty:ty),+) => {$(
        impl Syncable for $ty {
            fn entity_id(&self) -> &EntityId {
                &self.id
            }
        }
    )+};
}

impl_syncable!(Task, Column, Label, ChecklistItem, Comment);

/// Insert an optimistic entity, at `index` if given (clamped), else at the end.
pub fn splice_optimistic<T: Syncable>(list: &mut Vec<T>, entity: T, index: Option<usize>) {
    match index {
        Some(index) => {
            let index = index.min(list.len());
            list.insert(index, entity);
        }
        None => list.push(entity),
    }
}

/// Replace the entity carrying `temp` with its Confirmed counterpart.
///
/// Fallbacks, in order: an entity already carrying the confirmed id absorbs
/// the delivery (duplicate or refetch raced ahead); otherwise the confirmed
/// entity is appended. Never errors.
pub fn resolve_confirmed<T: Syncable>(list: &mut Vec<T>, temp: &EntityId, confirmed: T) {
    if let Some(slot) = list.iter_mut().find(|e| e.entity_id() == temp) {
        *slot = confirmed;
        return;
    }
    if list
        .iter()
        .any(|e| e.entity_id() == confirmed.entity_id())
    {
        return;
    }
    list.push(confirmed);
}

/// Remove the entity carrying `id`, restoring the pre-optimistic state.
///
/// Returns the removed entity (with its position) so delete paths can restore
/// it if the remote call fails.
pub fn discard<T: Syncable>(list: &mut Vec<T>, id: &EntityId) -> Option<(usize, T)> {
    let index = list.iter().position(|e| e.entity_id() == id)?;
    Some((index, list.remove(index)))
}

/// Restore a previously removed entity at its old position (clamped).
pub fn restore<T: Syncable>(list: &mut Vec<T>, index: usize, entity: T) {
    let index = index.min(list.len());
    list.insert(index, entity);
}

/// Upsert by confirmed id: replace in place, or append when absent.
///
/// Used by the fine-grained delta channel for `*:updated` events that may
/// arrive before or after the entity exists locally.
pub fn upsert_by_id<T: Syncable>(list: &mut Vec<T>, entity: T) {
    if let Some(slot) = list
        .iter_mut()
        .find(|e| e.entity_id() == entity.entity_id())
    {
        *slot = entity;
        return;
    }
    list.push(entity);
}
