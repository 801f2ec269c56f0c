//! Temporary identity issuing.
//!
//! Every optimistic create draws a locally-unique [`EntityId::Temporary`]
//! from the session's allocator. Confirmed replacements happen through the
//! generic resolve path in [`crate::mutation`]; the allocator itself never
//! recycles ids within a session, so a rolled-back create can never collide
//! with a later one.

use plank_types::EntityId;

/// Monotonic allocator for Temporary entity ids. One per board session.
#[derive(Debug, Default)]
pub struct TempIdAllocator {
    next: u64,
}

impl TempIdAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next Temporary id.
    pub fn issue(&mut self) -> EntityId {
        let id = EntityId::Temporary(self.next);
        self.next += 1;
        id
    }
}

/// Whether `id` may be used as a remote reference.
///
/// Anything that is not a Confirmed id is treated as still-pending: the
/// caller keeps the local mutation and skips the remote call.
#[must_use]
pub fn is_confirmable(id: &EntityId) -> bool {
    id.is_confirmed()
}
