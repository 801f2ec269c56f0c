use std::fmt;

/// Identity of a board entity (column, task, label, checklist item, comment).
///
/// Entities created optimistically carry a [`EntityId::Temporary`] id until the
/// remote store acknowledges the create. A Temporary id is never a valid remote
/// reference: every "update by id" path must check [`EntityId::is_confirmed`]
/// (or take the [`EntityId::as_remote`] accessor) before issuing a call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityId {
    /// Locally issued, monotonically increasing counter. Exists only in memory.
    Temporary(u64),
    /// Identifier returned by the remote store.
    Confirmed(String),
}

impl EntityId {
    pub fn confirmed(id: impl Into<String>) -> Self {
        Self::Confirmed(id.into())
    }

    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }

    /// The remote identifier, if this entity has one.
    ///
    /// Returns `None` for Temporary ids; callers treat that as "still pending"
    /// and skip the remote call rather than erroring.
    #[must_use]
    pub fn as_remote(&self) -> Option<&str> {
        match self {
            Self::Temporary(_) => None,
            Self::Confirmed(id) => Some(id),
        }
    }

    /// Whether this id matches a remote identifier string.
    #[must_use]
    pub fn matches_remote(&self, remote: &str) -> bool {
        self.as_remote() == Some(remote)
    }
}

/// A default id is Temporary: an entity is pending until proven confirmed.
impl Default for EntityId {
    fn default() -> Self {
        Self::Temporary(0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temporary(n) => write!(f, "tmp:{n}"),
            Self::Confirmed(id) => f.write_str(id),
        }
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::Confirmed(id.to_string())
    }
}
