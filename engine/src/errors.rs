//! Engine-boundary error taxonomy.
//!
//! Only failures a caller can act on become variants. Validation failures
//! (empty titles) are silent no-ops, stale references (mutating an entity the
//! server has not confirmed yet) are defensive local-only skips, and duplicate
//! event delivery is absorbed by idempotent merging - none of those surface
//! here.

use plank_api::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The viewer's role does not allow mutation on this board.
    #[error("permission denied: board is read-only for this viewer")]
    PermissionDenied,

    /// Non-member on a private board. Callers hard-redirect away.
    #[error("access denied: not a member of this private board")]
    AccessDenied,

    /// The board view was torn down; no further mutations are accepted.
    #[error("board session is closed")]
    SessionClosed,
}
