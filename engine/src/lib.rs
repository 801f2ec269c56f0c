//! Optimistic board synchronization core.
//!
//! # Architecture
//!
//! - [`session`] - the [`BoardSession`] event loop: owns all state, applies
//!   local mutations synchronously, and reconciles background outcomes
//! - [`store`] - the in-memory board tree and open-task detail
//! - [`mutation`] - the generic splice/resolve/discard optimistic pattern
//! - [`reorder`] - pure drag-and-drop moves over the tree
//! - [`poller`] / [`bridge`] - the two change-detection inputs: fixed-interval
//!   activity polling and the SSE push channels
//! - [`notifications`] - per-board notification history with gated persistence
//! - [`permissions`] - viewer access resolution and the mutation gate
//!
//! # Concurrency model
//!
//! There are no locks around board state. One owner mutates it from the
//! caller's loop; spawned tasks only ever communicate through the session's
//! mpsc channel, and the session makes every reconciliation step (confirm,
//! rollback, refetch install, delta merge) idempotent so that message
//! ordering and redelivery never matter.

pub mod bridge;
pub mod errors;
pub mod identity;
pub mod mutation;
pub mod notifications;
pub mod permissions;
pub mod persist;
pub mod poller;
pub mod reorder;
pub mod session;
pub mod store;

pub use errors::SyncError;
pub use notifications::NotificationAggregator;
pub use permissions::{Access, resolve_access};
pub use reorder::{Location, ReorderError};
pub use session::{BoardSession, SessionEvent, SessionOptions, TaskDraft};
pub use store::BoardStateStore;
