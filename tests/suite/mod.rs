//! Integration test modules.

mod permissions;
mod poller;
mod stream;
mod sync;
