//! Fixed-interval activity polling.
//!
//! One background task per mounted board asks for the single most recent
//! activity every tick and reports a change of its id over the session
//! channel. The cursor is task-local state: the first successful
//! observation initializes it silently, so mounting a board with existing
//! history never replays that history as notifications.

use std::time::Duration;

use plank_api::ApiClient;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::session::SessionEvent;

/// Spawn the poller for one board. The task exits when the session's
/// receiving side is dropped.
pub fn spawn_activity_poller(
    api: ApiClient,
    board_id: String,
    interval: Duration,
    tx: mpsc::Sender<SessionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut cursor: Option<String> = None;

        loop {
            ticker.tick().await;
            if tx.is_closed() {
                return;
            }

            let latest = match api.latest_activity(&board_id).await {
                Ok(latest) => latest,
                Err(e) => {
                    // Skip the tick; the next one retries naturally.
                    tracing::debug!(board = %board_id, "Activity poll failed: {e}");
                    continue;
                }
            };
            let Some(entry) = latest else {
                continue;
            };

            match &cursor {
                None => {
                    // First observation: establish the baseline, emit nothing.
                    cursor = Some(entry.id.clone());
                }
                Some(seen) if *seen == entry.id => {}
                Some(_) => {
                    cursor = Some(entry.id.clone());
                    if tx.send(SessionEvent::ActivityObserved(entry)).await.is_err() {
                        return;
                    }
                }
            }
        }
    })
}
