//! Push channels: typed SSE event streams from the backend.
//!
//! Two independent channels exist:
//!
//! - **Coarse** ([`ApiClient::open_board_stream`]): `board-updated` signals
//!   carrying a board id. The consumer refetches the whole board on match.
//! - **Fine** ([`ApiClient::open_task_stream`]): per-open-task deltas for
//!   checklist items, comments, and activity entries, applied incrementally.
//!
//! Each message is one JSON document `{"type": ..., "payload": ...}`. A
//! payload that is not valid JSON (an HTML error page, typically) closes the
//! stream defensively instead of erroring: the receiver simply ends, and the
//! consumer falls back to its poll/refetch cycle. Unknown `type` values are
//! delivered as `Unknown` so new server events never kill old clients.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

use plank_types::ActivityLogEntry;

use crate::board::{ChecklistItemDto, CommentDto};
use crate::{ApiClient, sse};

const EVENT_CHANNEL_CAPACITY: usize = 256;

// Push events are small; anything this size is not an event stream.
const MAX_EVENT_BUFFER_BYTES: usize = 1024 * 1024;

/// Reference to a deleted sub-entity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedRef {
    pub id: String,
}

/// Fine-grained per-task delta, tagged by the wire `type` field.
#[derive(Debug)]
pub enum TaskStreamEvent {
    ChecklistCreated(ChecklistItemDto),
    ChecklistUpdated(ChecklistItemDto),
    ChecklistDeleted(DeletedRef),
    CommentCreated(CommentDto),
    CommentUpdated(CommentDto),
    CommentDeleted(DeletedRef),
    ActivityCreated(ActivityLogEntry),
    /// Unknown event type - forward compatibility
    Unknown,
}

/// Coarse board-level signal.
#[derive(Debug)]
pub enum BoardStreamEvent {
    BoardUpdated { board_id: String },
    /// Unknown event type - forward compatibility
    Unknown,
}

/// Wire envelope shared by both channels.
///
/// Decoded in two steps so an unrecognized `type` maps to `Unknown` no
/// matter what its payload carries, while a recognized `type` with a bad
/// payload stays a hard decode error.
#[derive(Deserialize)]
struct EventEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: serde_json::Value,
}

fn decode_payload<T, E>(payload: serde_json::Value) -> Result<T, E>
where
    T: DeserializeOwned,
    E: serde::de::Error,
{
    serde_json::from_value(payload).map_err(E::custom)
}

impl<'de> Deserialize<'de> for TaskStreamEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let EventEnvelope { kind, payload } = EventEnvelope::deserialize(deserializer)?;
        Ok(match kind.as_str() {
            "checklist:created" => Self::ChecklistCreated(decode_payload(payload)?),
            "checklist:updated" => Self::ChecklistUpdated(decode_payload(payload)?),
            "checklist:deleted" => Self::ChecklistDeleted(decode_payload(payload)?),
            "comment:created" => Self::CommentCreated(decode_payload(payload)?),
            "comment:updated" => Self::CommentUpdated(decode_payload(payload)?),
            "comment:deleted" => Self::CommentDeleted(decode_payload(payload)?),
            "activity:created" => Self::ActivityCreated(decode_payload(payload)?),
            _ => Self::Unknown,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoardUpdatedPayload {
    board_id: String,
}

impl<'de> Deserialize<'de> for BoardStreamEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let EventEnvelope { kind, payload } = EventEnvelope::deserialize(deserializer)?;
        Ok(match kind.as_str() {
            "board-updated" => {
                let BoardUpdatedPayload { board_id } = decode_payload(payload)?;
                Self::BoardUpdated { board_id }
            }
            _ => Self::Unknown,
        })
    }
}

impl ApiClient {
    /// Open the fine-grained delta stream for one task.
    ///
    /// The returned receiver ends when the stream closes for any reason;
    /// the spawned pump holds no reference back to the caller.
    #[must_use]
    pub fn open_task_stream(
        &self,
        task_id: &str,
        idle_timeout: Duration,
    ) -> mpsc::Receiver<TaskStreamEvent> {
        self.open_stream(&format!("tasks/{task_id}/stream"), idle_timeout)
    }

    /// Open the coarse board-updated stream for this deployment.
    #[must_use]
    pub fn open_board_stream(&self, idle_timeout: Duration) -> mpsc::Receiver<BoardStreamEvent> {
        self.open_stream("events", idle_timeout)
    }

    fn open_stream<T>(&self, path: &str, idle_timeout: Duration) -> mpsc::Receiver<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let request = self
            .http()
            .get(self.url(path))
            .header("Accept", "text/event-stream");

        tokio::spawn(async move {
            let response = match request.send().await {
                Ok(response) if response.status().is_success() => response,
                Ok(response) => {
                    tracing::warn!(status = %response.status(), "Event stream refused");
                    return;
                }
                Err(e) => {
                    tracing::warn!("Event stream connect failed: {e}");
                    return;
                }
            };
            pump_events(response, tx, idle_timeout).await;
        });

        rx
    }
}

/// Drive one SSE response until it ends, delivering decoded events to `tx`.
///
/// Closes (returns) on: idle timeout, oversized buffer, invalid UTF-8,
/// malformed JSON payload, dropped receiver, or server end-of-stream.
async fn pump_events<T>(response: reqwest::Response, tx: mpsc::Sender<T>, idle_timeout: Duration)
where
    T: DeserializeOwned,
{
    use futures_util::StreamExt;

    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();

    loop {
        let Ok(next) = tokio::time::timeout(idle_timeout, stream.next()).await else {
            tracing::debug!("Event stream idle timeout; closing");
            return;
        };

        let Some(chunk) = next else { break };
        let Ok(chunk) = chunk else {
            tracing::debug!("Event stream transport error; closing");
            return;
        };
        buffer.extend_from_slice(&chunk);

        if buffer.len() > MAX_EVENT_BUFFER_BYTES {
            tracing::warn!("Event stream buffer exceeded 1 MiB; closing");
            return;
        }

        while let Some(event) = sse::next_event(&mut buffer) {
            if event.is_empty() {
                continue;
            }

            let Ok(event) = std::str::from_utf8(&event) else {
                tracing::warn!("Event stream sent invalid UTF-8; closing");
                return;
            };

            let Some(data) = sse::data_payload(event) else {
                continue;
            };

            // Malformed payloads (HTML error pages and the like) close the
            // stream rather than throwing; recovery is the next refetch.
            let decoded: T = match serde_json::from_str(&data) {
                Ok(decoded) => decoded,
                Err(e) => {
                    tracing::warn!(payload_bytes = data.len(), "Malformed stream payload: {e}");
                    return;
                }
            };

            if tx.send(decoded).await.is_err() {
                return;
            }
        }
    }
}
