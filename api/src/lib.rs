//! REST and push-channel client for the plank board backend.
//!
//! # Architecture
//!
//! - [`ApiClient`] - thin REST surface over the board backend (JSON, camelCase)
//! - [`board`] - wire DTOs and request payloads for the REST surface
//! - [`events`] - the two push channels: the coarse board-updated stream and
//!   the fine per-task delta stream, both carried over SSE
//!
//! Push events are delivered through [`tokio::sync::mpsc`] receivers; a closed
//! receiver means the underlying stream ended (idle timeout, malformed
//! payload, or server close). The client never retries on its own — recovery
//! relies on the caller's next poll or refetch cycle.
//!
//! # Error Handling
//!
//! REST calls return [`ApiError`]: `Status` for non-success responses (with a
//! size-capped body excerpt) and `Transport` for connection or decode
//! failures. Stream problems are not errors; the stream just closes.

pub mod board;
pub mod events;
mod sse;

use std::sync::OnceLock;
use std::time::Duration;

use url::Url;

pub use board::{
    ChecklistPatch, ColumnPatch, LabelPatch, NewActivity, NewChecklistItem, NewColumn, NewComment,
    NewLabel, NewTask, TaskPatch,
};
pub use events::{BoardStreamEvent, DeletedRef, TaskStreamEvent};

const CONNECT_TIMEOUT_SECS: u64 = 30;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_MAX_IDLE_PER_HOST: usize = 8;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Shared HTTP client with connection pooling and keepalive.
///
/// Redirects are refused: the backend is a fixed base URL and a redirect is
/// either a misconfiguration or something worse.
pub fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::none())
            .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
            .build()
            .unwrap_or_else(|e| {
                tracing::error!("Failed to build pooled HTTP client: {e}. Using defaults.");
                reqwest::Client::new()
            })
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Non-success HTTP status; `body` is capped at 32 KiB.
    #[error("API error {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    /// Connection, timeout, or body-decode failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Client for one backend deployment.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    /// Build a client on the shared pooled HTTP client.
    #[must_use]
    pub fn new(base: Url) -> Self {
        Self {
            http: http_client().clone(),
            base,
        }
    }

    /// Build a client with a caller-supplied `reqwest::Client` (tests mostly).
    #[must_use]
    pub fn with_http(http: reqwest::Client, base: Url) -> Self {
        Self { http, base }
    }

    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Join a path fragment onto the base URL.
    ///
    /// The base is treated as a directory root regardless of a trailing slash.
    pub(crate) fn url(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .expect("API base URL must be a valid http(s) base");
            segments.pop_if_empty();
            for segment in path.split('/').filter(|s| !s.is_empty()) {
                segments.push(segment);
            }
        }
        url
    }
}

/// Turn a non-success response into [`ApiError::Status`] with a capped body.
pub(crate) async fn expect_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(ApiError::Status {
        status,
        body: read_capped_body(response).await,
    })
}

async fn read_capped_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}
