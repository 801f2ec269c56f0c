//! Shared fixtures for the integration suite.
//!
//! One mock backend per test; the board fixture carries two members (Ada the
//! test viewer, Grace a second editor), two columns, and two tasks.

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use plank_api::ApiClient;
use plank_engine::{BoardSession, SessionOptions};
use plank_types::Identity;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub async fn start_backend() -> MockServer {
    MockServer::start().await
}

pub fn board_body(viewer_role: &str) -> serde_json::Value {
    json!({
        "id": "b1",
        "name": "Launch",
        "visibility": "private",
        "members": [
            {"id": "m1", "userId": "u1", "name": "Ada", "email": "ada@example.com", "role": viewer_role},
            {"id": "m2", "userId": "u2", "name": "Grace", "email": "grace@example.com", "role": "editor"}
        ],
        "labels": [],
        "columns": [
            {"id": "c1", "title": "To Do", "color": "", "tasks": [
                {"id": "t1", "title": "Design mockups", "status": "To Do"},
                {"id": "t2", "title": "Write copy", "status": "To Do"}
            ]},
            {"id": "c2", "title": "Done", "color": "", "tasks": []}
        ],
        "activities": [],
        "createdAt": null,
        "updatedAt": null
    })
}

pub fn activity(id: &str, user: &str, action: &str) -> serde_json::Value {
    json!({
        "id": id,
        "user": user,
        "action": action,
        "target": "",
        "createdAt": "2026-08-01T10:00:00Z"
    })
}

pub async fn mount_board(server: &MockServer, viewer_role: &str) {
    Mock::given(method("GET"))
        .and(path("/boards/b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(board_body(viewer_role)))
        .mount(server)
        .await;
}

/// The poller and open-task history fetches both hit this path; an empty log
/// keeps them quiet.
pub async fn mount_empty_activities(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/boards/b1/activities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
}

/// Accept the fire-and-forget activity writes the mutation paths issue.
pub async fn mount_activity_sink(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/boards/b1/activities"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(activity("a_sink", "Ada", "logged")),
        )
        .mount(server)
        .await;
}

/// Render JSON documents as one SSE body.
pub fn sse_events(events: &[serde_json::Value]) -> String {
    events.iter().map(|e| format!("data: {e}\n\n")).collect()
}

pub fn viewer() -> Identity {
    Identity {
        id: "u1".into(),
        name: "Ada".into(),
        email: "ada@example.com".into(),
    }
}

pub fn options(data_dir: &Path) -> SessionOptions {
    SessionOptions {
        poll_interval: Duration::from_millis(25),
        stream_idle_timeout: Duration::from_secs(2),
        data_dir: data_dir.to_path_buf(),
    }
}

pub fn api_client(server: &MockServer) -> ApiClient {
    ApiClient::new(Url::parse(&server.uri()).expect("mock server uri"))
}

/// Mount the standard fixture set and open a session on it.
pub async fn mount_session(
    server: &MockServer,
    viewer_role: &str,
    data_dir: &Path,
) -> BoardSession {
    mount_board(server, viewer_role).await;
    mount_empty_activities(server).await;
    mount_activity_sink(server).await;
    BoardSession::mount(api_client(server), "b1", viewer(), &options(data_dir))
        .await
        .expect("session mount")
}

/// Pump session events until `done` reports convergence.
pub async fn settle(
    session: &mut BoardSession,
    mut done: impl FnMut(&BoardSession) -> bool,
) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done(session) {
            let event = session.next_event().await.expect("session channel closed");
            session.apply(event);
        }
    })
    .await
    .expect("timed out waiting for the session to settle");
}
