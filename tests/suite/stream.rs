//! Push-channel behavior: coarse refetch signals and fine per-task deltas.

use std::time::Duration;

use plank_engine::BoardSession;
use plank_types::EntityId;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

fn sse_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/event-stream")
}

#[tokio::test]
async fn board_updated_signal_triggers_a_refetch() {
    let server = common::start_backend().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/boards/b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::board_body("owner")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    let mut refetched = common::board_body("owner");
    refetched["columns"][0]["title"] = json!("Refetched");
    Mock::given(method("GET"))
        .and(path("/boards/b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(refetched))
        .mount(&server)
        .await;
    common::mount_empty_activities(&server).await;

    // One signal for some other board (filtered out), one for ours.
    let body = common::sse_events(&[
        json!({"type": "board-updated", "payload": {"boardId": "other"}}),
        json!({"type": "board-updated", "payload": {"boardId": "b1"}}),
    ]);
    Mock::given(method("GET"))
        .and(path("/events"))
        .respond_with(sse_response(body))
        .mount(&server)
        .await;

    let mut session = BoardSession::mount(
        common::api_client(&server),
        "b1",
        common::viewer(),
        &common::options(dir.path()),
    )
    .await
    .unwrap();

    common::settle(&mut session, |s| s.board().columns[0].title == "Refetched").await;
}

#[tokio::test]
async fn duplicate_stream_deltas_apply_once() {
    let server = common::start_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let mut session = common::mount_session(&server, "owner", dir.path()).await;

    let event = json!({
        "type": "checklist:created",
        "payload": {"id": "cl1", "text": "polish the copy", "done": false}
    });
    Mock::given(method("GET"))
        .and(path("/tasks/t1/stream"))
        .respond_with(sse_response(common::sse_events(&[event.clone(), event])))
        .mount(&server)
        .await;

    session.open_task(&EntityId::confirmed("t1")).unwrap();

    common::settle(&mut session, |s| {
        s.store()
            .open_task_detail()
            .is_some_and(|d| !d.checklist.is_empty())
    })
    .await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    session.drain_events();

    let detail = session.store().open_task_detail().unwrap();
    assert_eq!(detail.checklist.len(), 1);
    assert_eq!(detail.checklist[0].id, EntityId::confirmed("cl1"));
}

#[tokio::test]
async fn malformed_stream_payload_closes_the_channel() {
    let server = common::start_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let mut session = common::mount_session(&server, "owner", dir.path()).await;

    // An HTML error page in place of JSON, followed by a valid event that
    // must never be delivered because the stream closes at the bad payload.
    let body = format!(
        "data: <html>502 Bad Gateway</html>\n\ndata: {}\n\n",
        json!({"type": "checklist:created", "payload": {"id": "cl1", "text": "late", "done": false}})
    );
    Mock::given(method("GET"))
        .and(path("/tasks/t1/stream"))
        .respond_with(sse_response(body))
        .mount(&server)
        .await;

    session.open_task(&EntityId::confirmed("t1")).unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    session.drain_events();

    let detail = session.store().open_task_detail().unwrap();
    assert!(detail.checklist.is_empty());
}

#[tokio::test]
async fn stream_delta_for_a_closed_task_is_ignored() {
    let server = common::start_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let mut session = common::mount_session(&server, "owner", dir.path()).await;

    let event = json!({
        "type": "comment:created",
        "payload": {"id": "cm1", "authorId": "u2", "text": "late comment", "createdAt": null}
    });
    Mock::given(method("GET"))
        .and(path("/tasks/t1/stream"))
        .respond_with(sse_response(common::sse_events(&[event])).set_delay(Duration::from_millis(100)))
        .mount(&server)
        .await;

    session.open_task(&EntityId::confirmed("t1")).unwrap();
    session.close_task();

    tokio::time::sleep(Duration::from_millis(300)).await;
    session.drain_events();
    assert!(session.store().open_task_detail().is_none());
}
