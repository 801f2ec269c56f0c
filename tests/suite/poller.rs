//! Activity polling and notification synthesis.

use std::time::Duration;

use plank_engine::BoardSession;
use plank_types::NotificationKind;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn first_observation_is_silent_then_one_notification_per_change() {
    let server = common::start_backend().await;
    let dir = tempfile::tempdir().unwrap();
    common::mount_board(&server, "owner").await;
    common::mount_activity_sink(&server).await;

    // A few polls see the pre-existing entry (baseline, no notification),
    // then a new entry appears.
    Mock::given(method("GET"))
        .and(path("/boards/b1/activities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            common::activity("a1", "Grace", "created list: Done")
        ])))
        .up_to_n_times(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/boards/b1/activities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            common::activity("a2", "Grace", "created task: Design mockups")
        ])))
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

    common::settle(&mut session, |s| !s.notifications().items().is_empty()).await;

    // Mounting over existing history produced nothing; only the change did.
    let items = session.notifications().items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "a2");
    assert_eq!(items[0].kind, NotificationKind::Create);
    assert!(!items[0].is_read);

    // The poller keeps seeing a2; no further notifications accrue.
    tokio::time::sleep(Duration::from_millis(200)).await;
    session.drain_events();
    assert_eq!(session.notifications().items().len(), 1);
    assert_eq!(session.notifications().unread_count(), 1);

    // The observed change also pulled a fresh board tree: at least one
    // fetch beyond the mount's.
    let requests = server.received_requests().await.unwrap();
    let board_fetches = requests
        .iter()
        .filter(|r| r.url.path() == "/boards/b1")
        .count();
    assert!(
        board_fetches >= 2,
        "activity change should trigger a board refetch, saw {board_fetches} fetch(es)"
    );
}

#[tokio::test]
async fn notifications_persist_per_board_across_sessions() {
    let server = common::start_backend().await;
    let dir = tempfile::tempdir().unwrap();
    common::mount_board(&server, "owner").await;
    common::mount_activity_sink(&server).await;

    Mock::given(method("GET"))
        .and(path("/boards/b1/activities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            common::activity("a1", "Grace", "deleted task: Old card")
        ])))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/boards/b1/activities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            common::activity("a2", "Grace", "moved Design mockups to Done")
        ])))
        .mount(&server)
        .await;

    let mut first = BoardSession::mount(
        common::api_client(&server),
        "b1",
        common::viewer(),
        &common::options(dir.path()),
    )
    .await
    .unwrap();
    common::settle(&mut first, |s| !s.notifications().items().is_empty()).await;
    first.mark_all_notifications_read();
    first.close();
    drop(first);

    assert!(dir.path().join("notifications_b1.json").exists());

    // A second mount on the same data dir hydrates the saved history.
    let second = BoardSession::mount(
        common::api_client(&server),
        "b1",
        common::viewer(),
        &common::options(dir.path()),
    )
    .await
    .unwrap();
    assert_eq!(second.notifications().items().len(), 1);
    assert_eq!(second.notifications().items()[0].id, "a2");
    assert_eq!(second.notifications().unread_count(), 0);
}
