//! Optimistic mutation round trips: commit, rollback, convergence, teardown.

use std::time::Duration;

use plank_engine::{BoardSession, Location, TaskDraft};
use plank_types::EntityId;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn optimistic_column_create_commits_in_place() {
    let server = common::start_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let mut session = common::mount_session(&server, "owner", dir.path()).await;

    Mock::given(method("POST"))
        .and(path("/boards/b1/columns"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "c9", "title": "Review", "color": "", "tasks": []
        })))
        .mount(&server)
        .await;

    session.create_column("Review").unwrap();

    // The splice is synchronous: visible before any network round trip.
    assert_eq!(session.board().columns.len(), 3);
    assert_eq!(session.board().columns[2].title, "Review");
    assert_eq!(session.store().temporary_column_count(), 1);

    common::settle(&mut session, |s| s.store().temporary_column_count() == 0).await;

    assert_eq!(session.board().columns.len(), 3);
    assert_eq!(session.board().columns[2].id, EntityId::confirmed("c9"));
    assert!(session.take_notices().is_empty());
}

#[tokio::test]
async fn failed_column_create_rolls_back_with_a_notice() {
    let server = common::start_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let mut session = common::mount_session(&server, "owner", dir.path()).await;

    Mock::given(method("POST"))
        .and(path("/boards/b1/columns"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend down"))
        .mount(&server)
        .await;

    session.create_column("Doomed").unwrap();
    assert_eq!(session.board().columns.len(), 3);

    common::settle(&mut session, |s| s.store().temporary_column_count() == 0).await;

    assert_eq!(session.board().columns.len(), 2);
    let notices = session.take_notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].contains("Doomed"));
}

#[tokio::test]
async fn mid_flight_rename_survives_the_column_commit() {
    let server = common::start_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let mut session = common::mount_session(&server, "owner", dir.path()).await;

    // The create is slow enough for a rename to land first; its response
    // echoes the title the create carried.
    Mock::given(method("POST"))
        .and(path("/boards/b1/columns"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "c9", "title": "Old", "color": "", "tasks": []}))
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/columns/c9"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    session.create_column("Old").unwrap();
    let temp = session.board().columns[2].id.clone();
    session.rename_column(&temp, "New").unwrap();
    assert_eq!(session.board().columns[2].title, "New");

    common::settle(&mut session, |s| s.store().temporary_column_count() == 0).await;

    // The commit adopts the confirmed id without reverting the rename, and
    // the follow-up patch (verified on mock drop) ships the new title.
    assert_eq!(session.board().columns[2].id, EntityId::confirmed("c9"));
    assert_eq!(session.board().columns[2].title, "New");
    tokio::time::sleep(Duration::from_millis(100)).await;
    session.drain_events();
    assert!(session.take_notices().is_empty());
}

#[tokio::test]
async fn commit_and_refetch_converge_without_duplicates() {
    let server = common::start_backend().await;
    let dir = tempfile::tempdir().unwrap();

    // Initial snapshot for the mount, then snapshots that already include the
    // created task, as the server would report after the commit landed.
    Mock::given(method("GET"))
        .and(path("/boards/b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::board_body("owner")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    let mut refetched = common::board_body("owner");
    refetched["columns"][0]["tasks"]
        .as_array_mut()
        .unwrap()
        .push(json!({"id": "t9", "title": "Ship it", "status": "To Do"}));
    Mock::given(method("GET"))
        .and(path("/boards/b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(refetched))
        .mount(&server)
        .await;
    common::mount_empty_activities(&server).await;
    common::mount_activity_sink(&server).await;
    Mock::given(method("POST"))
        .and(path("/columns/c1/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "t9", "title": "Ship it", "status": "To Do"
        })))
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

    session
        .create_task(
            &EntityId::confirmed("c1"),
            TaskDraft {
                title: "Ship it".into(),
                ..TaskDraft::default()
            },
        )
        .unwrap();
    session.request_refetch();

    let t9_count = |s: &BoardSession| {
        s.board().columns[0]
            .tasks
            .iter()
            .filter(|t| t.id == EntityId::confirmed("t9"))
            .count()
    };
    common::settle(&mut session, |s| {
        s.store().temporary_task_count() == 0 && t9_count(s) >= 1
    })
    .await;

    // Let the slower of commit/refetch land too, then check exactly-once.
    tokio::time::sleep(Duration::from_millis(150)).await;
    session.drain_events();
    assert_eq!(t9_count(&session), 1);
    assert_eq!(session.store().temporary_task_count(), 0);
}

#[tokio::test]
async fn failed_delete_restores_the_task_at_its_position() {
    let server = common::start_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let mut session = common::mount_session(&server, "owner", dir.path()).await;

    Mock::given(method("DELETE"))
        .and(path("/tasks/t1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("nope"))
        .mount(&server)
        .await;

    session.delete_task(&EntityId::confirmed("t1")).unwrap();
    assert_eq!(session.board().columns[0].tasks.len(), 1);

    common::settle(&mut session, |s| s.board().columns[0].tasks.len() == 2).await;

    assert_eq!(
        session.board().columns[0].tasks[0].id,
        EntityId::confirmed("t1")
    );
    let notices = session.take_notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].contains("restored"));
}

#[tokio::test]
async fn failed_order_persist_falls_back_to_refetch() {
    let server = common::start_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let mut session = common::mount_session(&server, "owner", dir.path()).await;

    Mock::given(method("PUT"))
        .and(path("/columns/c1/order"))
        .respond_with(ResponseTemplate::new(500).set_body_string("conflict"))
        .mount(&server)
        .await;

    let c1 = EntityId::confirmed("c1");
    session
        .move_task(
            &EntityId::confirmed("t1"),
            &Location {
                column: c1.clone(),
                index: 0,
            },
            &Location {
                column: c1,
                index: 1,
            },
        )
        .unwrap();

    // Local move applied immediately.
    assert_eq!(
        session.board().columns[0].tasks[0].id,
        EntityId::confirmed("t2")
    );

    // Recovery is a refetch back to the server's order, never a local
    // inverse move.
    common::settle(&mut session, |s| {
        s.board().columns[0].tasks[0].id == EntityId::confirmed("t1")
    })
    .await;
    assert!(
        session
            .take_notices()
            .iter()
            .any(|n| n.contains("task order"))
    );
}

#[tokio::test]
async fn cross_column_move_mirrors_status_and_persists() {
    let server = common::start_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let mut session = common::mount_session(&server, "owner", dir.path()).await;

    Mock::given(method("PATCH"))
        .and(path("/tasks/t1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/columns/c1/order"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/columns/c2/order"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    session
        .move_task(
            &EntityId::confirmed("t1"),
            &Location {
                column: EntityId::confirmed("c1"),
                index: 0,
            },
            &Location {
                column: EntityId::confirmed("c2"),
                index: 0,
            },
        )
        .unwrap();

    let moved = &session.board().columns[1].tasks[0];
    assert_eq!(moved.id, EntityId::confirmed("t1"));
    assert_eq!(moved.status, "Done");

    // Give the persistence task time to hit all three endpoints; the mock
    // server verifies the expectations on drop.
    tokio::time::sleep(Duration::from_millis(200)).await;
    session.drain_events();
    assert!(session.take_notices().is_empty());
}

#[tokio::test]
async fn teardown_before_commit_drops_the_outcome() {
    let server = common::start_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let mut session = common::mount_session(&server, "owner", dir.path()).await;

    Mock::given(method("POST"))
        .and(path("/boards/b1/columns"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "c9", "title": "Late", "color": "", "tasks": []}))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    session.create_column("Late").unwrap();
    session.close();

    tokio::time::sleep(Duration::from_millis(400)).await;
    session.drain_events();

    // The commit arrived after teardown and was dropped: state is frozen as
    // it was at close time, with no notices and no panic.
    assert!(session.is_closed());
    assert_eq!(session.store().temporary_column_count(), 1);
    assert!(session.take_notices().is_empty());
    assert!(matches!(
        session.create_column("After"),
        Err(plank_engine::SyncError::SessionClosed)
    ));
}
