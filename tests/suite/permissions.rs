//! Access resolution at mount time and the mutation gate.

use plank_engine::{Access, BoardSession, SyncError};
use plank_types::{EntityId, Identity};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn read_only_viewer_never_issues_remote_mutations() {
    let server = common::start_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let mut session = common::mount_session(&server, "viewer", dir.path()).await;
    assert_eq!(session.access(), Access::ReadOnly);

    // The gate sits in front of the remote call; the server verifies on drop
    // that this endpoint was never hit.
    Mock::given(method("DELETE"))
        .and(path("/tasks/t1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = session.delete_task(&EntityId::confirmed("t1"));
    assert!(matches!(err, Err(SyncError::PermissionDenied)));
    assert_eq!(session.board().columns[0].tasks.len(), 2);

    // Reads are still allowed.
    session.open_task(&EntityId::confirmed("t1")).unwrap();
    assert!(session.store().open_task_detail().is_some());
}

#[tokio::test]
async fn non_member_is_denied_on_a_private_board() {
    let server = common::start_backend().await;
    let dir = tempfile::tempdir().unwrap();
    common::mount_board(&server, "owner").await;

    let stranger = Identity {
        id: "u99".into(),
        name: "Mallory".into(),
        email: "mallory@example.com".into(),
    };
    let err = BoardSession::mount(
        common::api_client(&server),
        "b1",
        stranger,
        &common::options(dir.path()),
    )
    .await;
    assert!(matches!(err, Err(SyncError::AccessDenied)));
}

#[tokio::test]
async fn non_member_reads_a_public_board() {
    let server = common::start_backend().await;
    let dir = tempfile::tempdir().unwrap();

    let mut body = common::board_body("owner");
    body["visibility"] = json!("public");
    Mock::given(method("GET"))
        .and(path("/boards/b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;
    common::mount_empty_activities(&server).await;

    let stranger = Identity {
        id: "u99".into(),
        name: "Mallory".into(),
        email: "mallory@example.com".into(),
    };
    let session = BoardSession::mount(
        common::api_client(&server),
        "b1",
        stranger,
        &common::options(dir.path()),
    )
    .await
    .unwrap();
    assert_eq!(session.access(), Access::ReadOnly);
    assert_eq!(session.board().name, "Launch");
}

#[tokio::test]
async fn member_matching_is_case_insensitive() {
    let server = common::start_backend().await;
    let dir = tempfile::tempdir().unwrap();
    common::mount_board(&server, "editor").await;
    common::mount_empty_activities(&server).await;

    let shouty = Identity {
        id: "u1".into(),
        name: "ADA".into(),
        email: "other@example.com".into(),
    };
    let session = BoardSession::mount(
        common::api_client(&server),
        "b1",
        shouty,
        &common::options(dir.path()),
    )
    .await
    .unwrap();
    assert_eq!(session.access(), Access::ReadWrite);
}
