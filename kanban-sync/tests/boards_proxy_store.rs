//! Request shapes of the boards proxy store, checked against a mock server.

use chrono::NaiveDate;
use kanban_sync::{
    BoardId, BoardSession, BoardStore, BoardsProxyStore, DragController, DragTarget, ColumnId, MemberDirectory, MemberId, OrderUpdate,
    SyncError, Task, TaskFields, TaskId, TaskPatch, TeamId,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store(server: &MockServer) -> BoardsProxyStore {
    BoardsProxyStore::new(&server.uri(), Some("tok"), "team1", Duration::from_secs(5)).unwrap()
}

async fn mount_block_id(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/mattermost/board/get_block_id/"))
        .and(query_param("board_id", "b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("view1")))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_columns_use_cookie_and_card_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mattermost/board/columns_with_tasks/"))
        .and(query_param("board_id", "b1"))
        .and(query_param("team_id", "team1"))
        .and(header("cookie", "mattermost_token=tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "board_id": "b1",
                "id": "s1",
                "title": "Todo",
                "tasks": [
                    {"id": "c3", "title": "Unordered", "Status": "s1", "Depends_on": []},
                    {"id": "c2", "title": "Later", "Status": "s1", "Depends_on": ["c1"],
                     "Start_Date": "2025-02-01", "End_Date": "2025-02-03",
                     "Assignee_ID": "u1", "Assignee_Username": "alice", "position": 4},
                    {"id": "c1", "title": "Sooner", "Status": "s1", "Depends_on": [], "position": 1}
                ]
            },
            {"board_id": "b1", "id": "s2", "title": "Done", "tasks": []}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let columns = store(&server)
        .fetch_columns_with_tasks(&BoardId::from("b1"))
        .await
        .unwrap();

    let ids: Vec<_> = columns[0].tasks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c2", "c3"]);
    let later = &columns[0].tasks[1];
    assert_eq!(later.depends_on, vec![TaskId::from("c1")]);
    assert_eq!(later.assignee, Some(MemberId::from("u1")));
    assert_eq!(later.end_date, NaiveDate::from_ymd_opt(2025, 2, 3));
    assert_eq!(columns[1].title, "Done");
}

#[tokio::test]
async fn test_candidates_come_from_depends_on_property() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mattermost/board/"))
        .and(query_param("board_id", "b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "b1",
            "title": "Site",
            "cardProperties": [
                {"id": "p1", "name": "Status", "options": [{"id": "s1", "value": "Todo"}]},
                {"id": "p2", "name": "Depends on", "options": [
                    {"id": "c1", "value": "Sooner", "color": "propColorDefault"},
                    {"id": "c2", "value": "Later", "color": "propColorDefault"}
                ]}
            ]
        })))
        .mount(&server)
        .await;

    let options = store(&server)
        .fetch_dependency_candidates(&BoardId::from("b1"))
        .await
        .unwrap();
    let labels: Vec<_> = options.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(labels, vec!["Sooner", "Later"]);
}

#[tokio::test]
async fn test_order_update_names_moved_task_and_caches_block_id() {
    let server = MockServer::start().await;
    mount_block_id(&server, 1).await;
    Mock::given(method("PATCH"))
        .and(path("/mattermost/board/task_column/"))
        .and(query_param("board_id", "b1"))
        .and(query_param("block_id", "view1"))
        .and(query_param("column_id", "s2"))
        .and(query_param("task_id", "c1"))
        .and(body_json(json!(["c1", "c3"])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/mattermost/board/task_column/"))
        .and(query_param("column_id", "s1"))
        .and(query_param("task_id", "c2"))
        .and(body_json(json!(["c2"])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let store = store(&server);
    let board = BoardId::from("b1");
    let source = OrderUpdate::new(ColumnId::from("s1"), vec!["c2".into()]);
    let target = OrderUpdate::new(ColumnId::from("s2"), vec!["c1".into(), "c3".into()])
        .with_moved_task(TaskId::from("c1"));
    store.update_task_order(&board, &source).await.unwrap();
    store.update_task_order(&board, &target).await.unwrap();

    // Emptied columns have nothing to anchor the request on
    let empty = OrderUpdate::new(ColumnId::from("s3"), Vec::new());
    store.update_task_order(&board, &empty).await.unwrap();
}

#[tokio::test]
async fn test_create_task_sends_dates_as_epoch_millis() {
    let server = MockServer::start().await;
    mount_block_id(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/mattermost/board/columns/tasks/"))
        .and(query_param("board_id", "b1"))
        .and(query_param("block_id", "view1"))
        .and(query_param("column_id", "s1"))
        .and(query_param("title", "Wire"))
        .and(query_param("start_date", "1735689600000"))
        .and(query_param("end_date", "1735776000000"))
        .and(body_json(json!(["c1"])))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": "c9", "type": "card"}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let fields = TaskFields::new("Wire")
        .with_dates(
            NaiveDate::from_ymd_opt(2025, 1, 1),
            NaiveDate::from_ymd_opt(2025, 1, 2),
        )
        .with_depends_on(vec!["c1".into()]);
    let task = store(&server)
        .create_task(&BoardId::from("b1"), &ColumnId::from("s1"), 3, &fields)
        .await
        .unwrap();
    assert_eq!(task.id, "c9");
    assert_eq!(task.position, 3);
    assert_eq!(task.column_id, "s1");
}

#[tokio::test]
async fn test_field_update_splits_rename_from_properties() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/mattermost/board/columns/tasks/rename/"))
        .and(query_param("task_id", "c1"))
        .and(query_param("new_title", "Walls"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/mattermost/board/columns/tasks/"))
        .and(query_param("column_id", "s1"))
        .and(query_param("task_id", "c1"))
        .and(query_param("description", "load bearing"))
        .and(body_json(json!(["c0"])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let store = store(&server);
    let board = BoardId::from("b1");
    let task = Task::new("c1", "Walls", "s1")
        .with_description("load bearing")
        .with_depends_on(vec!["c0".into()]);

    store
        .update_task_fields(&board, &task, &TaskPatch::new().with_title("Walls"))
        .await
        .unwrap();
    store
        .update_task_fields(
            &board,
            &task,
            &TaskPatch::new().with_description("load bearing"),
        )
        .await
        .unwrap();
    assert!(store.refreshes_candidates_on_field_update());
}

#[tokio::test]
async fn test_delete_column_deletes_its_tasks_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mattermost/board/columns_with_tasks/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "s1", "title": "Todo", "tasks": [
                {"id": "c1", "title": "One", "Status": "s1"},
                {"id": "c2", "title": "Two", "Status": "s1"}
            ]}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/mattermost/board/columns/tasks/"))
        .and(query_param("board_id", "b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/mattermost/board/columns/"))
        .and(query_param("column_id", "s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    store(&server)
        .delete_column(&BoardId::from("b1"), &ColumnId::from("s1"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_member_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mattermost/board/members/"))
        .and(query_param("board_id", "b1"))
        .and(query_param("team_id", "team1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": "u1", "username": "alice"}])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mattermost/add_member_to_board/"))
        .and(query_param("user_id", "u2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/mattermost/board/members/"))
        .and(query_param("member_id", "u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mattermost/team/users/"))
        .and(query_param("query", "bo"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": "u2", "username": "bob"}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = store(&server);
    let board = BoardId::from("b1");
    let team = TeamId::from("team1");
    let members = store.fetch_members(&board, &team).await.unwrap();
    assert_eq!(members[0].username, "alice");
    let users = store.search_team_users(&team, "bo").await.unwrap();
    assert_eq!(users[0].id, MemberId::from("u2"));
    store.add_member(&board, &MemberId::from("u2")).await.unwrap();
    store.remove_member(&board, &MemberId::from("u1")).await.unwrap();
}

#[tokio::test]
async fn test_board_lifecycle_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mattermost/boards/"))
        .and(query_param("team_id", "team1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "b1", "title": "Site", "cardProperties": []}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mattermost/board/"))
        .and(query_param("team_id", "team1"))
        .and(query_param("title", "Annex"))
        .and(query_param("description", "East wing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "boards": [{"id": "b9", "title": "Template", "cardProperties": []}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/mattermost/board/"))
        .and(query_param("board_id", "b9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let store = store(&server);
    let boards = store.list_boards().await.unwrap();
    assert_eq!(boards[0].title, "Site");

    let created = store.create_board("Annex", "East wing").await.unwrap();
    assert_eq!(created.id, "b9");
    assert_eq!(created.title, "Annex");
    assert_eq!(created.description, "East wing");
    store.delete_board(&created.id).await.unwrap();
}

#[tokio::test]
async fn test_unusable_creation_answers_are_unexpected_responses() {
    let server = MockServer::start().await;
    mount_block_id(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/mattermost/board/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"boards": []})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mattermost/board/columns/tasks/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mattermost/board/columns/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "b1", "title": "Site", "cardProperties": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = store(&server);
    let board = BoardId::from("b1");
    let err = store.create_board("Annex", "").await.unwrap_err();
    assert!(matches!(err, SyncError::UnexpectedResponse { .. }));

    let fields = TaskFields::new("Wire").with_dates(
        NaiveDate::from_ymd_opt(2025, 1, 1),
        NaiveDate::from_ymd_opt(2025, 1, 2),
    );
    let err = store
        .create_task(&board, &ColumnId::from("s1"), 0, &fields)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::UnexpectedResponse { .. }));
    assert!(err.is_transient());
    assert!(!err.is_validation());

    let err = store.create_column(&board, "Review").await.unwrap_err();
    assert!(matches!(err, SyncError::UnexpectedResponse { .. }));
}

async fn mount_board(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/mattermost/board/"))
        .and(query_param("board_id", "b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "b1",
            "title": "Site",
            "cardProperties": [
                {"id": "p1", "name": "Status", "options": [
                    {"id": "s1", "value": "Todo"},
                    {"id": "s2", "value": "Done"}
                ]}
            ]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mattermost/board/columns_with_tasks/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "s1", "title": "Todo", "tasks": [
                {"id": "c1", "title": "One", "Status": "s1", "position": 0},
                {"id": "c2", "title": "Two", "Status": "s1", "position": 1}
            ]},
            {"id": "s2", "title": "Done", "tasks": [
                {"id": "c3", "title": "Three", "Status": "s2", "position": 0}
            ]}
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_transfer_writes_source_before_target() {
    let server = MockServer::start().await;
    mount_board(&server).await;
    mount_block_id(&server, 1).await;
    // A slow answer for the source column would let a concurrent target write overtake it
    Mock::given(method("PATCH"))
        .and(path("/mattermost/board/task_column/"))
        .and(query_param("column_id", "s1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/mattermost/board/task_column/"))
        .and(query_param("column_id", "s2"))
        .and(query_param("task_id", "c1"))
        .and(body_json(json!(["c1", "c3"])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = BoardSession::new(Arc::new(store(&server)), "b1");
    session.load().await.unwrap();

    let mut drag = DragController::new();
    drag.pointer_down("s1", "c1");
    let intent = drag.drop(Some(DragTarget::task("s2", "c3"))).intent().unwrap();
    let results = session.apply(intent).settle().await;
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.is_ok()));

    let written: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "PATCH")
        .filter_map(|r| {
            r.url
                .query_pairs()
                .find(|(key, _)| key == "column_id")
                .map(|(_, value)| value.into_owned())
        })
        .collect();
    assert_eq!(written, vec!["s1", "s2"]);
}

#[tokio::test]
async fn test_empty_create_answer_fails_session_action() {
    let server = MockServer::start().await;
    mount_board(&server).await;
    mount_block_id(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/mattermost/board/columns/tasks/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = BoardSession::new(Arc::new(store(&server)), "b1");
    session.load().await.unwrap();
    let fields = TaskFields::new("Wire").with_dates(
        NaiveDate::from_ymd_opt(2025, 1, 1),
        NaiveDate::from_ymd_opt(2025, 1, 2),
    );
    let outcome = session.create_task(&ColumnId::from("s1"), fields).await;

    assert!(outcome.is_failed());
    assert!(matches!(
        outcome.error(),
        Some(SyncError::UnexpectedResponse { .. })
    ));
    assert_eq!(session.engine().task_count(), 3);
}
