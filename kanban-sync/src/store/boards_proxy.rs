//! Store for boards hosted by the third-party boards service.
//!
//! All requests go through the backend proxy, which authenticates with the
//! `mattermost_token` cookie and takes its arguments as query parameters.
//! Columns are the options of the board's `Status` property and ordering is a
//! single board-wide card order held by the board's tracker view block.

use super::http::{build_client, check_response, normalize_base_url};
use super::{BoardStore, MemberDirectory};
use crate::error::{Result, SyncError};
use crate::types::{
    Board, BoardId, Column, ColumnId, DependencyOption, Member, MemberId, OrderUpdate, Task,
    TaskFields, TaskId, TaskPatch, TeamId,
};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use futures::future::try_join_all;
use reqwest::header::COOKIE;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const STATUS_PROPERTY: &str = "Status";
const DEPENDS_ON_PROPERTY: &str = "Depends on";

/// Client for the boards proxy
#[derive(Debug)]
pub struct BoardsProxyStore {
    client: Client,
    base_url: String,
    team_id: TeamId,
    /// Tracker view block per board, needed by every order update
    block_ids: Mutex<HashMap<BoardId, String>>,
}

#[derive(Debug, Deserialize)]
struct WireOption {
    id: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct WireProperty {
    #[serde(default)]
    name: String,
    #[serde(default)]
    options: Vec<WireOption>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBoard {
    id: BoardId,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    card_properties: Vec<WireProperty>,
}

impl From<WireBoard> for Board {
    fn from(wire: WireBoard) -> Self {
        Board::new(wire.id, wire.title).with_description(wire.description.unwrap_or_default())
    }
}

impl WireBoard {
    fn property(&self, name: &str) -> Option<&WireProperty> {
        self.card_properties.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Deserialize)]
struct WireTask {
    id: TaskId,
    #[serde(default)]
    title: String,
    #[serde(rename = "Description", default)]
    description: Option<String>,
    #[serde(rename = "Start_Date", default)]
    start_date: Option<NaiveDate>,
    #[serde(rename = "End_Date", default)]
    end_date: Option<NaiveDate>,
    #[serde(rename = "Depends_on", default)]
    depends_on: Option<Vec<Option<TaskId>>>,
    #[serde(rename = "Assignee_ID", default)]
    assignee_id: Option<MemberId>,
    /// Index in the board-wide card order. Cards missing from it sort last.
    #[serde(default)]
    position: Option<usize>,
}

impl WireTask {
    fn into_task(self, column_id: &ColumnId) -> Task {
        Task {
            id: self.id,
            title: self.title,
            description: self.description.unwrap_or_default(),
            start_date: self.start_date,
            end_date: self.end_date,
            column_id: column_id.clone(),
            position: self.position.unwrap_or(usize::MAX),
            depends_on: self.depends_on.into_iter().flatten().flatten().collect(),
            assignee: self.assignee_id.filter(|id| !id.as_str().is_empty()),
        }
    }
}

/// Answer of the board creation call, which duplicates a template board
#[derive(Debug, Deserialize)]
struct WireCreatedBoards {
    #[serde(default)]
    boards: Vec<WireBoard>,
}

#[derive(Debug, Deserialize)]
struct WireColumn {
    id: ColumnId,
    #[serde(default)]
    title: String,
    #[serde(default)]
    tasks: Vec<WireTask>,
}

#[derive(Debug, Deserialize)]
struct WireBlock {
    id: TaskId,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: MemberId,
    #[serde(default)]
    username: String,
}

impl From<WireUser> for Member {
    fn from(user: WireUser) -> Self {
        Member::new(user.id, user.username)
    }
}

/// The proxy expects dates as UTC midnight in epoch milliseconds
fn epoch_millis(date: Option<NaiveDate>) -> String {
    date.map(|d| d.and_time(NaiveTime::MIN).and_utc().timestamp_millis().to_string())
        .unwrap_or_default()
}

impl BoardsProxyStore {
    /// Create a store for the proxy at `base_url`.
    ///
    /// `team_id` scopes assignee name lookups when columns are fetched.
    pub fn new(
        base_url: &str,
        token: Option<&str>,
        team_id: impl Into<TeamId>,
        timeout: Duration,
    ) -> Result<Self> {
        let credential = token.map(|t| (COOKIE, format!("mattermost_token={t}")));
        Ok(Self {
            client: build_client(timeout, credential)?,
            base_url: normalize_base_url(base_url),
            team_id: team_id.into(),
            block_ids: Mutex::new(HashMap::new()),
        })
    }

    pub fn team_id(&self) -> &TeamId {
        &self.team_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}/mattermost{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        check_response(request.send().await?).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let response = self.send(self.client.get(self.url(path)).query(query)).await?;
        Ok(response.json().await?)
    }

    async fn fetch_wire_board(&self, board_id: &BoardId) -> Result<WireBoard> {
        self.get_json("/board/", &[("board_id", board_id.as_str())])
            .await
    }

    async fn block_id(&self, board_id: &BoardId) -> Result<String> {
        let mut cache = self.block_ids.lock().await;
        if let Some(id) = cache.get(board_id) {
            return Ok(id.clone());
        }
        let id: String = self
            .get_json("/board/get_block_id/", &[("board_id", board_id.as_str())])
            .await?;
        debug!(board = %board_id, block = %id, "resolved tracker view block");
        cache.insert(board_id.clone(), id.clone());
        Ok(id)
    }
}

#[async_trait]
impl BoardStore for BoardsProxyStore {
    async fn list_boards(&self) -> Result<Vec<Board>> {
        let boards: Vec<WireBoard> = self
            .get_json("/boards/", &[("team_id", self.team_id.as_str())])
            .await?;
        Ok(boards.into_iter().map(Board::from).collect())
    }

    /// The new board is a copy of the service's template, so it starts with the
    /// template's `Status` options as columns.
    async fn create_board(&self, title: &str, description: &str) -> Result<Board> {
        let response = self
            .send(self.client.post(self.url("/board/")).query(&[
                ("team_id", self.team_id.as_str()),
                ("title", title),
                ("description", description),
            ]))
            .await?;
        let created: WireCreatedBoards = response.json().await?;
        let wire = created
            .boards
            .into_iter()
            .next()
            .ok_or_else(|| SyncError::unexpected_response("board creation returned no board"))?;
        debug!(board = %wire.id, "board created");
        // The answer predates the title patch
        Ok(Board::new(wire.id, title).with_description(description))
    }

    async fn delete_board(&self, board_id: &BoardId) -> Result<()> {
        self.send(
            self.client
                .delete(self.url("/board/"))
                .query(&[("board_id", board_id.as_str())]),
        )
        .await?;
        self.block_ids.lock().await.remove(board_id);
        Ok(())
    }

    async fn fetch_board(&self, board_id: &BoardId) -> Result<Board> {
        Ok(self.fetch_wire_board(board_id).await?.into())
    }

    async fn fetch_columns_with_tasks(&self, board_id: &BoardId) -> Result<Vec<Column>> {
        let columns: Vec<WireColumn> = self
            .get_json(
                "/board/columns_with_tasks/",
                &[
                    ("board_id", board_id.as_str()),
                    ("team_id", self.team_id.as_str()),
                ],
            )
            .await?;

        Ok(columns
            .into_iter()
            .map(|wire| {
                let tasks = wire
                    .tasks
                    .into_iter()
                    .map(|t| t.into_task(&wire.id))
                    .collect();
                let mut column = Column::new(wire.id, wire.title).with_tasks(tasks);
                column.sort_by_position();
                column
            })
            .collect())
    }

    async fn fetch_dependency_candidates(
        &self,
        board_id: &BoardId,
    ) -> Result<Vec<DependencyOption>> {
        let board = self.fetch_wire_board(board_id).await?;
        Ok(board
            .property(DEPENDS_ON_PROPERTY)
            .map(|p| {
                p.options
                    .iter()
                    .map(|o| DependencyOption::new(o.id.as_str(), o.value.as_str()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create_column(&self, board_id: &BoardId, title: &str) -> Result<Column> {
        let response = self
            .send(
                self.client
                    .post(self.url("/board/columns/"))
                    .query(&[("board_id", board_id.as_str()), ("new_column", title)]),
            )
            .await?;
        let board: WireBoard = response.json().await?;

        // The proxy answers with the patched board; the new column is the
        // last status option carrying the requested title.
        board
            .property(STATUS_PROPERTY)
            .and_then(|p| p.options.iter().rev().find(|o| o.value == title))
            .map(|o| Column::new(o.id.as_str(), o.value.as_str()))
            .ok_or_else(|| {
                SyncError::unexpected_response(format!(
                    "created column '{title}' missing from board"
                ))
            })
    }

    async fn rename_column(
        &self,
        board_id: &BoardId,
        column_id: &ColumnId,
        title: &str,
    ) -> Result<()> {
        self.send(self.client.patch(self.url("/board/columns/")).query(&[
            ("board_id", board_id.as_str()),
            ("column_id", column_id.as_str()),
            ("new_name", title),
        ]))
        .await?;
        Ok(())
    }

    async fn delete_column(&self, board_id: &BoardId, column_id: &ColumnId) -> Result<()> {
        // Cards are not removed with their status option, so delete them first.
        let columns = self.fetch_columns_with_tasks(board_id).await?;
        let column = columns
            .iter()
            .find(|c| &c.id == column_id)
            .ok_or_else(|| SyncError::ColumnNotFound {
                id: column_id.to_string(),
            })?;
        try_join_all(column.tasks.iter().map(|t| self.delete_task(board_id, &t.id))).await?;

        self.send(self.client.delete(self.url("/board/columns/")).query(&[
            ("board_id", board_id.as_str()),
            ("column_id", column_id.as_str()),
        ]))
        .await?;
        Ok(())
    }

    async fn create_task(
        &self,
        board_id: &BoardId,
        column_id: &ColumnId,
        position: usize,
        fields: &TaskFields,
    ) -> Result<Task> {
        if fields.start_date.is_none() {
            return Err(SyncError::missing_field("start_date"));
        }
        if fields.end_date.is_none() {
            return Err(SyncError::missing_field("end_date"));
        }
        let block_id = self.block_id(board_id).await?;
        let start_date = epoch_millis(fields.start_date);
        let end_date = epoch_millis(fields.end_date);

        let mut query = vec![
            ("board_id", board_id.as_str()),
            ("block_id", block_id.as_str()),
            ("column_id", column_id.as_str()),
            ("title", fields.title.as_str()),
            ("description", fields.description.as_str()),
            ("start_date", start_date.as_str()),
            ("end_date", end_date.as_str()),
        ];
        if let Some(assignee) = &fields.assignee {
            query.push(("assignee_id", assignee.as_str()));
        }

        let response = self
            .send(
                self.client
                    .post(self.url("/board/columns/tasks/"))
                    .query(&query)
                    .json(&fields.depends_on),
            )
            .await?;
        let blocks: Vec<WireBlock> = response.json().await?;
        let id = blocks
            .into_iter()
            .last()
            .map(|b| b.id)
            .ok_or_else(|| SyncError::unexpected_response("task creation returned no block"))?;

        Ok(Task::from_fields(
            id,
            column_id.clone(),
            position,
            fields.clone(),
        ))
    }

    async fn update_task_order(&self, board_id: &BoardId, update: &OrderUpdate) -> Result<()> {
        let Some(anchor) = update.moved_task.as_ref().or(update.task_ids.first()) else {
            debug!(column = %update.column_id, "empty column order, nothing to send");
            return Ok(());
        };
        let block_id = self.block_id(board_id).await?;
        self.send(
            self.client
                .patch(self.url("/board/task_column/"))
                .query(&[
                    ("board_id", board_id.as_str()),
                    ("block_id", block_id.as_str()),
                    ("column_id", update.column_id.as_str()),
                    ("task_id", anchor.as_str()),
                ])
                .json(&update.task_ids),
        )
        .await?;
        Ok(())
    }

    async fn update_task_fields(
        &self,
        board_id: &BoardId,
        task: &Task,
        patch: &TaskPatch,
    ) -> Result<()> {
        if let Some(title) = &patch.title {
            self.send(
                self.client
                    .patch(self.url("/board/columns/tasks/rename/"))
                    .query(&[
                        ("board_id", board_id.as_str()),
                        ("task_id", task.id.as_str()),
                        ("new_title", title.as_str()),
                    ]),
            )
            .await?;
        }

        if !patch.touches_properties() {
            return Ok(());
        }

        // The property endpoint replaces every property, so send the whole record.
        let start_date = epoch_millis(task.start_date);
        let end_date = epoch_millis(task.end_date);
        let assignee = task
            .assignee
            .as_ref()
            .map(|a| a.as_str())
            .unwrap_or_default();
        self.send(
            self.client
                .patch(self.url("/board/columns/tasks/"))
                .query(&[
                    ("board_id", board_id.as_str()),
                    ("column_id", task.column_id.as_str()),
                    ("task_id", task.id.as_str()),
                    ("description", task.description.as_str()),
                    ("start_date", start_date.as_str()),
                    ("end_date", end_date.as_str()),
                    ("assignee_id", assignee),
                ])
                .json(&task.depends_on),
        )
        .await?;
        Ok(())
    }

    async fn delete_task(&self, board_id: &BoardId, task_id: &TaskId) -> Result<()> {
        self.send(self.client.delete(self.url("/board/columns/tasks/")).query(&[
            ("board_id", board_id.as_str()),
            ("task_id", task_id.as_str()),
        ]))
        .await?;
        Ok(())
    }

    fn refreshes_candidates_on_field_update(&self) -> bool {
        true
    }
}

#[async_trait]
impl MemberDirectory for BoardsProxyStore {
    async fn fetch_members(&self, board_id: &BoardId, team_id: &TeamId) -> Result<Vec<Member>> {
        let users: Vec<WireUser> = self
            .get_json(
                "/board/members/",
                &[("board_id", board_id.as_str()), ("team_id", team_id.as_str())],
            )
            .await?;
        Ok(users.into_iter().map(Member::from).collect())
    }

    async fn add_member(&self, board_id: &BoardId, member_id: &MemberId) -> Result<()> {
        self.send(self.client.post(self.url("/add_member_to_board/")).query(&[
            ("board_id", board_id.as_str()),
            ("user_id", member_id.as_str()),
        ]))
        .await?;
        Ok(())
    }

    /// The proxy also clears the member from every task it was assigned to
    async fn remove_member(&self, board_id: &BoardId, member_id: &MemberId) -> Result<()> {
        self.send(self.client.delete(self.url("/board/members/")).query(&[
            ("board_id", board_id.as_str()),
            ("member_id", member_id.as_str()),
        ]))
        .await?;
        Ok(())
    }

    async fn search_team_users(&self, team_id: &TeamId, query: &str) -> Result<Vec<Member>> {
        let users: Vec<WireUser> = self
            .get_json(
                "/team/users/",
                &[("team_id", team_id.as_str()), ("query", query)],
            )
            .await?;
        if users.is_empty() {
            warn!(team = %team_id, query, "no team users matched");
        }
        Ok(users.into_iter().map(Member::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_epoch_millis_is_utc_midnight() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        assert_eq!(epoch_millis(Some(date)), "1735776000000");
        assert_eq!(epoch_millis(None), "");
    }

    #[test]
    fn test_wire_task_mapping() {
        let wire: WireTask = serde_json::from_value(json!({
            "id": "c1",
            "title": "Frame walls",
            "Status": "col-a",
            "Description": null,
            "Start_Date": "2025-03-01",
            "End_Date": null,
            "Depends_on": ["c0", null],
            "Assignee_Username": null,
            "Assignee_ID": ""
        }))
        .unwrap();
        let task = wire.into_task(&ColumnId::from("col-a"));
        assert_eq!(task.depends_on, vec![TaskId::from("c0")]);
        assert_eq!(task.assignee, None);
        assert_eq!(task.position, usize::MAX);
        assert_eq!(task.start_date, NaiveDate::from_ymd_opt(2025, 3, 1));
    }

    #[test]
    fn test_board_property_lookup() {
        let board: WireBoard = serde_json::from_value(json!({
            "id": "b1",
            "title": "Site",
            "cardProperties": [
                {"name": "Status", "options": [{"id": "s1", "value": "Todo"}]},
                {"name": "Depends on", "options": [{"id": "c1", "value": "Frame walls"}]}
            ]
        }))
        .unwrap();
        assert_eq!(board.property(STATUS_PROPERTY).unwrap().options[0].id, "s1");
        assert!(board.property("Assignee").is_none());
    }
}
