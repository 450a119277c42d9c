//! First-party REST board store.
//!
//! Ids are integers on the wire. Column deletion cascades on the server.

use super::http::{build_client, check_response, normalize_base_url};
use super::BoardStore;
use crate::error::{Result, SyncError};
use crate::types::{
    Board, BoardId, Column, ColumnId, DependencyOption, OrderUpdate, Task, TaskFields, TaskId,
    TaskPatch,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::try_join_all;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

/// Client for the first-party `/kanban` REST API
#[derive(Debug, Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct WireBoard {
    id: BoardId,
    title: String,
    #[serde(default)]
    description: Option<String>,
}

impl From<WireBoard> for Board {
    fn from(wire: WireBoard) -> Self {
        Board::new(wire.id, wire.title).with_description(wire.description.unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
struct WireColumn {
    id: ColumnId,
    title: String,
}

#[derive(Debug, Deserialize)]
struct WireTask {
    id: TaskId,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    position: usize,
    column_id: ColumnId,
    #[serde(default)]
    start_date: Option<NaiveDate>,
    #[serde(default)]
    end_date: Option<NaiveDate>,
    #[serde(default)]
    parent_ids: Vec<TaskId>,
}

impl From<WireTask> for Task {
    fn from(wire: WireTask) -> Self {
        Task {
            id: wire.id,
            title: wire.title,
            description: wire.description.unwrap_or_default(),
            start_date: wire.start_date,
            end_date: wire.end_date,
            column_id: wire.column_id,
            position: wire.position,
            depends_on: wire.parent_ids,
            assignee: None,
        }
    }
}

/// The backend keys everything by integer primary key
fn numeric_id(field: &str, id: &str) -> Result<i64> {
    id.parse::<i64>()
        .map_err(|_| SyncError::invalid_value(field, format!("'{id}' is not a numeric id")))
}

fn numeric_ids(field: &str, ids: &[TaskId]) -> Result<Vec<i64>> {
    ids.iter().map(|id| numeric_id(field, id.as_str())).collect()
}

impl RestStore {
    /// Create a store for `base_url`, authenticating with a bearer token when given
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        let credential = token.map(|t| (AUTHORIZATION, format!("Bearer {t}")));
        Ok(Self {
            client: build_client(timeout, credential)?,
            base_url: normalize_base_url(base_url),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/kanban{}", self.base_url, path)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T> {
        let response = self.client.get(self.url(path)).send().await?;
        let response = check_response(response).await?;
        Ok(response.json().await?)
    }

    async fn patch_task(&self, task_id: &TaskId, body: &Value) -> Result<()> {
        let id = numeric_id("task_id", task_id.as_str())?;
        let response = self
            .client
            .patch(self.url(&format!("/tasks/{id}")))
            .json(body)
            .send()
            .await?;
        check_response(response).await?;
        Ok(())
    }

    async fn fetch_column_tasks(&self, column: WireColumn) -> Result<Column> {
        let id = numeric_id("column_id", column.id.as_str())?;
        let tasks: Vec<WireTask> = self.get_json(&format!("/columns/{id}/tasks/")).await?;
        let mut column = Column::new(column.id, column.title)
            .with_tasks(tasks.into_iter().map(Task::from).collect());
        column.sort_by_position();
        Ok(column)
    }
}

#[async_trait]
impl BoardStore for RestStore {
    async fn list_boards(&self) -> Result<Vec<Board>> {
        let boards: Vec<WireBoard> = self.get_json("/boards/").await?;
        Ok(boards.into_iter().map(Board::from).collect())
    }

    async fn create_board(&self, title: &str, description: &str) -> Result<Board> {
        let response = self
            .client
            .post(self.url("/boards/"))
            .query(&[("title", title), ("description", description)])
            .send()
            .await?;
        let wire: WireBoard = check_response(response).await?.json().await?;
        debug!(board = %wire.id, "board created");
        Ok(wire.into())
    }

    async fn delete_board(&self, board_id: &BoardId) -> Result<()> {
        let id = numeric_id("board_id", board_id.as_str())?;
        let response = self
            .client
            .delete(self.url(&format!("/boards/{id}")))
            .send()
            .await?;
        check_response(response).await?;
        Ok(())
    }

    async fn fetch_board(&self, board_id: &BoardId) -> Result<Board> {
        let id = numeric_id("board_id", board_id.as_str())?;
        let wire: WireBoard = self.get_json(&format!("/boards/{id}")).await?;
        Ok(wire.into())
    }

    async fn fetch_columns_with_tasks(&self, board_id: &BoardId) -> Result<Vec<Column>> {
        let id = numeric_id("board_id", board_id.as_str())?;
        let columns: Vec<WireColumn> = self.get_json(&format!("/boards/{id}/columns/")).await?;
        debug!(board = %board_id, columns = columns.len(), "fetching column tasks");
        try_join_all(columns.into_iter().map(|c| self.fetch_column_tasks(c))).await
    }

    async fn fetch_dependency_candidates(
        &self,
        board_id: &BoardId,
    ) -> Result<Vec<DependencyOption>> {
        let id = numeric_id("board_id", board_id.as_str())?;
        let tasks: Vec<WireTask> = self.get_json(&format!("/boards/{id}/tasks/")).await?;
        Ok(tasks
            .into_iter()
            .map(|t| DependencyOption::new(t.id, t.title))
            .collect())
    }

    async fn create_column(&self, board_id: &BoardId, title: &str) -> Result<Column> {
        let id = numeric_id("board_id", board_id.as_str())?;
        let response = self
            .client
            .post(self.url(&format!("/boards/{id}/columns/")))
            .json(&json!({ "title": title }))
            .send()
            .await?;
        let wire: WireColumn = check_response(response).await?.json().await?;
        Ok(Column::new(wire.id, wire.title))
    }

    async fn rename_column(
        &self,
        _board_id: &BoardId,
        column_id: &ColumnId,
        title: &str,
    ) -> Result<()> {
        let id = numeric_id("column_id", column_id.as_str())?;
        let response = self
            .client
            .patch(self.url(&format!("/columns/{id}")))
            .json(&json!({ "title": title }))
            .send()
            .await?;
        check_response(response).await?;
        Ok(())
    }

    async fn delete_column(&self, _board_id: &BoardId, column_id: &ColumnId) -> Result<()> {
        let id = numeric_id("column_id", column_id.as_str())?;
        let response = self
            .client
            .delete(self.url(&format!("/columns/{id}")))
            .send()
            .await?;
        check_response(response).await?;
        Ok(())
    }

    async fn create_task(
        &self,
        _board_id: &BoardId,
        column_id: &ColumnId,
        position: usize,
        fields: &TaskFields,
    ) -> Result<Task> {
        let column = numeric_id("column_id", column_id.as_str())?;
        let start_date = fields
            .start_date
            .ok_or_else(|| SyncError::missing_field("start_date"))?;
        let end_date = fields
            .end_date
            .ok_or_else(|| SyncError::missing_field("end_date"))?;
        let body = json!({
            "title": fields.title,
            "description": fields.description,
            "position": position,
            "column_id": column,
            "start_date": start_date,
            "end_date": end_date,
            "parent_ids": numeric_ids("parent_ids", &fields.depends_on)?,
        });

        let response = self
            .client
            .post(self.url(&format!("/columns/{column}/tasks/")))
            .json(&body)
            .send()
            .await?;
        let wire: WireTask = check_response(response).await?.json().await?;
        Ok(wire.into())
    }

    async fn update_task_order(&self, _board_id: &BoardId, update: &OrderUpdate) -> Result<()> {
        let column = numeric_id("column_id", update.column_id.as_str())?;
        debug!(column = %update.column_id, tasks = update.task_ids.len(), "persisting column order");
        try_join_all(update.task_ids.iter().enumerate().map(|(position, task_id)| {
            let body = json!({ "position": position, "column_id": column });
            async move { self.patch_task(task_id, &body).await }
        }))
        .await?;
        Ok(())
    }

    async fn update_task_fields(
        &self,
        _board_id: &BoardId,
        task: &Task,
        patch: &TaskPatch,
    ) -> Result<()> {
        let mut body = Map::new();
        if let Some(title) = &patch.title {
            body.insert("title".into(), json!(title));
        }
        if let Some(description) = &patch.description {
            body.insert("description".into(), json!(description));
        }
        if let Some(start) = patch.start_date {
            body.insert("start_date".into(), json!(start));
        }
        if let Some(end) = patch.end_date {
            body.insert("end_date".into(), json!(end));
        }
        if let Some(deps) = &patch.depends_on {
            body.insert("parent_ids".into(), json!(numeric_ids("parent_ids", deps)?));
        }
        if patch.assignee.is_some() {
            debug!(task = %task.id, "first-party boards have no assignees; ignoring");
        }
        if body.is_empty() {
            return Ok(());
        }
        self.patch_task(&task.id, &Value::Object(body)).await
    }

    async fn delete_task(&self, _board_id: &BoardId, task_id: &TaskId) -> Result<()> {
        let id = numeric_id("task_id", task_id.as_str())?;
        let response = self
            .client
            .delete(self.url(&format!("/tasks/{id}")))
            .send()
            .await?;
        check_response(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_id() {
        assert_eq!(numeric_id("task_id", "42").unwrap(), 42);
        assert!(matches!(
            numeric_id("task_id", "abc"),
            Err(SyncError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_wire_task_conversion() {
        let wire: WireTask = serde_json::from_value(json!({
            "id": 3,
            "title": "Pour concrete",
            "description": null,
            "position": 1,
            "column_id": 9,
            "start_date": "2025-04-01",
            "end_date": "2025-04-03",
            "parent_ids": [1, 2]
        }))
        .unwrap();
        let task = Task::from(wire);
        assert_eq!(task.id, "3");
        assert_eq!(task.column_id, "9");
        assert!(task.description.is_empty());
        assert_eq!(task.depends_on, vec![TaskId::from("1"), TaskId::from("2")]);
    }
}
