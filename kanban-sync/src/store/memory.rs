//! In-process board store.
//!
//! Implements the store contract without a server. Besides holding boards it
//! records each call it receives and can be told to fail, so tests can observe
//! exactly what the engine persisted and how it reacts to errors.

use super::{BoardStore, MemberDirectory};
use crate::error::{Result, SyncError};
use crate::types::{
    Board, BoardId, Column, ColumnId, DependencyOption, Member, MemberId, OrderUpdate, Task,
    TaskFields, TaskId, TaskPatch, TeamId,
};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;

/// A call received by a [`MemoryStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    ListBoards,
    CreateBoard { title: String },
    DeleteBoard { board: BoardId },
    FetchBoard,
    FetchColumns,
    FetchCandidates,
    CreateColumn { title: String },
    RenameColumn { column: ColumnId, title: String },
    DeleteColumn { column: ColumnId },
    CreateTask { column: ColumnId, position: usize, title: String },
    UpdateOrder(OrderUpdate),
    UpdateFields { task: TaskId, patch: TaskPatch },
    DeleteTask { task: TaskId },
    FetchMembers,
    AddMember { member: MemberId },
    RemoveMember { member: MemberId },
    SearchUsers { query: String },
}

impl StoreCall {
    /// Whether the call changes stored state
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Self::ListBoards
                | Self::FetchBoard
                | Self::FetchColumns
                | Self::FetchCandidates
                | Self::FetchMembers
                | Self::SearchUsers { .. }
        )
    }
}

#[derive(Debug, Clone)]
struct StoredColumn {
    board_id: BoardId,
    id: ColumnId,
    title: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    boards: Vec<Board>,
    /// Columns of every board, each board's in display order
    columns: Vec<StoredColumn>,
    /// Tasks in insertion order; ties in position keep this order
    tasks: Vec<Task>,
    members: Vec<Member>,
    team_users: Vec<Member>,
    calls: Vec<StoreCall>,
    fail_next: usize,
    failing: bool,
}

impl MemoryState {
    fn record(&mut self, call: StoreCall) -> Result<()> {
        self.calls.push(call);
        if self.failing {
            return Err(SyncError::api(503, "store unavailable"));
        }
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(SyncError::api(503, "injected failure"));
        }
        Ok(())
    }

    fn board(&self, board_id: &BoardId) -> Result<&Board> {
        self.boards
            .iter()
            .find(|b| &b.id == board_id)
            .ok_or_else(|| SyncError::api(404, format!("board {board_id} not found")))
    }

    fn column_mut(
        &mut self,
        board_id: &BoardId,
        column_id: &ColumnId,
    ) -> Result<&mut StoredColumn> {
        self.columns
            .iter_mut()
            .find(|c| &c.board_id == board_id && &c.id == column_id)
            .ok_or_else(|| SyncError::ColumnNotFound {
                id: column_id.to_string(),
            })
    }

    fn has_column(&self, board_id: &BoardId, column_id: &ColumnId) -> bool {
        self.columns
            .iter()
            .any(|c| &c.board_id == board_id && &c.id == column_id)
    }

    fn task_mut(&mut self, task_id: &TaskId) -> Result<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| &t.id == task_id)
            .ok_or_else(|| SyncError::TaskNotFound {
                id: task_id.to_string(),
            })
    }

    fn columns_with_tasks(&self, board_id: &BoardId) -> Vec<Column> {
        self.columns
            .iter()
            .filter(|c| &c.board_id == board_id)
            .map(|stored| {
                let tasks = self
                    .tasks
                    .iter()
                    .filter(|t| t.column_id == stored.id)
                    .cloned()
                    .collect();
                let mut column =
                    Column::new(stored.id.clone(), stored.title.clone()).with_tasks(tasks);
                column.sort_by_position();
                column
            })
            .collect()
    }

    fn remove_column(&mut self, column_id: &ColumnId) {
        self.columns.retain(|c| &c.id != column_id);
        self.tasks.retain(|t| &t.column_id != column_id);
    }
}

/// Board store that keeps its boards in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    latency: Option<Duration>,
    refresh_candidates: bool,
}

impl MemoryStore {
    /// Create a store holding `board` with no columns
    pub fn new(board: Board) -> Self {
        Self::default().with_board(board)
    }

    /// Add another board. Later [`with_column`](Self::with_column) calls attach to it.
    pub fn with_board(mut self, board: Board) -> Self {
        self.state.get_mut().boards.push(board);
        self
    }

    /// Add a column to the most recently added board
    pub fn with_column(mut self, id: impl Into<ColumnId>, title: impl Into<String>) -> Self {
        let state = self.state.get_mut();
        if let Some(board) = state.boards.last() {
            let column = StoredColumn {
                board_id: board.id.clone(),
                id: id.into(),
                title: title.into(),
            };
            state.columns.push(column);
        }
        self
    }

    /// Seed a task. Its `column_id` and `position` are stored as given.
    pub fn with_task(mut self, task: Task) -> Self {
        self.state.get_mut().tasks.push(task);
        self
    }

    pub fn with_members(mut self, members: Vec<Member>) -> Self {
        self.state.get_mut().members = members;
        self
    }

    /// Users that can be found with [`MemberDirectory::search_team_users`]
    pub fn with_team_users(mut self, users: Vec<Member>) -> Self {
        self.state.get_mut().team_users = users;
        self
    }

    /// Delay every call, so concurrent writes overlap
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Behave like a store that owns its own candidate list
    pub fn with_candidate_refresh(mut self, refresh: bool) -> Self {
        self.refresh_candidates = refresh;
        self
    }

    /// Fail the next `count` calls
    pub async fn fail_next(&self, count: usize) {
        self.state.lock().await.fail_next = count;
    }

    /// Fail every call until switched off
    pub async fn set_failing(&self, failing: bool) {
        self.state.lock().await.failing = failing;
    }

    /// Every call received so far, in arrival order
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn mutations(&self) -> Vec<StoreCall> {
        self.calls()
            .await
            .into_iter()
            .filter(StoreCall::is_mutation)
            .collect()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    /// Columns of the first board, bypassing call recording and failure injection
    pub async fn snapshot(&self) -> Vec<Column> {
        let state = self.state.lock().await;
        match state.boards.first() {
            Some(board) => state.columns_with_tasks(&board.id),
            None => Vec::new(),
        }
    }

    /// Columns of `board_id`, bypassing call recording and failure injection
    pub async fn snapshot_of(&self, board_id: &BoardId) -> Vec<Column> {
        self.state.lock().await.columns_with_tasks(board_id)
    }

    pub async fn task(&self, task_id: &TaskId) -> Option<Task> {
        self.state
            .lock()
            .await
            .tasks
            .iter()
            .find(|t| &t.id == task_id)
            .cloned()
    }

    /// Change a task behind the engine's back, as another client would
    pub async fn edit_task(&self, task_id: &TaskId, edit: impl FnOnce(&mut Task)) -> Result<()> {
        let mut state = self.state.lock().await;
        edit(state.task_mut(task_id)?);
        Ok(())
    }

    async fn begin(&self, call: StoreCall) -> Result<tokio::sync::MutexGuard<'_, MemoryState>> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.state.lock().await;
        state.record(call)?;
        Ok(state)
    }
}

#[async_trait]
impl BoardStore for MemoryStore {
    async fn list_boards(&self) -> Result<Vec<Board>> {
        let state = self.begin(StoreCall::ListBoards).await?;
        Ok(state.boards.clone())
    }

    async fn create_board(&self, title: &str, description: &str) -> Result<Board> {
        let mut state = self
            .begin(StoreCall::CreateBoard {
                title: title.to_string(),
            })
            .await?;
        let board = Board::new(BoardId::new(), title).with_description(description);
        state.boards.push(board.clone());
        Ok(board)
    }

    async fn delete_board(&self, board_id: &BoardId) -> Result<()> {
        let mut state = self
            .begin(StoreCall::DeleteBoard {
                board: board_id.clone(),
            })
            .await?;
        state.board(board_id)?;
        let columns: Vec<ColumnId> = state
            .columns
            .iter()
            .filter(|c| &c.board_id == board_id)
            .map(|c| c.id.clone())
            .collect();
        for column in &columns {
            state.remove_column(column);
        }
        state.boards.retain(|b| &b.id != board_id);
        Ok(())
    }

    async fn fetch_board(&self, board_id: &BoardId) -> Result<Board> {
        let state = self.begin(StoreCall::FetchBoard).await?;
        state.board(board_id).cloned()
    }

    async fn fetch_columns_with_tasks(&self, board_id: &BoardId) -> Result<Vec<Column>> {
        let state = self.begin(StoreCall::FetchColumns).await?;
        state.board(board_id)?;
        Ok(state.columns_with_tasks(board_id))
    }

    async fn fetch_dependency_candidates(
        &self,
        board_id: &BoardId,
    ) -> Result<Vec<DependencyOption>> {
        let state = self.begin(StoreCall::FetchCandidates).await?;
        state.board(board_id)?;
        Ok(state
            .columns_with_tasks(board_id)
            .iter()
            .flat_map(|c| c.tasks.iter().map(DependencyOption::from))
            .collect())
    }

    async fn create_column(&self, board_id: &BoardId, title: &str) -> Result<Column> {
        let mut state = self
            .begin(StoreCall::CreateColumn {
                title: title.to_string(),
            })
            .await?;
        state.board(board_id)?;
        let id = ColumnId::new();
        state.columns.push(StoredColumn {
            board_id: board_id.clone(),
            id: id.clone(),
            title: title.to_string(),
        });
        Ok(Column::new(id, title))
    }

    async fn rename_column(
        &self,
        board_id: &BoardId,
        column_id: &ColumnId,
        title: &str,
    ) -> Result<()> {
        let mut state = self
            .begin(StoreCall::RenameColumn {
                column: column_id.clone(),
                title: title.to_string(),
            })
            .await?;
        state.board(board_id)?;
        state.column_mut(board_id, column_id)?.title = title.to_string();
        Ok(())
    }

    async fn delete_column(&self, board_id: &BoardId, column_id: &ColumnId) -> Result<()> {
        let mut state = self
            .begin(StoreCall::DeleteColumn {
                column: column_id.clone(),
            })
            .await?;
        state.board(board_id)?;
        state.column_mut(board_id, column_id)?;
        state.remove_column(column_id);
        Ok(())
    }

    async fn create_task(
        &self,
        board_id: &BoardId,
        column_id: &ColumnId,
        position: usize,
        fields: &TaskFields,
    ) -> Result<Task> {
        let mut state = self
            .begin(StoreCall::CreateTask {
                column: column_id.clone(),
                position,
                title: fields.title.clone(),
            })
            .await?;
        state.board(board_id)?;
        if !state.has_column(board_id, column_id) {
            return Err(SyncError::ColumnNotFound {
                id: column_id.to_string(),
            });
        }
        let task = Task::from_fields(TaskId::new(), column_id.clone(), position, fields.clone());
        state.tasks.push(task.clone());
        Ok(task)
    }

    /// Applies the whole order or nothing
    async fn update_task_order(&self, board_id: &BoardId, update: &OrderUpdate) -> Result<()> {
        let mut state = self.begin(StoreCall::UpdateOrder(update.clone())).await?;
        state.board(board_id)?;
        if !state.has_column(board_id, &update.column_id) {
            return Err(SyncError::ColumnNotFound {
                id: update.column_id.to_string(),
            });
        }
        if let Some(missing) = update
            .task_ids
            .iter()
            .find(|id| !state.tasks.iter().any(|t| &t.id == *id))
        {
            return Err(SyncError::TaskNotFound {
                id: missing.to_string(),
            });
        }
        for (position, task_id) in update.task_ids.iter().enumerate() {
            let task = state.task_mut(task_id)?;
            task.column_id = update.column_id.clone();
            task.position = position;
        }
        Ok(())
    }

    async fn update_task_fields(
        &self,
        board_id: &BoardId,
        task: &Task,
        patch: &TaskPatch,
    ) -> Result<()> {
        let mut state = self
            .begin(StoreCall::UpdateFields {
                task: task.id.clone(),
                patch: patch.clone(),
            })
            .await?;
        state.board(board_id)?;
        patch.apply_to(state.task_mut(&task.id)?);
        Ok(())
    }

    async fn delete_task(&self, board_id: &BoardId, task_id: &TaskId) -> Result<()> {
        let mut state = self
            .begin(StoreCall::DeleteTask {
                task: task_id.clone(),
            })
            .await?;
        state.board(board_id)?;
        let before = state.tasks.len();
        state.tasks.retain(|t| &t.id != task_id);
        if state.tasks.len() == before {
            return Err(SyncError::TaskNotFound {
                id: task_id.to_string(),
            });
        }
        Ok(())
    }

    fn refreshes_candidates_on_field_update(&self) -> bool {
        self.refresh_candidates
    }
}

#[async_trait]
impl MemberDirectory for MemoryStore {
    async fn fetch_members(&self, board_id: &BoardId, _team_id: &TeamId) -> Result<Vec<Member>> {
        let state = self.begin(StoreCall::FetchMembers).await?;
        state.board(board_id)?;
        Ok(state.members.clone())
    }

    async fn add_member(&self, board_id: &BoardId, member_id: &MemberId) -> Result<()> {
        let mut state = self
            .begin(StoreCall::AddMember {
                member: member_id.clone(),
            })
            .await?;
        state.board(board_id)?;
        if state.members.iter().any(|m| &m.id == member_id) {
            return Ok(());
        }
        let member = state
            .team_users
            .iter()
            .find(|u| &u.id == member_id)
            .cloned()
            .ok_or_else(|| SyncError::invalid_value("member_id", "not a member of the team"))?;
        state.members.push(member);
        Ok(())
    }

    async fn remove_member(&self, board_id: &BoardId, member_id: &MemberId) -> Result<()> {
        let mut state = self
            .begin(StoreCall::RemoveMember {
                member: member_id.clone(),
            })
            .await?;
        state.board(board_id)?;
        state.members.retain(|m| &m.id != member_id);
        for task in state.tasks.iter_mut() {
            if task.assignee.as_ref() == Some(member_id) {
                task.assignee = None;
            }
        }
        Ok(())
    }

    async fn search_team_users(&self, _team_id: &TeamId, query: &str) -> Result<Vec<Member>> {
        let state = self
            .begin(StoreCall::SearchUsers {
                query: query.to_string(),
            })
            .await?;
        let query = query.to_lowercase();
        Ok(state
            .team_users
            .iter()
            .filter(|u| u.username.to_lowercase().contains(&query))
            .cloned()
            .collect())
    }
}
