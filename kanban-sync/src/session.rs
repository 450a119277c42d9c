//! Board session: the single entry point for user actions on one board.
//!
//! A session owns the ordering engine, the dependency index and the board
//! metadata, and persists through a shared [`BoardStore`]. Moves are applied
//! locally first and persisted in the background. Every other edit goes to the
//! store first and only touches local state once the store accepted it.
//!
//! Errors never escape an action. They come back as a [`SyncOutcome`] after
//! being logged.

use crate::dependency::{dependency_set_changed, DependencyIndex};
use crate::drag::MoveIntent;
use crate::error::{Result, SyncError};
use crate::ordering::OrderingEngine;
use crate::store::{BoardStore, MemberDirectory};
use crate::types::{
    Board, BoardId, Column, ColumnId, DependencyOption, Member, MemberId, OrderUpdate, Task,
    TaskFields, TaskId, TaskPatch, TeamId,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Result of a session action
#[derive(Debug)]
pub enum SyncOutcome<T = ()> {
    /// The store accepted the change and local state reflects it
    Applied(T),
    /// Rejected before reaching the store, or the target no longer exists
    Rejected(SyncError),
    /// The store call failed; local state was left as it was
    Failed(SyncError),
}

impl<T> SyncOutcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SyncError> {
        match self {
            Self::Applied(_) => None,
            Self::Rejected(e) | Self::Failed(e) => Some(e),
        }
    }

    pub fn into_result(self) -> Result<T> {
        match self {
            Self::Applied(value) => Ok(value),
            Self::Rejected(e) | Self::Failed(e) => Err(e),
        }
    }
}

/// Classify a store result, logging failures
fn outcome<T>(action: &str, result: Result<T>) -> SyncOutcome<T> {
    match result {
        Ok(value) => SyncOutcome::Applied(value),
        Err(e) if e.is_validation() => {
            debug!(action, error = %e, "store rejected input");
            SyncOutcome::Rejected(e)
        }
        Err(e) => {
            warn!(action, error = %e, "store call failed");
            SyncOutcome::Failed(e)
        }
    }
}

fn reject<T>(action: &str, error: SyncError) -> SyncOutcome<T> {
    debug!(action, error = %error, "rejected");
    SyncOutcome::Rejected(error)
}

fn require_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(SyncError::missing_field("title"));
    }
    Ok(())
}

/// Order updates still being persisted.
///
/// The updates of one move are written one after another in a single
/// background task, source column first. A failed write does not stop the
/// ones after it. Dropping this leaves the writes running.
#[derive(Debug, Default)]
#[must_use = "dropping PendingSync does not cancel the writes; call settle() to await them"]
pub struct PendingSync {
    columns: Vec<ColumnId>,
    handle: Option<JoinHandle<Vec<Result<()>>>>,
}

impl PendingSync {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Columns being written, in write order
    pub fn columns(&self) -> impl Iterator<Item = &ColumnId> {
        self.columns.iter()
    }

    /// Wait for the writes and return their results in write order.
    ///
    /// If the background task itself died, the single result is that error.
    pub async fn settle(self) -> Vec<Result<()>> {
        match self.handle {
            Some(handle) => handle
                .await
                .unwrap_or_else(|e| vec![Err(SyncError::from(e))]),
            None => Vec::new(),
        }
    }
}

/// Live state of one board backed by a store
#[derive(Debug)]
pub struct BoardSession<S> {
    store: Arc<S>,
    board_id: BoardId,
    team_id: Option<TeamId>,
    board: Option<Board>,
    engine: OrderingEngine,
    dependencies: DependencyIndex,
    members: Vec<Member>,
}

impl<S: BoardStore + 'static> BoardSession<S> {
    /// Create an empty session. Call [`BoardSession::load`] before use.
    pub fn new(store: Arc<S>, board_id: impl Into<BoardId>) -> Self {
        Self {
            store,
            board_id: board_id.into(),
            team_id: None,
            board: None,
            engine: OrderingEngine::new(),
            dependencies: DependencyIndex::new(),
            members: Vec::new(),
        }
    }

    /// Team used to resolve board members
    pub fn with_team(mut self, team_id: impl Into<TeamId>) -> Self {
        self.team_id = Some(team_id.into());
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn board_id(&self) -> &BoardId {
        &self.board_id
    }

    /// Board metadata, once loaded
    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    pub fn engine(&self) -> &OrderingEngine {
        &self.engine
    }

    pub fn columns(&self) -> &[Column] {
        self.engine.columns()
    }

    pub fn task(&self, task_id: &TaskId) -> Option<&Task> {
        self.engine.find_task(task_id)
    }

    pub fn dependencies(&self) -> &DependencyIndex {
        &self.dependencies
    }

    /// Dependency targets offered while editing `editing` (or a new task)
    pub fn candidates_for(&self, editing: Option<&TaskId>) -> Vec<&DependencyOption> {
        self.dependencies.candidates_for(editing)
    }

    /// Labels of a task's dependencies that still exist
    pub fn dependency_labels(&self, task_id: &TaskId) -> Vec<&DependencyOption> {
        match self.engine.find_task(task_id) {
            Some(task) => self.dependencies.labels_for(&task.depends_on),
            None => Vec::new(),
        }
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Fetch board, columns and candidates, replacing all local state.
    ///
    /// When the session already held columns, any column whose order differs
    /// from the store's is logged before being overwritten.
    pub async fn load(&mut self) -> Result<()> {
        let board = self.store.fetch_board(&self.board_id).await?;
        let columns = self.store.fetch_columns_with_tasks(&self.board_id).await?;
        let had_state = !self.engine.columns().is_empty();

        let drift = self.engine.replace_columns(columns);
        if had_state {
            for d in &drift {
                warn!(
                    column = %d.column_id,
                    local = ?d.local,
                    remote = ?d.remote,
                    "local order diverged from store"
                );
            }
        }
        info!(
            board = %board.id,
            columns = self.engine.columns().len(),
            tasks = self.engine.task_count(),
            "board loaded"
        );
        self.board = Some(board);
        self.refresh_dependencies().await;
        Ok(())
    }

    /// Re-read the candidate list, falling back to the local task set
    pub async fn refresh_dependencies(&mut self) {
        match self.store.fetch_dependency_candidates(&self.board_id).await {
            Ok(options) => self.dependencies.rebuild(options),
            Err(e) => {
                warn!(error = %e, "candidate fetch failed, rebuilding from local tasks");
                self.dependencies.rebuild_from_tasks(self.engine.all_tasks());
            }
        }
    }

    /// Apply a move locally and persist the affected column orders in the background
    pub fn apply(&mut self, intent: MoveIntent) -> PendingSync {
        let updates = match &intent {
            MoveIntent::Reorder { column, from, to } => self
                .engine
                .reorder_within_column(column, from, to)
                .into_iter()
                .collect(),
            MoveIntent::Transfer {
                source,
                task,
                target,
                before,
            } => self
                .engine
                .move_between_columns(source, task, target, before.as_ref()),
        };
        if updates.is_empty() {
            debug!(?intent, "move had no effect");
        }
        self.persist(updates)
    }

    fn persist(&self, updates: Vec<OrderUpdate>) -> PendingSync {
        if updates.is_empty() {
            return PendingSync::default();
        }
        let columns = updates.iter().map(|u| u.column_id.clone()).collect();
        let store = Arc::clone(&self.store);
        let board_id = self.board_id.clone();
        let handle = tokio::spawn(async move {
            let mut results = Vec::with_capacity(updates.len());
            for update in &updates {
                let result = store.update_task_order(&board_id, update).await;
                match &result {
                    Ok(()) => debug!(column = %update.column_id, "column order saved"),
                    Err(e) => warn!(
                        column = %update.column_id,
                        error = %e,
                        "failed to save column order; keeping local order"
                    ),
                }
                results.push(result);
            }
            results
        });
        PendingSync {
            columns,
            handle: Some(handle),
        }
    }

    pub async fn create_column(&mut self, title: &str) -> SyncOutcome<ColumnId> {
        if let Err(e) = require_title(title) {
            return reject("create_column", e);
        }
        let result = self.store.create_column(&self.board_id, title.trim()).await;
        match outcome("create_column", result) {
            SyncOutcome::Applied(column) => {
                let id = column.id.clone();
                debug!(column = %id, "column created");
                self.engine.insert_column(column);
                SyncOutcome::Applied(id)
            }
            SyncOutcome::Rejected(e) => SyncOutcome::Rejected(e),
            SyncOutcome::Failed(e) => SyncOutcome::Failed(e),
        }
    }

    pub async fn rename_column(&mut self, column_id: &ColumnId, title: &str) -> SyncOutcome {
        if let Err(e) = require_title(title) {
            return reject("rename_column", e);
        }
        if self.engine.column(column_id).is_none() {
            return reject(
                "rename_column",
                SyncError::ColumnNotFound {
                    id: column_id.to_string(),
                },
            );
        }
        let result = self
            .store
            .rename_column(&self.board_id, column_id, title.trim())
            .await;
        let outcome = outcome("rename_column", result);
        if outcome.is_applied() {
            self.engine.rename_column(column_id, title.trim());
        }
        outcome
    }

    /// Delete a column and every task in it
    pub async fn delete_column(&mut self, column_id: &ColumnId) -> SyncOutcome {
        if self.engine.column(column_id).is_none() {
            return reject(
                "delete_column",
                SyncError::ColumnNotFound {
                    id: column_id.to_string(),
                },
            );
        }
        let result = self.store.delete_column(&self.board_id, column_id).await;
        let outcome = outcome("delete_column", result);
        if outcome.is_applied() {
            if let Some(column) = self.engine.remove_column(column_id) {
                for task in &column.tasks {
                    self.dependencies.remove(&task.id);
                }
                debug!(column = %column_id, tasks = column.tasks.len(), "column deleted");
            }
            self.refresh_dependencies().await;
        }
        outcome
    }

    /// Create a task at the end of `column_id`
    pub async fn create_task(
        &mut self,
        column_id: &ColumnId,
        fields: TaskFields,
    ) -> SyncOutcome<TaskId> {
        if let Err(e) = require_title(&fields.title) {
            return reject("create_task", e);
        }
        let Some(column) = self.engine.column(column_id) else {
            return reject(
                "create_task",
                SyncError::ColumnNotFound {
                    id: column_id.to_string(),
                },
            );
        };
        let position = column.tasks.len();

        let result = self
            .store
            .create_task(&self.board_id, column_id, position, &fields)
            .await;
        match outcome("create_task", result) {
            SyncOutcome::Applied(mut task) => {
                let id = task.id.clone();
                task.column_id = column_id.clone();
                self.engine.insert_task(task);
                debug!(task = %id, column = %column_id, "task created");
                self.refresh_dependencies().await;
                SyncOutcome::Applied(id)
            }
            SyncOutcome::Rejected(e) => SyncOutcome::Rejected(e),
            SyncOutcome::Failed(e) => SyncOutcome::Failed(e),
        }
    }

    /// Persist a field edit, then mirror it locally.
    ///
    /// A dependency list equal (as a set) to the current one is dropped from
    /// the patch; an edit that changes nothing issues no store call.
    pub async fn update_task(&mut self, task_id: &TaskId, mut patch: TaskPatch) -> SyncOutcome {
        let Some(current) = self.engine.find_task(task_id) else {
            return reject(
                "update_task",
                SyncError::TaskNotFound {
                    id: task_id.to_string(),
                },
            );
        };
        if let Some(title) = &patch.title {
            if let Err(e) = require_title(title) {
                return reject("update_task", e);
            }
        }
        if let Some(deps) = &patch.depends_on {
            if deps.contains(task_id) {
                return reject(
                    "update_task",
                    SyncError::SelfDependency {
                        id: task_id.to_string(),
                    },
                );
            }
            if !dependency_set_changed(&current.depends_on, deps) {
                patch.depends_on = None;
            }
        }
        if patch.is_empty() {
            debug!(task = %task_id, "nothing to update");
            return SyncOutcome::Applied(());
        }

        let mut updated = current.clone();
        patch.apply_to(&mut updated);
        let result = self
            .store
            .update_task_fields(&self.board_id, &updated, &patch)
            .await;
        let outcome = outcome("update_task", result);
        if !outcome.is_applied() {
            return outcome;
        }

        if let Some(task) = self.engine.find_task_mut(task_id) {
            patch.apply_to(task);
        }
        if patch.title.is_some() {
            self.refresh_dependencies().await;
        } else if self.store.refreshes_candidates_on_field_update() {
            self.refresh_dependencies().await;
        }
        outcome
    }

    /// Delete a task. Tasks that depend on it keep the reference.
    pub async fn delete_task(&mut self, task_id: &TaskId) -> SyncOutcome {
        if self.engine.find_task(task_id).is_none() {
            return reject(
                "delete_task",
                SyncError::TaskNotFound {
                    id: task_id.to_string(),
                },
            );
        }
        let result = self.store.delete_task(&self.board_id, task_id).await;
        let outcome = outcome("delete_task", result);
        if outcome.is_applied() {
            self.engine.remove_task(task_id);
            self.dependencies.remove(task_id);
            debug!(task = %task_id, "task deleted");
            self.refresh_dependencies().await;
        }
        outcome
    }
}

impl<S: BoardStore + MemberDirectory + 'static> BoardSession<S> {
    fn team(&self) -> Result<&TeamId> {
        self.team_id
            .as_ref()
            .ok_or_else(|| SyncError::missing_field("team_id"))
    }

    /// Re-read the board's members
    pub async fn refresh_members(&mut self) -> SyncOutcome {
        let team = match self.team() {
            Ok(team) => team.clone(),
            Err(e) => return reject("refresh_members", e),
        };
        let result = self.store.fetch_members(&self.board_id, &team).await;
        match outcome("refresh_members", result) {
            SyncOutcome::Applied(members) => {
                debug!(count = members.len(), "members refreshed");
                self.members = members;
                SyncOutcome::Applied(())
            }
            SyncOutcome::Rejected(e) => SyncOutcome::Rejected(e),
            SyncOutcome::Failed(e) => SyncOutcome::Failed(e),
        }
    }

    /// Team users matching `query` that could be added to the board
    pub async fn search_team_users(&self, query: &str) -> SyncOutcome<Vec<Member>> {
        let team = match self.team() {
            Ok(team) => team,
            Err(e) => return reject("search_team_users", e),
        };
        outcome(
            "search_team_users",
            self.store.search_team_users(team, query).await,
        )
    }

    pub async fn add_member(&mut self, member_id: &MemberId) -> SyncOutcome {
        if self.members.iter().any(|m| &m.id == member_id) {
            debug!(member = %member_id, "already a member");
            return SyncOutcome::Applied(());
        }
        let result = self.store.add_member(&self.board_id, member_id).await;
        let outcome = outcome("add_member", result);
        if outcome.is_applied() {
            return self.refresh_members().await;
        }
        outcome
    }

    /// Remove a member. The store unassigns them from every task, so the
    /// local copies are cleared to match.
    pub async fn remove_member(&mut self, member_id: &MemberId) -> SyncOutcome {
        let result = self.store.remove_member(&self.board_id, member_id).await;
        let outcome = outcome("remove_member", result);
        if outcome.is_applied() {
            self.members.retain(|m| &m.id != member_id);
            for task in self.engine.all_tasks_mut() {
                if task.assignee.as_ref() == Some(member_id) {
                    task.assignee = None;
                }
            }
        }
        outcome
    }
}
