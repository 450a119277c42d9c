//! Board store adapters.
//!
//! A [`BoardStore`] is the remote system of record for one kind of board. The
//! engine only relies on the semantic contract below; how a variant shapes its
//! requests is private to it.
//!
//! - [`RestStore`] talks to the first-party REST backend.
//! - [`BoardsProxyStore`] talks to the proxy in front of the third-party boards
//!   service, which also exposes board membership.
//! - [`MemoryStore`] keeps everything in process.

mod boards_proxy;
mod http;
mod memory;
mod rest;

pub use boards_proxy::BoardsProxyStore;
pub use memory::{MemoryStore, StoreCall};
pub use rest::RestStore;

use crate::error::Result;
use crate::types::{
    Board, BoardId, Column, ColumnId, DependencyOption, Member, MemberId, OrderUpdate, Task,
    TaskFields, TaskId, TaskPatch, TeamId,
};
use async_trait::async_trait;

/// Persistence boundary shared by every board variant
#[async_trait]
pub trait BoardStore: Send + Sync {
    /// Boards visible to the authenticated user
    async fn list_boards(&self) -> Result<Vec<Board>>;

    /// Create an empty board. Some stores seed new boards with default columns.
    async fn create_board(&self, title: &str, description: &str) -> Result<Board>;

    /// Delete a board with all of its columns and tasks
    async fn delete_board(&self, board_id: &BoardId) -> Result<()>;

    /// Board metadata
    async fn fetch_board(&self, board_id: &BoardId) -> Result<Board>;

    /// All columns in display order, each with its tasks sorted by position
    async fn fetch_columns_with_tasks(&self, board_id: &BoardId) -> Result<Vec<Column>>;

    /// Every task that can be referenced as a dependency
    async fn fetch_dependency_candidates(&self, board_id: &BoardId)
        -> Result<Vec<DependencyOption>>;

    async fn create_column(&self, board_id: &BoardId, title: &str) -> Result<Column>;

    async fn rename_column(&self, board_id: &BoardId, column_id: &ColumnId, title: &str)
        -> Result<()>;

    /// Delete a column. No task may be left referencing it afterwards.
    async fn delete_column(&self, board_id: &BoardId, column_id: &ColumnId) -> Result<()>;

    /// Create a task at `position` (the current end of the column)
    async fn create_task(
        &self,
        board_id: &BoardId,
        column_id: &ColumnId,
        position: usize,
        fields: &TaskFields,
    ) -> Result<Task>;

    /// Persist the full order of one column
    async fn update_task_order(&self, board_id: &BoardId, update: &OrderUpdate) -> Result<()>;

    /// Persist `patch`. `task` is the record with the patch already applied.
    async fn update_task_fields(
        &self,
        board_id: &BoardId,
        task: &Task,
        patch: &TaskPatch,
    ) -> Result<()>;

    async fn delete_task(&self, board_id: &BoardId, task_id: &TaskId) -> Result<()>;

    /// Whether the dependency list must be re-read after any field update.
    ///
    /// Stores that are not the local system of record keep their own copy of
    /// the candidate list and may rewrite it on unrelated edits.
    fn refreshes_candidates_on_field_update(&self) -> bool {
        false
    }
}

/// Board membership, only offered by externally-backed boards
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn fetch_members(&self, board_id: &BoardId, team_id: &TeamId) -> Result<Vec<Member>>;

    async fn add_member(&self, board_id: &BoardId, member_id: &MemberId) -> Result<()>;

    async fn remove_member(&self, board_id: &BoardId, member_id: &MemberId) -> Result<()>;

    /// Team users whose name matches `query`, for the "add member" picker
    async fn search_team_users(&self, team_id: &TeamId, query: &str) -> Result<Vec<Member>>;
}
