//! Ordering and synchronization engine for Kanban boards
//!
//! This crate keeps an in-memory, per-column task ordering consistent with
//! drag-and-drop gestures, a remote board store reached over HTTP, and the
//! board's list of "depends on" targets.
//!
//! ## Overview
//!
//! - **Ordering engine** - column id to ordered tasks, moved optimistically
//! - **Dependency index** - derived `{id, label}` candidates, rebuilt when the task set changes
//! - **Board stores** - a first-party REST API, a proxy in front of a third-party
//!   boards service, and an in-memory store, all behind [`BoardStore`]
//! - **Drag controller** - turns pointer gestures into [`MoveIntent`]s
//! - **Board session** - the owned state a UI drives, composing all of the above
//! - **Board copy** - [`copy_board`] duplicates a board into any store
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kanban_sync::{BoardSession, DragController, DragTarget, SyncConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SyncConfig::load()?;
//! let store = Arc::new(config.rest_store()?);
//! let mut session = BoardSession::new(store, config.board_id()?);
//! session.load().await?;
//!
//! let mut drag = DragController::new();
//! drag.pointer_down("1", "10");
//! if let Some(intent) = drag.drop(Some(DragTarget::task("1", "12"))).intent() {
//!     // Local order changes now; the store is written in the background
//!     let pending = session.apply(intent);
//!     for result in pending.settle().await {
//!         result?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Positions are dense within a column at rest. Stores always receive the full
//! id list of every column a move touched, never a single position delta.

pub mod config;
pub mod dependency;
pub mod drag;
mod error;
pub mod mirror;
pub mod ordering;
pub mod session;
pub mod store;
pub mod types;

pub use config::{Backend, SyncConfig};
pub use dependency::{dependency_set_changed, DependencyIndex};
pub use drag::{DragController, DragOutcome, DragState, DragTarget, MoveIntent};
pub use error::{Result, SyncError};
pub use mirror::{copy_board, CopyReport};
pub use ordering::{diff_orders, OrderDrift, OrderingEngine};
pub use session::{BoardSession, PendingSync, SyncOutcome};
pub use store::{BoardStore, BoardsProxyStore, MemberDirectory, MemoryStore, RestStore, StoreCall};

// Re-export commonly used types
pub use types::{
    Board, BoardId, Column, ColumnId, DependencyOption, Member, MemberId, OrderUpdate, Task,
    TaskFields, TaskId, TaskPatch, TeamId,
};
