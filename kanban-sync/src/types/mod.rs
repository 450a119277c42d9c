//! Core types for the sync engine

mod board;
mod ids;
mod position;
mod task;

// Re-export all types
pub use board::{Board, Column, DependencyOption, Member};
pub use ids::{BoardId, ColumnId, MemberId, TaskId, TeamId};
pub use position::{is_dense, renumber, OrderUpdate};
pub use task::{Task, TaskFields, TaskPatch};
