//! Board-level types: Board, Column, Member, DependencyOption

use super::ids::{BoardId, ColumnId, MemberId, TaskId};
use super::task::Task;
use serde::{Deserialize, Serialize};

/// Board metadata. Columns live in the ordering engine, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl Board {
    /// Create a new board with the given title
    pub fn new(id: impl Into<BoardId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A column and the tasks it holds, in display order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub title: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Column {
    pub fn new(id: impl Into<ColumnId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            tasks: Vec::new(),
        }
    }

    pub fn with_tasks(mut self, tasks: Vec<Task>) -> Self {
        self.tasks = tasks;
        self
    }

    /// Sort tasks by their stored position. Stable, so ties keep fetch order.
    pub fn sort_by_position(&mut self) {
        self.tasks.sort_by_key(|t| t.position);
    }
}

/// A user who can be assigned to tasks on an externally-backed board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub username: String,
}

impl Member {
    pub fn new(id: impl Into<MemberId>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }
}

/// One selectable "depends on" target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyOption {
    pub id: TaskId,
    pub label: String,
}

impl DependencyOption {
    pub fn new(id: impl Into<TaskId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

impl From<&Task> for DependencyOption {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            label: task.title.clone(),
        }
    }
}
