//! Task types: Task, TaskFields, TaskPatch

use super::ids::{ColumnId, MemberId, TaskId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A task/card on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,

    /// Column currently holding the task
    pub column_id: ColumnId,

    /// Dense zero-based rank within the column
    #[serde(default)]
    pub position: usize,

    /// Dependencies. May contain ids of tasks that have since been deleted.
    #[serde(default)]
    pub depends_on: Vec<TaskId>,

    #[serde(default)]
    pub assignee: Option<MemberId>,
}

impl Task {
    /// Create a new task with the given id and title in a column
    pub fn new(id: impl Into<TaskId>, title: impl Into<String>, column_id: impl Into<ColumnId>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            start_date: None,
            end_date: None,
            column_id: column_id.into(),
            position: 0,
            depends_on: Vec::new(),
            assignee: None,
        }
    }

    /// Build a task from the fields it was created with
    pub fn from_fields(id: TaskId, column_id: ColumnId, position: usize, fields: TaskFields) -> Self {
        Self {
            id,
            title: fields.title,
            description: fields.description,
            start_date: fields.start_date,
            end_date: fields.end_date,
            column_id,
            position,
            depends_on: fields.depends_on,
            assignee: fields.assignee,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set dependencies
    pub fn with_depends_on(mut self, deps: Vec<TaskId>) -> Self {
        self.depends_on = deps;
        self
    }

    /// Set the position
    pub fn with_position(mut self, position: usize) -> Self {
        self.position = position;
        self
    }

    /// Set the date range
    pub fn with_dates(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    /// Check whether this task lists `id` as a dependency
    pub fn depends_on_task(&self, id: &TaskId) -> bool {
        self.depends_on.contains(id)
    }
}

/// Fields supplied when creating a task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFields {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub depends_on: Vec<TaskId>,
    #[serde(default)]
    pub assignee: Option<MemberId>,
}

impl TaskFields {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_depends_on(mut self, deps: Vec<TaskId>) -> Self {
        self.depends_on = deps;
        self
    }

    pub fn with_dates(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn with_assignee(mut self, assignee: impl Into<MemberId>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }
}

/// A partial update of a task's editable fields.
///
/// `None` leaves a field untouched. The nullable fields use a nested option so
/// that "clear the value" (`Some(None)`) is distinguishable from "leave it".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
    pub depends_on: Option<Vec<TaskId>>,
    pub assignee: Option<Option<MemberId>>,
}

impl TaskPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_start_date(mut self, date: Option<NaiveDate>) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn with_end_date(mut self, date: Option<NaiveDate>) -> Self {
        self.end_date = Some(date);
        self
    }

    pub fn with_depends_on(mut self, deps: Vec<TaskId>) -> Self {
        self.depends_on = Some(deps);
        self
    }

    pub fn with_assignee(mut self, assignee: Option<MemberId>) -> Self {
        self.assignee = Some(assignee);
        self
    }

    /// True when nothing would change
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && !self.touches_properties()
    }

    /// True when any field other than the title is set
    pub fn touches_properties(&self) -> bool {
        self.description.is_some()
            || self.start_date.is_some()
            || self.end_date.is_some()
            || self.depends_on.is_some()
            || self.assignee.is_some()
    }

    /// Copy the patched fields onto `task`
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(start) = self.start_date {
            task.start_date = start;
        }
        if let Some(end) = self.end_date {
            task.end_date = end;
        }
        if let Some(deps) = &self.depends_on {
            task.depends_on = deps.clone();
        }
        if let Some(assignee) = &self.assignee {
            task.assignee = assignee.clone();
        }
    }
}
