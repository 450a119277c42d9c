//! Ordering engine: the per-column task sequences of one board.
//!
//! Moves are applied to the local sequences immediately (optimistically) and
//! produce [`OrderUpdate`]s describing the complete new order of every column
//! they touched. Persisting those updates is the caller's job; the engine never
//! rolls a move back.

use crate::types::{renumber, Column, ColumnId, OrderUpdate, Task, TaskId};
use serde::Serialize;
use tracing::debug;

/// Column-ordered task sequences for a single board
#[derive(Debug, Clone, Default)]
pub struct OrderingEngine {
    columns: Vec<Column>,
}

/// Difference between the local order of a column and the store's order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDrift {
    pub column_id: ColumnId,
    pub local: Vec<TaskId>,
    pub remote: Vec<TaskId>,
}

impl OrderingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an engine from fetched columns, sorting each by stored position
    pub fn from_columns(columns: Vec<Column>) -> Self {
        let mut engine = Self::new();
        engine.replace_columns(columns);
        engine
    }

    /// Replace all local state with a canonical snapshot from the store.
    ///
    /// Returns the columns whose local order differed from the snapshot.
    pub fn replace_columns(&mut self, mut columns: Vec<Column>) -> Vec<OrderDrift> {
        for column in &mut columns {
            column.sort_by_position();
            for task in &mut column.tasks {
                task.column_id = column.id.clone();
            }
            renumber(&mut column.tasks);
        }
        let drift = diff_orders(&self.columns, &columns);
        self.columns = columns;
        drift
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, id: &ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| &c.id == id)
    }

    fn column_mut(&mut self, id: &ColumnId) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| &c.id == id)
    }

    fn column_index(&self, id: &ColumnId) -> Option<usize> {
        self.columns.iter().position(|c| &c.id == id)
    }

    /// Ordered task ids of a column
    pub fn column_order(&self, id: &ColumnId) -> Option<Vec<TaskId>> {
        self.column(id)
            .map(|c| c.tasks.iter().map(|t| t.id.clone()).collect())
    }

    pub fn find_task(&self, task_id: &TaskId) -> Option<&Task> {
        self.all_tasks().find(|t| &t.id == task_id)
    }

    pub(crate) fn find_task_mut(&mut self, task_id: &TaskId) -> Option<&mut Task> {
        self.columns
            .iter_mut()
            .flat_map(|c| c.tasks.iter_mut())
            .find(|t| &t.id == task_id)
    }

    /// Column currently holding `task_id`
    pub fn column_of(&self, task_id: &TaskId) -> Option<&ColumnId> {
        self.columns
            .iter()
            .find(|c| c.tasks.iter().any(|t| &t.id == task_id))
            .map(|c| &c.id)
    }

    /// Every task on the board, column by column
    pub fn all_tasks(&self) -> impl Iterator<Item = &Task> {
        self.columns.iter().flat_map(|c| c.tasks.iter())
    }

    pub(crate) fn all_tasks_mut(&mut self) -> impl Iterator<Item = &mut Task> {
        self.columns.iter_mut().flat_map(|c| c.tasks.iter_mut())
    }

    pub fn task_count(&self) -> usize {
        self.columns.iter().map(|c| c.tasks.len()).sum()
    }

    /// Move `from` to the slot currently occupied by `to` within one column.
    ///
    /// Array-move semantics: the task is removed and reinserted, shifting the
    /// tasks in between by one. Returns `None` (and changes nothing) when the
    /// ids are equal or either task is not resident in the column.
    pub fn reorder_within_column(
        &mut self,
        column_id: &ColumnId,
        from: &TaskId,
        to: &TaskId,
    ) -> Option<OrderUpdate> {
        if from == to {
            debug!(column = %column_id, task = %from, "reorder onto itself ignored");
            return None;
        }

        let column = self.column_mut(column_id)?;
        let old_index = column.tasks.iter().position(|t| &t.id == from);
        let new_index = column.tasks.iter().position(|t| &t.id == to);
        let (Some(old_index), Some(new_index)) = (old_index, new_index) else {
            debug!(column = %column_id, %from, %to, "reorder target not in column");
            return None;
        };

        let task = column.tasks.remove(old_index);
        column.tasks.insert(new_index, task);
        renumber(&mut column.tasks);

        debug!(column = %column_id, task = %from, old_index, new_index, "reordered task");
        Some(OrderUpdate::from_tasks(column.id.clone(), &column.tasks))
    }

    /// Move a task from `source` into `target`, before `before` when it is
    /// found in the target, else at the end.
    ///
    /// Returns the order updates for the source and then the target column,
    /// or nothing when the move does not apply.
    pub fn move_between_columns(
        &mut self,
        source: &ColumnId,
        task_id: &TaskId,
        target: &ColumnId,
        before: Option<&TaskId>,
    ) -> Vec<OrderUpdate> {
        if source == target {
            debug!(column = %source, task = %task_id, "cross-column move within one column ignored");
            return Vec::new();
        }
        let (Some(source_index), Some(target_index)) =
            (self.column_index(source), self.column_index(target))
        else {
            debug!(%source, %target, "move between unknown columns ignored");
            return Vec::new();
        };
        let Some(task_index) = self.columns[source_index]
            .tasks
            .iter()
            .position(|t| &t.id == task_id)
        else {
            debug!(column = %source, task = %task_id, "moved task not in source column");
            return Vec::new();
        };

        let mut task = self.columns[source_index].tasks.remove(task_index);
        renumber(&mut self.columns[source_index].tasks);

        let target_tasks = &mut self.columns[target_index].tasks;
        let insert_at = before
            .and_then(|b| target_tasks.iter().position(|t| &t.id == b))
            .unwrap_or(target_tasks.len());
        task.column_id = target.clone();
        target_tasks.insert(insert_at, task);
        renumber(target_tasks);

        debug!(%source, %target, task = %task_id, insert_at, "moved task between columns");

        vec![
            OrderUpdate::from_tasks(source.clone(), &self.columns[source_index].tasks),
            OrderUpdate::from_tasks(target.clone(), &self.columns[target_index].tasks)
                .with_moved_task(task_id.clone()),
        ]
    }

    /// Append a column. A column with the same id is replaced.
    pub fn insert_column(&mut self, mut column: Column) {
        renumber(&mut column.tasks);
        match self.column_mut(&column.id) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
    }

    pub fn rename_column(&mut self, id: &ColumnId, title: impl Into<String>) -> bool {
        match self.column_mut(id) {
            Some(column) => {
                column.title = title.into();
                true
            }
            None => false,
        }
    }

    /// Remove a column and every task it holds
    pub fn remove_column(&mut self, id: &ColumnId) -> Option<Column> {
        let index = self.column_index(id)?;
        Some(self.columns.remove(index))
    }

    /// Append a task to the end of its column, assigning its position.
    /// Returns false when the column does not exist.
    pub fn insert_task(&mut self, mut task: Task) -> bool {
        let Some(column) = self.column_mut(&task.column_id) else {
            return false;
        };
        task.position = column.tasks.len();
        column.tasks.push(task);
        true
    }

    /// Remove a task from whichever column holds it, closing the gap
    pub fn remove_task(&mut self, task_id: &TaskId) -> Option<Task> {
        for column in &mut self.columns {
            if let Some(index) = column.tasks.iter().position(|t| &t.id == task_id) {
                let task = column.tasks.remove(index);
                renumber(&mut column.tasks);
                return Some(task);
            }
        }
        None
    }
}

/// Columns whose task order differs between `local` and `remote`.
/// A column missing on one side counts as an empty order there.
pub fn diff_orders(local: &[Column], remote: &[Column]) -> Vec<OrderDrift> {
    let ids = |c: Option<&Column>| -> Vec<TaskId> {
        c.map(|c| c.tasks.iter().map(|t| t.id.clone()).collect())
            .unwrap_or_default()
    };

    let mut drift = Vec::new();
    for column in local {
        let remote_column = remote.iter().find(|c| c.id == column.id);
        let (l, r) = (ids(Some(column)), ids(remote_column));
        if l != r {
            drift.push(OrderDrift {
                column_id: column.id.clone(),
                local: l,
                remote: r,
            });
        }
    }
    for column in remote {
        if local.iter().all(|c| c.id != column.id) && !column.tasks.is_empty() {
            drift.push(OrderDrift {
                column_id: column.id.clone(),
                local: Vec::new(),
                remote: ids(Some(column)),
            });
        }
    }
    drift
}
