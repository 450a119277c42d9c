//! Position types for task ordering.
//!
//! Positions are dense zero-based ranks. Stores never receive a single
//! position delta; they receive the full ordered id list of a column and
//! re-derive every position from list order, so replaying an update is
//! idempotent and the last update to reach the store wins.

use super::ids::{ColumnId, TaskId};
use super::task::Task;
use serde::{Deserialize, Serialize};

/// The full ordering of one column, ready to be persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub column_id: ColumnId,
    pub task_ids: Vec<TaskId>,
    /// The task that entered this column, for cross-column moves
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moved_task: Option<TaskId>,
}

impl OrderUpdate {
    /// Order update for a column whose membership did not change
    pub fn new(column_id: ColumnId, task_ids: Vec<TaskId>) -> Self {
        Self {
            column_id,
            task_ids,
            moved_task: None,
        }
    }

    /// Snapshot the current order of `tasks`
    pub fn from_tasks(column_id: ColumnId, tasks: &[Task]) -> Self {
        Self::new(column_id, tasks.iter().map(|t| t.id.clone()).collect())
    }

    /// Mark the task that was moved into this column
    pub fn with_moved_task(mut self, task_id: TaskId) -> Self {
        self.moved_task = Some(task_id);
        self
    }

    /// Position the store should derive for `task_id`
    pub fn position_of(&self, task_id: &TaskId) -> Option<usize> {
        self.task_ids.iter().position(|id| id == task_id)
    }
}

/// Rewrite `position` of every task to its index in the slice
pub fn renumber(tasks: &mut [Task]) {
    for (index, task) in tasks.iter_mut().enumerate() {
        task.position = index;
    }
}

/// True when positions are exactly `0..n` in slice order
pub fn is_dense(tasks: &[Task]) -> bool {
    tasks.iter().enumerate().all(|(i, t)| t.position == i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renumber_makes_positions_dense() {
        let mut tasks = vec![
            Task::new("a", "A", "c").with_position(4),
            Task::new("b", "B", "c").with_position(9),
        ];
        assert!(!is_dense(&tasks));
        renumber(&mut tasks);
        assert!(is_dense(&tasks));
        assert_eq!(tasks[1].position, 1);
    }

    #[test]
    fn test_order_update_position_of() {
        let update = OrderUpdate::new(
            ColumnId::from("c"),
            vec![TaskId::from("x"), TaskId::from("y")],
        );
        assert_eq!(update.position_of(&TaskId::from("y")), Some(1));
        assert_eq!(update.position_of(&TaskId::from("z")), None);
    }
}
