//! Copy a board from one store to another.
//!
//! Task ids are assigned by the destination, so dependencies are written in a
//! second pass once every copied task has its new id. References to tasks that
//! are not on the source board are dropped.

use crate::error::Result;
use crate::store::BoardStore;
use crate::types::{Board, BoardId, ColumnId, TaskFields, TaskId, TaskPatch};
use std::collections::HashMap;
use tracing::{debug, info};

/// What [`copy_board`] created on the destination
#[derive(Debug, Clone)]
pub struct CopyReport {
    /// The new board
    pub board: Board,
    /// Source column id to destination column id, in display order
    pub columns: Vec<(ColumnId, ColumnId)>,
    /// Source task id to destination task id
    pub task_ids: HashMap<TaskId, TaskId>,
    /// Dependency references that could not be carried over
    pub dropped_dependencies: usize,
}

impl CopyReport {
    pub fn task_count(&self) -> usize {
        self.task_ids.len()
    }
}

/// Copy `source_board` from `source` into a new board on `destination`.
///
/// Columns keep their titles and order and tasks keep their order within each
/// column. Assignees are not copied since members belong to the source store.
/// Columns a store seeds onto new boards are removed first so the copy
/// matches the source exactly.
pub async fn copy_board<S, D>(
    source: &S,
    source_board: &BoardId,
    destination: &D,
) -> Result<CopyReport>
where
    S: BoardStore + ?Sized,
    D: BoardStore + ?Sized,
{
    let board = source.fetch_board(source_board).await?;
    let columns = source.fetch_columns_with_tasks(source_board).await?;

    let created = destination
        .create_board(&board.title, &board.description)
        .await?;
    for seeded in destination.fetch_columns_with_tasks(&created.id).await? {
        debug!(column = %seeded.id, "removing seeded column");
        destination.delete_column(&created.id, &seeded.id).await?;
    }

    let mut column_ids = Vec::with_capacity(columns.len());
    let mut task_ids = HashMap::new();
    let mut with_dependencies = Vec::new();

    for column in &columns {
        let copy = destination.create_column(&created.id, &column.title).await?;
        for (position, task) in column.tasks.iter().enumerate() {
            let fields = TaskFields::new(task.title.clone())
                .with_description(task.description.clone())
                .with_dates(task.start_date, task.end_date);
            let new_task = destination
                .create_task(&created.id, &copy.id, position, &fields)
                .await?;
            if !task.depends_on.is_empty() {
                with_dependencies.push((new_task.clone(), task.depends_on.clone()));
            }
            task_ids.insert(task.id.clone(), new_task.id);
        }
        column_ids.push((column.id.clone(), copy.id));
    }

    let mut dropped_dependencies = 0;
    for (mut task, old_deps) in with_dependencies {
        let deps: Vec<TaskId> = old_deps
            .iter()
            .filter_map(|old| {
                let mapped = task_ids.get(old).cloned();
                if mapped.is_none() {
                    debug!(task = %task.id, dependency = %old, "dependency not on source board");
                    dropped_dependencies += 1;
                }
                mapped
            })
            .collect();
        if deps.is_empty() {
            continue;
        }
        let patch = TaskPatch::new().with_depends_on(deps);
        patch.apply_to(&mut task);
        destination
            .update_task_fields(&created.id, &task, &patch)
            .await?;
    }

    info!(
        source = %source_board,
        destination = %created.id,
        columns = column_ids.len(),
        tasks = task_ids.len(),
        "board copied"
    );
    Ok(CopyReport {
        board: created,
        columns: column_ids,
        task_ids,
        dropped_dependencies,
    })
}
