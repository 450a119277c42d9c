//! Command handlers. Each runs against an already loaded session.

use anyhow::{anyhow, bail, Context, Result};
use kanban_sync::{
    copy_board, BoardId, BoardSession, BoardStore, ColumnId, DragController, DragTarget,
    MemberDirectory, MemberId, SyncOutcome, TaskFields, TaskId, TaskPatch,
};

use crate::cli::Commands;
use crate::table;

/// Turn a session outcome into a CLI error
fn check<T>(outcome: SyncOutcome<T>, action: &str) -> Result<T> {
    outcome
        .into_result()
        .with_context(|| format!("{action} failed"))
}

/// Run any command that works on every backend
pub async fn run<S: BoardStore + 'static>(
    session: &mut BoardSession<S>,
    command: Commands,
) -> Result<()> {
    match command {
        Commands::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(session.columns())?);
            } else {
                if let Some(board) = session.board() {
                    println!("{}", board.title);
                }
                println!("{}", table::columns_table(session.columns()));
            }
        }
        Commands::Move { task, column, onto } => {
            let target = drop_target(column, onto);
            move_task(session, task, target).await?
        }
        Commands::AddColumn { title } => {
            let id = check(session.create_column(&title).await, "add column")?;
            println!("Created column {id}");
        }
        Commands::AddTask {
            column,
            title,
            description,
            start,
            end,
            depends_on,
        } => {
            let fields = TaskFields::new(title)
                .with_description(description)
                .with_dates(start, end)
                .with_depends_on(depends_on.into_iter().map(TaskId::from).collect());
            let id = check(
                session.create_task(&ColumnId::from(column), fields).await,
                "add task",
            )?;
            println!("Created task {id}");
        }
        Commands::RenameTask { task, title } => {
            let patch = TaskPatch::new().with_title(title);
            check(
                session.update_task(&TaskId::from(task), patch).await,
                "rename task",
            )?;
        }
        Commands::DeleteTask { task } => {
            check(
                session.delete_task(&TaskId::from(task)).await,
                "delete task",
            )?;
        }
        Commands::Candidates { task, json } => {
            let editing = task.map(TaskId::from);
            let candidates = session.candidates_for(editing.as_ref());
            if json {
                println!("{}", serde_json::to_string_pretty(&candidates)?);
            } else {
                println!("{}", table::candidates_table(&candidates));
            }
        }
        Commands::Members { .. } => bail!("members are only available on boards proxy boards"),
        Commands::Boards | Commands::CopyBoard => bail!("board commands run against the store"),
    }
    Ok(())
}

/// Ids are used as given, so they may contain any character
fn drop_target(column: String, onto: Option<String>) -> DragTarget {
    match onto {
        Some(task) => DragTarget::task(column, task),
        None => DragTarget::column(column),
    }
}

/// Replay a drag from the task's current column onto `target`
async fn move_task<S: BoardStore + 'static>(
    session: &mut BoardSession<S>,
    task: String,
    target: DragTarget,
) -> Result<()> {
    let task = TaskId::from(task);
    let source = session
        .engine()
        .column_of(&task)
        .cloned()
        .ok_or_else(|| anyhow!("task {task} not found"))?;

    let mut drag = DragController::new();
    drag.pointer_down(source, task.clone());
    let Some(intent) = drag.drop(Some(target)).intent() else {
        println!("Nothing to move");
        return Ok(());
    };

    let pending = session.apply(intent);
    if pending.is_empty() {
        println!("Nothing to move");
        return Ok(());
    }
    let failures = pending
        .settle()
        .await
        .into_iter()
        .filter_map(|r| r.err())
        .collect::<Vec<_>>();
    if let Some(first) = failures.into_iter().next() {
        return Err(first).context("saving the new order failed");
    }
    println!("Moved task {task}");
    Ok(())
}

pub async fn boards<S: BoardStore + ?Sized>(store: &S) -> Result<()> {
    let boards = store.list_boards().await.context("list boards failed")?;
    println!("{}", table::boards_table(&boards));
    Ok(())
}

/// Copy `board_id` into a new board on the same store
pub async fn copy<S: BoardStore + ?Sized>(store: &S, board_id: &BoardId) -> Result<()> {
    let report = copy_board(store, board_id, store)
        .await
        .with_context(|| format!("copy of board {board_id} failed"))?;
    println!(
        "Created board {} with {} columns and {} tasks",
        report.board.id,
        report.columns.len(),
        report.task_count()
    );
    if report.dropped_dependencies > 0 {
        println!(
            "Dropped {} dependencies on tasks outside the board",
            report.dropped_dependencies
        );
    }
    Ok(())
}

/// Member listing and editing for boards that have members
pub async fn members<S: BoardStore + MemberDirectory + 'static>(
    session: &mut BoardSession<S>,
    search: Option<String>,
    add: Option<String>,
    remove: Option<String>,
) -> Result<()> {
    if let Some(query) = search {
        let users = check(session.search_team_users(&query).await, "search")?;
        println!("{}", table::members_table(&users));
        return Ok(());
    }

    check(session.refresh_members().await, "list members")?;
    if let Some(id) = add {
        check(session.add_member(&MemberId::from(id)).await, "add member")?;
    }
    if let Some(id) = remove {
        check(
            session.remove_member(&MemberId::from(id)).await,
            "remove member",
        )?;
    }
    println!("{}", table::members_table(session.members()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_target_keeps_dashed_ids_whole() {
        let target = drop_target(
            "0b6e-status".to_string(),
            Some("7d2e0c1a-4b5f-4c3d-9e8f-0a1b2c3d4e5f".to_string()),
        );
        assert_eq!(target.column_id(), &ColumnId::from("0b6e-status"));
        assert_eq!(
            target.task_id(),
            Some(&TaskId::from("7d2e0c1a-4b5f-4c3d-9e8f-0a1b2c3d4e5f"))
        );
        assert_eq!(
            drop_target("done-col".to_string(), None),
            DragTarget::column("done-col")
        );
    }
}
