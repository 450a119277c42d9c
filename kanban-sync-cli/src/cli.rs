//! CLI definition for the kanban-sync command-line interface.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// kanban-sync - drive a Kanban board from the terminal
///
/// Connection settings come from `kanban-sync.{toml,yaml,json}` in the current
/// directory and `KANBAN_SYNC_*` environment variables.
#[derive(Parser, Debug)]
#[command(name = "kanban-sync")]
#[command(version)]
#[command(about = "Kanban board ordering and sync client")]
pub struct Cli {
    /// Enable debug output to stderr
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Read configuration from this file instead of discovering one
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Board to operate on, overriding the configured board_id
    #[arg(short, long, global = true)]
    pub board: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show every column and its tasks in order
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the boards visible to the configured credentials
    Boards,
    /// Copy the board into a new board with the same columns and tasks
    CopyBoard,
    /// Move a task, as if it were dragged onto a column or onto a card in it
    Move {
        /// Task to move
        task: String,
        /// Column to drop the task into
        column: String,
        /// Drop onto this card instead of the end of the column
        #[arg(long)]
        onto: Option<String>,
    },
    /// Add a column at the end of the board
    AddColumn {
        title: String,
    },
    /// Add a task at the end of a column
    AddTask {
        /// Column to add the task to
        column: String,
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Tasks this one depends on
        #[arg(long, value_delimiter = ',')]
        depends_on: Vec<String>,
    },
    /// Rename a task
    RenameTask {
        task: String,
        title: String,
    },
    /// Delete a task
    DeleteTask {
        task: String,
    },
    /// List the tasks that can be chosen as dependencies
    Candidates {
        /// Task being edited, excluded from its own candidates
        #[arg(long)]
        task: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List board members (boards proxy only)
    Members {
        /// Search team users instead of listing members
        #[arg(long)]
        search: Option<String>,
        /// Add the team user with this id to the board
        #[arg(long, conflicts_with_all = ["search", "remove"])]
        add: Option<String>,
        /// Remove the member with this id from the board
        #[arg(long, conflicts_with = "search")]
        remove: Option<String>,
    },
}
