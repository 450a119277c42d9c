//! kanban-sync CLI - drive a Kanban board from the terminal.
//!
//! Commands:
//! - `kanban-sync show`: Print every column and its tasks
//! - `kanban-sync boards` / `copy-board`: List boards, or copy the current one
//! - `kanban-sync move <task> <column> [--onto <task>]`: Move a task into a column or onto a card
//! - `kanban-sync add-column <title>` / `add-task <column> <title>`
//! - `kanban-sync rename-task <task> <title>` / `delete-task <task>`
//! - `kanban-sync candidates [--task <id>]`: List dependency candidates
//! - `kanban-sync members`: List, search, add or remove board members
//!
//! Exit codes:
//! - 0: Success
//! - 1: Error

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use kanban_sync::{Backend, BoardId, BoardSession, BoardStore, SyncConfig};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod table;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing with appropriate level
    let filter = if cli.debug {
        EnvFilter::new("kanban_sync=debug,kanban_sync_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };
    std::process::exit(exit_code);
}

fn load_config(cli: &Cli) -> Result<SyncConfig> {
    let config = match &cli.config {
        Some(path) => SyncConfig::load_from(path),
        None => SyncConfig::load(),
    };
    config.context("failed to load configuration")
}

fn board_id(cli: &Cli, config: &SyncConfig) -> Result<BoardId> {
    match &cli.board {
        Some(id) => Ok(BoardId::from(id.as_str())),
        None => Ok(config.board_id()?),
    }
}

/// Commands that talk to the store without loading a board first
async fn store_command<S: BoardStore>(
    store: &S,
    cli: &Cli,
    config: &SyncConfig,
) -> Option<Result<()>> {
    match cli.command {
        Commands::Boards => Some(commands::boards(store).await),
        Commands::CopyBoard => Some(match board_id(cli, config) {
            Ok(id) => commands::copy(store, &id).await,
            Err(e) => Err(e),
        }),
        _ => None,
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    match config.backend {
        Backend::Rest => {
            let store = Arc::new(config.rest_store()?);
            if let Some(result) = store_command(store.as_ref(), &cli, &config).await {
                return result;
            }
            let board_id = board_id(&cli, &config)?;
            tracing::debug!(board = %board_id, backend = ?config.backend, "opening board");
            let mut session = BoardSession::new(store, board_id);
            session.load().await.context("failed to load board")?;
            commands::run(&mut session, cli.command).await
        }
        Backend::BoardsProxy => {
            let store = Arc::new(config.boards_proxy_store()?);
            if let Some(result) = store_command(store.as_ref(), &cli, &config).await {
                return result;
            }
            let board_id = board_id(&cli, &config)?;
            tracing::debug!(board = %board_id, backend = ?config.backend, "opening board");
            let team_id = store.team_id().clone();
            let mut session = BoardSession::new(store, board_id).with_team(team_id);
            session.load().await.context("failed to load board")?;
            match cli.command {
                Commands::Members {
                    search,
                    add,
                    remove,
                } => commands::members(&mut session, search, add, remove).await,
                command => commands::run(&mut session, command).await,
            }
        }
    }
}
