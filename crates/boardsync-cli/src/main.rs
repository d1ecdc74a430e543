//! Board Sync CLI
//!
//! Terminal host for a shared tic-tac-toe board. It plays the part of the
//! page (the game path) and the UI runtime (rendering pulled states and
//! pushing moves) around a redb-backed document store.
//!
//! The store is local to one process. redb holds an exclusive lock on the
//! database file and change notifications never leave the process, so two
//! `boardsync` processes cannot share a board through the same data
//! directory, and `show` or `reset` fail while `play` has it open.
//!
//! ## Usage
//!
//! ```bash
//! # Play a game bound to a page path (type a cell 0-8, "reset" or "quit")
//! boardsync play /games/friday
//!
//! # Print the stored board as JSON
//! boardsync show /games/friday
//!
//! # Start the board over
//! boardsync reset /games/friday
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use boardsync_core::{
    BridgeConfig, DocumentStore, GameId, GameState, PullMessage, RedbStore, StateBridge,
    BOARD_CELLS,
};
use clap::{Parser, Subcommand};
use tokio::io::AsyncBufReadExt;

/// Board Sync - shared tic-tac-toe board
#[derive(Parser)]
#[command(name = "boardsync")]
#[command(version = "0.1.0")]
#[command(about = "Board Sync - keep a shared tic-tac-toe board in sync")]
#[command(
    long_about = "Board Sync - keep a shared tic-tac-toe board in sync\n\n\
    The data directory is locked by whichever boardsync process opens it \
    first. Boards are not synchronized between processes, and show or reset \
    fail while play is running on the same data directory."
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Data directory (default: ~/.boardsync/data)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Collection holding the game documents
    #[arg(long, global = true, default_value = boardsync_core::config::DEFAULT_COLLECTION)]
    collection: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bind to a game and play it interactively
    Play {
        /// Page path identifying the game
        path: String,
    },
    /// Print the stored game state as JSON
    Show {
        /// Page path identifying the game
        path: String,
    },
    /// Replace the game with an empty board
    Reset {
        /// Page path identifying the game
        path: String,
    },
}

/// One line of player input
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Move(usize),
    Reset,
    Quit,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    match line {
        "q" | "quit" | "exit" => Input::Quit,
        "r" | "reset" => Input::Reset,
        _ => match line.parse::<usize>() {
            Ok(cell) => Input::Move(cell),
            Err(_) => Input::Unknown(line.to_string()),
        },
    }
}

/// The state after the player to move marks `cell`.
///
/// Only checks that the cell exists and is empty; no win detection.
fn apply_move(state: &GameState, cell: usize) -> Result<GameState, String> {
    if cell >= BOARD_CELLS {
        return Err(format!("Cell {} out of range (0-{})", cell, BOARD_CELLS - 1));
    }
    let mut plays = state.plays.clone();
    plays.resize(BOARD_CELLS, 0);
    if plays[cell] != 0 {
        return Err(format!("Cell {} already taken", cell));
    }
    plays[cell] = state.turn;
    let turn = if state.turn == 1 { 2 } else { 1 };
    Ok(GameState {
        plays,
        turn,
        extra: state.extra.clone(),
    })
}

fn mark(value: i64) -> char {
    match value {
        0 => '.',
        1 => 'X',
        2 => 'O',
        _ => '?',
    }
}

fn render(state: &GameState) -> String {
    let cells: Vec<char> = (0..BOARD_CELLS)
        .map(|i| mark(state.plays.get(i).copied().unwrap_or(0)))
        .collect();
    let rows: Vec<String> = cells
        .chunks(3)
        .map(|row| format!(" {} | {} | {}", row[0], row[1], row[2]))
        .collect();
    format!(
        "{}\nTurn: {} ({})",
        rows.join("\n---+---+---\n"),
        state.turn,
        mark(state.turn)
    )
}

fn show_message(msg: &PullMessage) -> Option<GameState> {
    match msg {
        PullMessage::State(state) => {
            println!("{}\n", render(state));
            Some(state.clone())
        }
        PullMessage::Failure(failure) => {
            eprintln!("Sync problem: {}", failure);
            None
        }
    }
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
}

/// Get the default data directory (~/.boardsync/data)
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".boardsync")
        .join("data")
}

fn parse_game_id(path: &str) -> Result<GameId> {
    GameId::from_path(path).map_err(|e| anyhow::anyhow!("{}", e))
}

async fn play(store: Arc<dyn DocumentStore>, path: &str, config: BridgeConfig) -> Result<()> {
    let (ports, ui) = boardsync_core::ports::channel(config.port_capacity);
    let (mut pull_rx, push_tx) = ui.split();

    let handle = match StateBridge::bind_path(store, path, config, ports).await {
        Ok(handle) => handle,
        Err(e) => {
            while let Some(msg) = pull_rx.recv().await {
                show_message(&msg);
            }
            return Err(anyhow::anyhow!("{}", e));
        }
    };

    println!("Game {}: enter a cell 0-8, \"reset\" or \"quit\"\n", handle.game_id());

    // Moves are computed against the board, so wait until we have one
    let mut current = loop {
        match pull_rx.recv().await {
            Some(msg) => {
                if let Some(state) = show_message(&msg) {
                    break state;
                }
            }
            None => anyhow::bail!("Bridge stopped before the board arrived"),
        }
    };

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            msg = pull_rx.recv() => match msg {
                Some(msg) => {
                    if let Some(state) = show_message(&msg) {
                        current = state;
                    }
                }
                None => break,
            },
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                let next = match parse_input(&line) {
                    Input::Quit => break,
                    Input::Reset => GameState::new_game(),
                    Input::Move(cell) => match apply_move(&current, cell) {
                        Ok(next) => next,
                        Err(msg) => {
                            eprintln!("{}", msg);
                            continue;
                        }
                    },
                    Input::Unknown(text) if text.is_empty() => continue,
                    Input::Unknown(text) => {
                        eprintln!("Unknown input '{}'", text);
                        continue;
                    }
                };
                current = next.clone();
                push_tx.send(next).await.context("Bridge stopped")?;
            }
        }
    }

    // Closing the push port lets the bridge finish queued writes, then stop
    drop(push_tx);
    while let Some(msg) = pull_rx.recv().await {
        show_message(&msg);
    }
    handle.wait().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    let store = RedbStore::open(data_dir.join("boardsync.redb"))
        .with_context(|| format!("Failed to open store in {}", data_dir.display()))?;
    let config = BridgeConfig::default().with_collection(cli.collection);

    match cli.command {
        Commands::Play { path } => {
            play(Arc::new(store), &path, config).await?;
        }

        Commands::Show { path } => {
            let game_id = parse_game_id(&path)?;
            let snapshot = store.get(&config.collection, game_id.as_str()).await?;
            let state = match snapshot.decode::<GameState>()? {
                Some(state) => state,
                None => GameState::new_game(),
            };
            println!("{}", serde_json::to_string_pretty(&state)?);
        }

        Commands::Reset { path } => {
            let game_id = parse_game_id(&path)?;
            let bridge = StateBridge::new(Arc::new(store), game_id, config);
            bridge.on_local_change(&GameState::new_game()).await?;
            println!("Reset {}", bridge.game_id());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("4"), Input::Move(4));
        assert_eq!(parse_input(" 8 \n"), Input::Move(8));
        assert_eq!(parse_input("quit"), Input::Quit);
        assert_eq!(parse_input("r"), Input::Reset);
        assert_eq!(parse_input("xyz"), Input::Unknown("xyz".to_string()));
    }

    #[test]
    fn test_apply_move_places_mark_and_flips_turn() {
        let next = apply_move(&GameState::new_game(), 4).unwrap();
        assert_eq!(next.plays, vec![0, 0, 0, 0, 1, 0, 0, 0, 0]);
        assert_eq!(next.turn, 2);

        let next = apply_move(&next, 0).unwrap();
        assert_eq!(next.plays, vec![2, 0, 0, 0, 1, 0, 0, 0, 0]);
        assert_eq!(next.turn, 1);
    }

    #[test]
    fn test_apply_move_rejects_bad_cells() {
        let state = apply_move(&GameState::new_game(), 4).unwrap();
        assert!(apply_move(&state, 4).unwrap_err().contains("already taken"));
        assert!(apply_move(&state, 9).unwrap_err().contains("out of range"));
    }

    #[test]
    fn test_apply_move_keeps_other_fields() {
        let state: GameState = serde_json::from_value(serde_json::json!({
            "plays": [0, 0, 0, 0, 0, 0, 0, 0, 0],
            "turn": 1,
            "players": ["ann", "bo"]
        }))
        .unwrap();

        let next = apply_move(&state, 2).unwrap();
        assert_eq!(next.plays[2], 1);
        assert_eq!(next.extra, state.extra);
    }

    #[test]
    fn test_render() {
        let state = GameState::new(vec![1, 0, 0, 0, 2, 0, 0, 0, 0], 1);
        let out = render(&state);
        assert!(out.starts_with(" X | . | .\n---+---+---\n . | O | ."));
        assert!(out.ends_with("Turn: 1 (X)"));
    }

    #[test]
    fn test_render_short_board() {
        let state = GameState::new(vec![1], 2);
        assert!(render(&state).contains(" . | . | ."));
    }
}
