//! Drop Four - connect four against a computer opponent
//!
//! An authoritative HTTP game server plus a terminal client that animates
//! falling pieces and records every game locally for replay.
//!
//! # Architecture
//!
//! - **Games**: Board model, win and draw rules, and the move resolver that
//!   rebuilds each board from its persisted move log
//! - **Db**: Diesel/SQLite repositories for server games and local replays
//! - **Server**: axum REST API over the resolver
//! - **Client**: REST client, animation scheduler, replay recorder and player
//! - **Tui**: ratatui front end
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use dropfour::{GameRepository, MoveResolver, RandomOpponent};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let repository = GameRepository::open("dropfour.db".to_string())?;
//! let resolver = MoveResolver::new(repository, Box::new(RandomOpponent::from_entropy()));
//! dropfour::serve(Arc::new(resolver), "127.0.0.1", 3000).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Module declarations
pub mod client;
pub mod db;
pub mod games;
pub mod protocol;

mod config;
mod server;
mod tui;

// Crate-level exports - Configuration
pub use config::{ConfigError, DEFAULT_CONFIG_FILE, DropFourConfig};

// Crate-level exports - Server
pub use server::{ApiError, SharedResolver, router, serve};

// Crate-level exports - Terminal client
pub use tui::{TUI_LOG_FILE, init_file_logging, run_play, run_replay};

// Crate-level exports - Client
pub use client::{
    AnimationScheduler, AnimationTiming, ApiClient, BoardGeometry, LiveSession, ReplayPlayer,
    ReplayRecorder, ReplayStore,
};

// Crate-level exports - Persistence
pub use db::{DbError, GameRepository, ReplayRepository};

// Crate-level exports - Game types
pub use games::connect_four::{
    Board, COLUMNS, GameResult, MoveError, MoveLogStore, MoveOutcome, MoveResolver, Mover,
    Opponent, Placement, ROWS, RandomOpponent, RecordedMove,
};
