//! Command-line interface for dropfour.

use clap::{Parser, Subcommand};

/// Drop Four - connect four against the computer, with local replays
#[derive(Parser, Debug)]
#[command(name = "dropfour")]
#[command(about = "Connect four server and terminal client", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to dropfour.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<std::path::PathBuf>,

    /// Local replay database (overrides the configured path)
    #[arg(long, global = true)]
    pub replay_database: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP game server
    Serve {
        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Game database file (created if it doesn't exist)
        #[arg(long)]
        database: Option<String>,

        /// Seed the opponent for reproducible games
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Play a live game in the terminal
    Play {
        /// Your player identifier
        #[arg(short, long)]
        owner: Option<i32>,

        /// Game server URL
        #[arg(long)]
        server_url: Option<String>,
    },

    /// Watch a locally recorded game
    Replay {
        /// Your player identifier
        #[arg(short, long)]
        owner: Option<i32>,

        /// Session to play; opens the picker when omitted
        #[arg(short, long)]
        session: Option<i32>,
    },

    /// List locally recorded games
    Replays {
        /// Your player identifier
        #[arg(short, long)]
        owner: Option<i32>,

        /// Maximum number of sessions to show
        #[arg(long, default_value = "50")]
        limit: i64,
    },

    /// Delete the local recordings of one server game
    Purge {
        /// Server game id
        #[arg(short, long)]
        game: i32,

        /// Also delete the game on the server
        #[arg(long)]
        remote: bool,
    },

    /// Delete every local recording of a player
    PurgeAll {
        /// Your player identifier
        #[arg(short, long)]
        owner: Option<i32>,
    },
}
