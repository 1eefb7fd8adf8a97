//! Drop Four - Unified CLI
//!
//! Game server, terminal client and local replay tools.

#![warn(missing_docs)]

mod cli;

use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Parser;
use cli::{Cli, Command};
use dropfour::{
    ApiClient, DropFourConfig, GameRepository, MoveResolver, RandomOpponent, ReplayRepository,
};
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = DropFourConfig::load(cli.config.as_deref())?;
    if let Some(path) = cli.replay_database {
        config.set_replay_database_path(path);
    }

    match cli.command {
        Command::Serve {
            port,
            host,
            database,
            seed,
        } => {
            init_stdout_logging();
            if let Some(database) = database {
                config.set_database_path(database);
            }
            run_server(&config, host, port, seed).await
        }
        Command::Play { owner, server_url } => {
            dropfour::init_file_logging()?;
            if let Some(url) = server_url {
                config.set_server_url(url);
            }
            let owner = resolve_owner(owner, &config)?;
            dropfour::run_play(&config, owner).await
        }
        Command::Replay { owner, session } => {
            dropfour::init_file_logging()?;
            let owner = resolve_owner(owner, &config)?;
            dropfour::run_replay(&config, owner, session).await
        }
        Command::Replays { owner, limit } => {
            init_stdout_logging();
            list_replays(&config, resolve_owner(owner, &config)?, limit)
        }
        Command::Purge { game, remote } => {
            init_stdout_logging();
            purge_game(&config, game, remote).await
        }
        Command::PurgeAll { owner } => {
            init_stdout_logging();
            let owner = resolve_owner(owner, &config)?;
            let repo = ReplayRepository::open(config.replay_database_path().clone())?;
            let deleted = repo.delete_all_for_owner(owner)?;
            println!("Deleted {} local replay(s) for player {}", deleted, owner);
            Ok(())
        }
    }
}

fn init_stdout_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,dropfour=debug")),
        )
        .init();
}

/// Picks the owner from the flag, then the config; it must be positive.
fn resolve_owner(flag: Option<i32>, config: &DropFourConfig) -> Result<i32> {
    match flag.or(*config.owner_identifier()) {
        Some(owner) if owner > 0 => Ok(owner),
        Some(owner) => bail!("Player identifier must be positive, got {}", owner),
        None => bail!("Missing player identifier: pass --owner or set owner_identifier"),
    }
}

/// Run the HTTP game server
#[instrument(skip(config))]
async fn run_server(
    config: &DropFourConfig,
    host: String,
    port: u16,
    seed: Option<u64>,
) -> Result<()> {
    info!(database = %config.database_path(), "Starting Drop Four server");
    let repository = GameRepository::open(config.database_path().clone())?;
    let opponent = match seed {
        Some(seed) => RandomOpponent::seeded(seed),
        None => RandomOpponent::from_entropy(),
    };
    let resolver = Arc::new(MoveResolver::new(repository, Box::new(opponent)));
    dropfour::serve(resolver, &host, port).await
}

#[instrument(skip(config))]
fn list_replays(config: &DropFourConfig, owner: i32, limit: i64) -> Result<()> {
    let repo = ReplayRepository::open(config.replay_database_path().clone())?;
    let sessions = repo.list_sessions(owner, limit)?;
    if sessions.is_empty() {
        println!("No local replays for player {}", owner);
        return Ok(());
    }
    println!("{:<8} {:<20} {:<10} {:<8} RESULT", "SESSION", "STARTED", "GAME", "MOVES");
    for session in sessions {
        let moves = repo.load_moves(*session.id())?.len();
        let game = session
            .linked_game_id()
            .map_or_else(|| "-".to_string(), |id| id.to_string());
        println!(
            "{:<8} {:<20} {:<10} {:<8} {}",
            session.id(),
            session.started_at().format("%Y-%m-%d %H:%M:%S"),
            game,
            moves,
            session.result().as_deref().unwrap_or("unfinished"),
        );
    }
    Ok(())
}

#[instrument(skip(config))]
async fn purge_game(config: &DropFourConfig, game_id: i32, remote: bool) -> Result<()> {
    let repo = ReplayRepository::open(config.replay_database_path().clone())?;
    let deleted = repo.delete_for_game(game_id)?;
    println!("Deleted {} local replay(s) of game {}", deleted, game_id);
    if remote {
        ApiClient::new(config.server_url().clone())
            .delete_game(game_id)
            .await?;
        println!("Deleted game {} on the server", game_id);
    }
    Ok(())
}
