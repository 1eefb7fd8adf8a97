//! Terminal UI for live play and local replays.

mod app;
mod input;
mod ui;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

use crate::client::{
    AnimationScheduler, ApiClient, LiveSession, ReplayPlayer, ReplayStore, SessionEvent,
};
use crate::config::DropFourConfig;
use crate::db::{DEFAULT_SESSION_LIMIT, ReplayRepository};
use crate::protocol::{MoveView, PlayerMoveResponse};

use app::{Action, App};

/// Log file used while the terminal is in raw mode.
pub const TUI_LOG_FILE: &str = "dropfour_tui.log";

/// Replies from network tasks.
#[derive(Debug)]
enum NetEvent {
    Move(Result<PlayerMoveResponse, String>),
    History(Result<Vec<MoveView>, String>),
}

/// Sends tracing output to [`TUI_LOG_FILE`] so it does not corrupt the screen.
pub fn init_file_logging() -> Result<()> {
    let log_file = std::fs::File::create(TUI_LOG_FILE)?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,dropfour=debug")),
        )
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .try_init();
    Ok(())
}

/// Starts a live game for `owner_identifier` and runs the terminal client.
///
/// # Errors
///
/// Returns an error if the terminal cannot be set up or the game cannot be
/// started on the server.
#[instrument(skip(config))]
pub async fn run_play(config: &DropFourConfig, owner_identifier: i32) -> Result<()> {
    info!("Starting live game");
    let api = ApiClient::new(config.server_url().clone());
    let replays = ReplayRepository::open(config.replay_database_path().clone())
        .context("Failed to open local replay database")?;
    let store: Arc<dyn ReplayStore> = Arc::new(replays.clone());

    let session = LiveSession::start(&api, store, owner_identifier, scheduler(config)).await?;
    run(App::new(session), api, ReplayPlayer::new(replays), config, None).await
}

/// Runs the terminal client without a live game, optionally starting a
/// replay of `session_id` straight away.
///
/// # Errors
///
/// Returns an error if the terminal or the replay database cannot be set up.
#[instrument(skip(config))]
pub async fn run_replay(
    config: &DropFourConfig,
    owner_identifier: i32,
    session_id: Option<i32>,
) -> Result<()> {
    info!("Starting replay-only client");
    let api = ApiClient::new(config.server_url().clone());
    let replays = ReplayRepository::open(config.replay_database_path().clone())
        .context("Failed to open local replay database")?;
    let session = LiveSession::new(owner_identifier, scheduler(config));
    run(App::new(session), api, ReplayPlayer::new(replays), config, Some(session_id)).await
}

fn scheduler(config: &DropFourConfig) -> AnimationScheduler {
    AnimationScheduler::new(*config.geometry(), *config.animation())
}

/// Sets up the terminal, runs the loop, and restores the terminal.
async fn run(
    mut app: App,
    api: ApiClient,
    player: ReplayPlayer,
    config: &DropFourConfig,
    replay_on_start: Option<Option<i32>>,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    match replay_on_start {
        Some(Some(session_id)) => play_session(&mut app, &player, session_id),
        Some(None) => open_picker(&mut app, &player),
        None => {}
    }

    let tick = Duration::from_millis(config.animation().tick_interval_ms);
    let res = event_loop(&mut terminal, &mut app, &api, &player, tick).await;

    app.session_mut().close(&api).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        error!(error = ?err, "Game loop error");
    }
    res
}

#[instrument(skip_all)]
async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    api: &ApiClient,
    player: &ReplayPlayer,
    tick: Duration,
) -> Result<()> {
    let (net_tx, mut net_rx) = mpsc::unbounded_channel();
    let mut ticker = tokio::time::interval(tick);

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        while let Ok(net) = net_rx.try_recv() {
            on_net_event(app, net);
        }

        while event::poll(Duration::ZERO)? {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match app.handle_key(key.code) {
                Action::None => {}
                Action::Quit => {
                    info!("User quit");
                    return Ok(());
                }
                Action::Drop(column) => submit_move(app, api, &net_tx, column),
                Action::OpenPicker => open_picker(app, player),
                Action::PlaySession(session_id) => play_session(app, player, session_id),
            }
        }

        ticker.tick().await;
        let event = app.session_mut().tick();
        app.on_event(event);
        if let SessionEvent::ReplayFinished { .. } = event {
            request_resync(app, api, &net_tx);
        }
    }
}

fn submit_move(
    app: &mut App,
    api: &ApiClient,
    net_tx: &mpsc::UnboundedSender<NetEvent>,
    column: usize,
) {
    let game_id = match app.session_mut().begin_move(column) {
        Ok(id) => id,
        Err(e) => {
            app.set_status(e.to_string());
            return;
        }
    };
    app.set_status(format!("Dropping into column {}...", column + 1));
    let api = api.clone();
    let tx = net_tx.clone();
    tokio::spawn(async move {
        let reply = api
            .player_move(game_id, column)
            .await
            .map_err(|e| format!("{:#}", e));
        let _ = tx.send(NetEvent::Move(reply));
    });
}

fn request_resync(app: &mut App, api: &ApiClient, net_tx: &mpsc::UnboundedSender<NetEvent>) {
    let Some(game_id) = app.session().game_id().filter(|_| app.session().needs_resync()) else {
        return;
    };
    let api = api.clone();
    let tx = net_tx.clone();
    tokio::spawn(async move {
        let moves = api.moves(game_id).await.map_err(|e| format!("{:#}", e));
        let _ = tx.send(NetEvent::History(moves));
    });
}

fn on_net_event(app: &mut App, event: NetEvent) {
    match event {
        NetEvent::Move(Ok(reply)) => {
            app.session_mut().apply_reply(reply);
            app.set_status("Your move");
        }
        NetEvent::Move(Err(e)) => {
            warn!(error = %e, "Move failed");
            app.session_mut().reply_failed();
            app.set_status(format!("Move failed: {}", e));
        }
        NetEvent::History(Ok(moves)) => match app.session_mut().resume_live(&moves) {
            Ok(()) => app.set_status("Back to the live game"),
            Err(e) => app.set_status(format!("Cannot resume live game: {:#}", e)),
        },
        NetEvent::History(Err(e)) => {
            warn!(error = %e, "Failed to reload live game");
            app.set_status(format!("Cannot reload live game: {}", e));
        }
    }
}

fn open_picker(app: &mut App, player: &ReplayPlayer) {
    match player.sessions(app.session().owner_identifier(), DEFAULT_SESSION_LIMIT) {
        Ok(sessions) => app.open_picker(sessions),
        Err(e) => app.set_status(format!("Failed to list replays: {}", e)),
    }
}

fn play_session(app: &mut App, player: &ReplayPlayer, session_id: i32) {
    match player.load(session_id) {
        Ok(replay) => match app.session_mut().start_replay(&replay) {
            Ok(()) => app.set_status(format!("Replaying session #{}", session_id)),
            Err(e) => app.set_status(format!("Cannot replay now: {}", e)),
        },
        Err(e) => app.set_status(format!("Failed to play replay: {}", e)),
    }
}
