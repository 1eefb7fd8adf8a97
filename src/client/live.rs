//! Lifecycle of one live game on the client.
//!
//! A [`LiveSession`] owns the animation scheduler and decides when input is
//! accepted, what a server reply does to the mirror, when the game is over,
//! and how an unfinished game is wrapped up on close.

use std::sync::Arc;

use anyhow::{Context, Result};
use derive_more::{Display, Error};
use tracing::{debug, info, instrument, warn};

use super::animation::{AnimationScheduler, Tick};
use super::api::ApiClient;
use super::player::LoadedReplay;
use super::recorder::{ReplayRecorder, ReplayStore};
use crate::games::connect_four::{GameResult, RecordedMove, reconstruct};
use crate::protocol::{MoveView, PlayerMoveResponse};

/// Why a move could not be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum LiveError {
    /// No live game is attached.
    #[display("No live game")]
    NoGame,
    /// The game is over, a replay is running, a piece is falling, or a reply is pending.
    #[display("Input is locked")]
    InputLocked,
}

/// What a session tick produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Nothing to animate.
    Idle,
    /// A piece moved or landed and more may follow.
    Animating,
    /// A replay drained; carries the stored result.
    ReplayFinished {
        /// Result stored with the session, if any.
        result: Option<GameResult>,
    },
    /// The live game reached a terminal result.
    GameOver {
        /// Final result.
        result: GameResult,
    },
}

/// Client-side state of a live game.
#[derive(Debug)]
pub struct LiveSession {
    owner_identifier: i32,
    game_id: Option<i32>,
    scheduler: AnimationScheduler,
    pending_result: GameResult,
    game_over: bool,
    awaiting_reply: bool,
    replaying: bool,
    replay_result: Option<GameResult>,
    parked_recorder: Option<ReplayRecorder>,
    needs_resync: bool,
}

impl LiveSession {
    /// Creates a session with no game attached.
    #[instrument(skip(scheduler))]
    pub fn new(owner_identifier: i32, scheduler: AnimationScheduler) -> Self {
        Self {
            owner_identifier,
            game_id: None,
            scheduler,
            pending_result: GameResult::InProgress,
            game_over: false,
            awaiting_reply: false,
            replaying: false,
            replay_result: None,
            parked_recorder: None,
            needs_resync: false,
        }
    }

    /// Starts a server game and a linked local recording.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot start the game. Recording
    /// failures are not errors.
    #[instrument(skip(api, store, scheduler))]
    pub async fn start(
        api: &ApiClient,
        store: Arc<dyn ReplayStore>,
        owner_identifier: i32,
        scheduler: AnimationScheduler,
    ) -> Result<Self> {
        let game_id = api
            .start_game(owner_identifier)
            .await
            .context("Failed to start game")?;
        let recorder = ReplayRecorder::start(store, owner_identifier, Some(game_id));
        let mut session = Self::new(owner_identifier, scheduler);
        session.attach_game(game_id, Some(recorder));
        Ok(session)
    }

    /// Attaches a fresh server game on an empty board.
    #[instrument(skip(self, recorder))]
    pub fn attach_game(&mut self, game_id: i32, recorder: Option<ReplayRecorder>) {
        if let Some(previous) = self.scheduler.enter_live(recorder) {
            self.parked_recorder = Some(previous);
        }
        self.finish_parked(GameResult::Draw);
        self.game_id = Some(game_id);
        self.pending_result = GameResult::InProgress;
        self.game_over = false;
        self.awaiting_reply = false;
        self.replaying = false;
        self.needs_resync = false;
        info!(game_id, owner_identifier = self.owner_identifier, "Live game attached");
    }

    /// Owner identifier.
    pub fn owner_identifier(&self) -> i32 {
        self.owner_identifier
    }

    /// Attached server game.
    pub fn game_id(&self) -> Option<i32> {
        self.game_id
    }

    /// The scheduler, for drawing.
    pub fn scheduler(&self) -> &AnimationScheduler {
        &self.scheduler
    }

    /// Result of the most recent server reply.
    pub fn pending_result(&self) -> GameResult {
        self.pending_result
    }

    /// Whether the live game has ended.
    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Whether a replay is playing.
    pub fn is_replaying(&self) -> bool {
        self.replaying
    }

    /// Whether a move request is in flight.
    pub fn is_awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    /// Whether the live board must be reloaded from the server after a replay.
    pub fn needs_resync(&self) -> bool {
        self.needs_resync
    }

    /// Whether a new move may be submitted now.
    pub fn accepts_input(&self) -> bool {
        self.game_id.is_some()
            && !self.game_over
            && !self.replaying
            && !self.needs_resync
            && !self.awaiting_reply
            && !self.scheduler.is_busy()
    }

    /// Locks input for a move into `column` and returns the game to send it to.
    ///
    /// # Errors
    ///
    /// Returns [`LiveError`] when input is not accepted right now.
    #[instrument(skip(self))]
    pub fn begin_move(&mut self, column: usize) -> Result<i32, LiveError> {
        let game_id = self.game_id.ok_or(LiveError::NoGame)?;
        if !self.accepts_input() {
            debug!("Move ignored while input is locked");
            return Err(LiveError::InputLocked);
        }
        self.awaiting_reply = true;
        Ok(game_id)
    }

    /// Queues the placements of a server reply.
    #[instrument(skip(self))]
    pub fn apply_reply(&mut self, reply: PlayerMoveResponse) {
        self.awaiting_reply = false;
        self.scheduler.enqueue(reply.player);
        if let Some(opponent) = reply.opponent {
            self.scheduler.enqueue(opponent);
        }
        self.pending_result = reply.result;
    }

    /// Releases input after a failed request. The mirror is left untouched.
    #[instrument(skip(self))]
    pub fn reply_failed(&mut self) {
        self.awaiting_reply = false;
    }

    /// Submits a move and queues the reply.
    ///
    /// # Errors
    ///
    /// Returns an error if input is locked or the request fails; in both
    /// cases the mirror is unchanged.
    #[instrument(skip(self, api))]
    pub async fn play(&mut self, api: &ApiClient, column: usize) -> Result<()> {
        let game_id = self.begin_move(column)?;
        match api.player_move(game_id, column).await {
            Ok(reply) => {
                self.apply_reply(reply);
                Ok(())
            }
            Err(e) => {
                self.reply_failed();
                Err(e.context(format!("Failed to play column {}", column)))
            }
        }
    }

    /// Advances the animation by one tick.
    #[instrument(skip(self), level = "trace")]
    pub fn tick(&mut self) -> SessionEvent {
        match self.scheduler.tick() {
            Tick::Idle => SessionEvent::Idle,
            Tick::Falling | Tick::Landed { drained: false, .. } => SessionEvent::Animating,
            Tick::Landed { drained: true, .. } => self.on_drained(),
        }
    }

    fn on_drained(&mut self) -> SessionEvent {
        if self.replaying {
            self.replaying = false;
            self.needs_resync = self.game_id.is_some() && !self.game_over;
            info!(result = ?self.replay_result, "Replay finished");
            return SessionEvent::ReplayFinished {
                result: self.replay_result,
            };
        }
        if self.pending_result.is_terminal() && !self.game_over {
            self.game_over = true;
            let result = self.pending_result;
            if let Some(recorder) = self.scheduler.recorder_mut() {
                recorder.finish(result);
            }
            info!(%result, "Game over");
            return SessionEvent::GameOver { result };
        }
        SessionEvent::Animating
    }

    /// Whether a stored replay may start now.
    ///
    /// Never while a move is in flight, live pieces are still falling, or
    /// the live board waits to be reloaded, so no confirmed move escapes
    /// the local recording.
    pub fn can_start_replay(&self) -> bool {
        !self.replaying && !self.awaiting_reply && !self.needs_resync && !self.scheduler.is_busy()
    }

    /// Replaces the board with a stored replay.
    ///
    /// The live recorder is parked so the live game can be finalized or
    /// resumed afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`LiveError::InputLocked`] when [`LiveSession::can_start_replay`]
    /// is false; nothing changes in that case.
    #[instrument(skip(self, replay))]
    pub fn start_replay(&mut self, replay: &LoadedReplay) -> Result<(), LiveError> {
        if !self.can_start_replay() {
            debug!("Replay refused while the live game is busy");
            return Err(LiveError::InputLocked);
        }
        if let Some(recorder) = replay.feed(&mut self.scheduler) {
            self.parked_recorder = Some(recorder);
        }
        self.replaying = true;
        self.replay_result = replay.final_result();
        Ok(())
    }

    /// Rebuilds the live board from the server's history after a replay.
    ///
    /// # Errors
    ///
    /// Returns an error if the history does not form a valid board.
    #[instrument(skip(self, moves), fields(count = moves.len()))]
    pub fn resume_live(&mut self, moves: &[MoveView]) -> Result<()> {
        let recorded: Vec<RecordedMove> = moves
            .iter()
            .map(|m| RecordedMove {
                placement: m.placement(),
                turn_number: m.turn_number,
            })
            .collect();
        let board = reconstruct(&recorded).context("Server history is corrupt")?;
        let recorder = self.parked_recorder.take();
        self.scheduler.enter_live(recorder);
        self.scheduler.restore(board);
        self.replaying = false;
        self.replay_result = None;
        self.needs_resync = false;
        info!(moves = moves.len(), "Live board restored");
        Ok(())
    }

    /// Finalizes an unfinished live game as a draw on close.
    ///
    /// Returns the game the server must be told about, or `None` when the
    /// game already ended, none was attached, or a replay is running.
    #[instrument(skip(self))]
    pub fn finalize_on_close(&mut self) -> Option<i32> {
        if self.replaying || self.game_over {
            return None;
        }
        let game_id = self.game_id?;
        self.game_over = true;
        if let Some(recorder) = self.scheduler.recorder_mut() {
            recorder.finish(GameResult::Draw);
        }
        self.finish_parked(GameResult::Draw);
        Some(game_id)
    }

    /// Best-effort close: ends an unfinished game on the server as a draw.
    #[instrument(skip(self, api))]
    pub async fn close(&mut self, api: &ApiClient) {
        let Some(game_id) = self.finalize_on_close() else {
            return;
        };
        if let Err(e) = api.end_game(game_id, Some("Draw")).await {
            warn!(game_id, error = %e, "Failed to end game on close");
        }
    }

    fn finish_parked(&mut self, result: GameResult) {
        if let Some(mut recorder) = self.parked_recorder.take() {
            recorder.finish(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::animation::{AnimationTiming, BoardGeometry};
    use crate::games::connect_four::{Mover, Placement};

    fn session() -> LiveSession {
        let scheduler =
            AnimationScheduler::new(BoardGeometry::default(), AnimationTiming::default());
        let mut s = LiveSession::new(7, scheduler);
        s.attach_game(1, None);
        s
    }

    fn drain(s: &mut LiveSession) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        loop {
            match s.tick() {
                SessionEvent::Idle => return events,
                SessionEvent::Animating => {}
                other => events.push(other),
            }
        }
    }

    #[test]
    fn test_input_locked_until_animation_drains() {
        let mut s = session();
        assert_eq!(s.begin_move(3), Ok(1));
        assert_eq!(s.begin_move(3), Err(LiveError::InputLocked));

        s.apply_reply(PlayerMoveResponse {
            player: Placement::new(3, 5, Mover::Player),
            opponent: Some(Placement::new(4, 5, Mover::Opponent)),
            result: GameResult::InProgress,
        });
        assert!(!s.accepts_input());
        assert!(drain(&mut s).is_empty());
        assert!(s.accepts_input());
        assert_eq!(s.scheduler().board().height(4), 1);
    }

    #[test]
    fn test_failed_request_leaves_board_alone() {
        let mut s = session();
        s.begin_move(0).unwrap();
        s.reply_failed();
        assert!(s.accepts_input());
        assert_eq!(s.scheduler().board().heights(), &[0; 7]);
    }

    #[test]
    fn test_terminal_reply_ends_game_after_animation() {
        let mut s = session();
        s.begin_move(3).unwrap();
        s.apply_reply(PlayerMoveResponse {
            player: Placement::new(3, 5, Mover::Player),
            opponent: None,
            result: GameResult::PlayerWin,
        });
        assert!(!s.is_game_over());
        assert_eq!(
            drain(&mut s),
            vec![SessionEvent::GameOver {
                result: GameResult::PlayerWin
            }]
        );
        assert!(s.is_game_over());
        assert_eq!(s.begin_move(0), Err(LiveError::InputLocked));
        assert_eq!(s.finalize_on_close(), None);
    }

    #[test]
    fn test_close_finalizes_unfinished_game_once() {
        let mut s = session();
        assert_eq!(s.finalize_on_close(), Some(1));
        assert_eq!(s.finalize_on_close(), None);
    }

    #[test]
    fn test_no_game_rejects_input() {
        let scheduler =
            AnimationScheduler::new(BoardGeometry::default(), AnimationTiming::default());
        let mut s = LiveSession::new(7, scheduler);
        assert_eq!(s.begin_move(0), Err(LiveError::NoGame));
        assert_eq!(s.finalize_on_close(), None);
    }
}
