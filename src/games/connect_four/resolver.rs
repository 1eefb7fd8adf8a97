//! Authoritative move resolution.
//!
//! Every request rebuilds the board from the durable move history, applies
//! the player's drop, checks for a win or a full board, and only then lets
//! the opponent reply. The appended moves and the resulting game state are
//! persisted together.

use std::sync::{Mutex, PoisonError};

use derive_more::{Display, Error};
use tracing::{debug, error, info, instrument, warn};

use super::locks::GameLocks;
use super::opponent::Opponent;
use super::reconstruct::{HistoryError, reconstruct};
use super::rules::{has_four, is_full};
use super::{Board, COLUMNS, GameResult, Mover, Placement, RecordedMove};
use crate::db::{DbError, GameRecord};

/// Durable, ordered, append-only move history per game.
pub trait MoveLogStore {
    /// Creates an empty game owned by `owner_identifier`.
    fn create_game(&self, owner_identifier: i32) -> Result<GameRecord, DbError>;

    /// Looks up a game record.
    fn find_game(&self, game_id: i32) -> Result<Option<GameRecord>, DbError>;

    /// Games owned by `owner_identifier`, most recent first.
    fn games_for_owner(&self, owner_identifier: i32) -> Result<Vec<GameRecord>, DbError>;

    /// All moves of a game, in ascending turn order.
    fn load_moves(&self, game_id: i32) -> Result<Vec<RecordedMove>, DbError>;

    /// Appends `moves` and stores `result` in one atomic write.
    ///
    /// A terminal `result` also stamps the game's end time.
    fn append_moves(
        &self,
        game_id: i32,
        moves: &[RecordedMove],
        result: GameResult,
    ) -> Result<(), DbError>;

    /// Stamps the end time and `result` without touching the moves.
    ///
    /// Returns `false` if the game does not exist.
    fn end_game(&self, game_id: i32, result: GameResult) -> Result<bool, DbError>;

    /// Deletes a game and its moves. Returns `false` if the game does not exist.
    fn delete_game(&self, game_id: i32) -> Result<bool, DbError>;
}

/// Why a request against a game was refused or failed.
#[derive(Debug, Clone, Display, Error)]
pub enum MoveError {
    /// The column is outside the board.
    #[display("Column {} is outside 0..7", column)]
    InvalidColumn {
        /// Requested column.
        column: i64,
    },
    /// The column is already stacked to the top.
    #[display("Column {} is full", column)]
    ColumnFull {
        /// Requested column.
        column: usize,
    },
    /// No such game.
    #[display("Game {} not found", game_id)]
    GameNotFound {
        /// Requested game.
        game_id: i32,
    },
    /// The game already has a terminal result.
    #[display("Game {} is already over ({})", game_id, result)]
    GameFinished {
        /// Requested game.
        game_id: i32,
        /// Its stored result.
        result: GameResult,
    },
    /// Owner identifiers are positive.
    #[display("Owner identifier must be positive, got {}", owner_identifier)]
    InvalidOwner {
        /// Supplied identifier.
        owner_identifier: i32,
    },
    /// The stored history cannot be replayed; the game accepts no further moves.
    #[display("Game {} has a corrupt move history: {}", game_id, source)]
    CorruptHistory {
        /// Affected game.
        game_id: i32,
        /// What the reconstruction found.
        source: HistoryError,
    },
    /// The injected opponent returned a column that is not open.
    #[display("Opponent chose illegal column {}", column)]
    IllegalOpponentChoice {
        /// The column it chose.
        column: usize,
    },
    /// The move log store failed.
    #[display("{}", source)]
    Storage {
        /// Underlying storage error.
        source: DbError,
    },
}

impl MoveError {
    /// Stable machine-readable name of the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidColumn { .. } => "InvalidColumn",
            Self::ColumnFull { .. } => "ColumnFull",
            Self::GameNotFound { .. } => "GameNotFound",
            Self::GameFinished { .. } => "GameFinished",
            Self::InvalidOwner { .. } => "InvalidOwner",
            Self::CorruptHistory { .. } => "CorruptHistory",
            Self::IllegalOpponentChoice { .. } => "IllegalOpponentChoice",
            Self::Storage { .. } => "Storage",
        }
    }
}

impl From<DbError> for MoveError {
    fn from(source: DbError) -> Self {
        Self::Storage { source }
    }
}

/// What one player move produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    /// The player's placement.
    pub player: Placement,
    /// The opponent's reply, absent when the player's move ended the game.
    pub opponent: Option<Placement>,
    /// Game state after the move(s).
    pub result: GameResult,
}

/// The authoritative state machine for player moves.
pub struct MoveResolver<S> {
    store: S,
    opponent: Mutex<Box<dyn Opponent>>,
    locks: GameLocks,
}

impl<S> std::fmt::Debug for MoveResolver<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoveResolver").field("locks", &self.locks).finish_non_exhaustive()
    }
}

impl<S: MoveLogStore> MoveResolver<S> {
    /// Creates a resolver over `store` whose replies come from `opponent`.
    #[instrument(skip_all)]
    pub fn new(store: S, opponent: Box<dyn Opponent>) -> Self {
        info!("Creating MoveResolver");
        Self {
            store,
            opponent: Mutex::new(opponent),
            locks: GameLocks::new(),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The per-game write locks.
    pub fn locks(&self) -> &GameLocks {
        &self.locks
    }

    /// Starts an empty game.
    #[instrument(skip(self))]
    pub fn start_game(&self, owner_identifier: i32) -> Result<GameRecord, MoveError> {
        if owner_identifier <= 0 {
            warn!(owner_identifier, "Rejected start for non-positive owner");
            return Err(MoveError::InvalidOwner { owner_identifier });
        }
        let game = self.store.create_game(owner_identifier)?;
        info!(game_id = game.id(), owner_identifier, "Game started");
        Ok(game)
    }

    /// Fetches a game record.
    #[instrument(skip(self))]
    pub fn game(&self, game_id: i32) -> Result<GameRecord, MoveError> {
        self.store
            .find_game(game_id)?
            .ok_or(MoveError::GameNotFound { game_id })
    }

    /// Games of one owner, most recent first.
    #[instrument(skip(self))]
    pub fn games_for_owner(&self, owner_identifier: i32) -> Result<Vec<GameRecord>, MoveError> {
        Ok(self.store.games_for_owner(owner_identifier)?)
    }

    /// The full history of a game in turn order.
    #[instrument(skip(self))]
    pub fn moves(&self, game_id: i32) -> Result<Vec<RecordedMove>, MoveError> {
        self.game(game_id)?;
        Ok(self.store.load_moves(game_id)?)
    }

    /// The current board of a game, rebuilt from its history.
    #[instrument(skip(self))]
    pub fn board(&self, game_id: i32) -> Result<Board, MoveError> {
        let moves = self.moves(game_id)?;
        reconstruct(&moves).map_err(|source| MoveError::CorruptHistory { game_id, source })
    }

    /// Resolves a player drop into `column`, followed by the opponent's reply.
    ///
    /// # Errors
    ///
    /// Rejections ([`MoveError::InvalidColumn`], [`MoveError::ColumnFull`],
    /// [`MoveError::GameNotFound`], [`MoveError::GameFinished`]) leave the
    /// history untouched. [`MoveError::CorruptHistory`] is returned for
    /// every move attempted on a game whose history cannot be replayed.
    #[instrument(skip(self))]
    pub fn play(&self, game_id: i32, column: i64) -> Result<MoveOutcome, MoveError> {
        let column = usize::try_from(column)
            .ok()
            .filter(|&c| c < COLUMNS)
            .ok_or_else(|| {
                warn!(column, "Rejected out of range column");
                MoveError::InvalidColumn { column }
            })?;

        self.game(game_id)?;
        let lock = self.locks.lock_for(game_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let game = self.game(game_id)?;
        let stored = game.parse_result()?;
        if stored.is_terminal() {
            warn!(game_id, result = %stored, "Move on a finished game");
            return Err(MoveError::GameFinished {
                game_id,
                result: stored,
            });
        }

        let history = self.store.load_moves(game_id)?;
        let mut board = reconstruct(&history).map_err(|source| {
            error!(game_id, error = %source, "Move history is corrupt, halting game");
            MoveError::CorruptHistory { game_id, source }
        })?;
        let mut next_turn = history.iter().map(|m| m.turn_number).max().unwrap_or(0) + 1;

        let player_row = board.drop_token(column, Mover::Player).ok_or_else(|| {
            warn!(game_id, column, "Rejected drop into full column");
            MoveError::ColumnFull { column }
        })?;
        let player = Placement::new(column, player_row, Mover::Player);
        let mut appended = vec![RecordedMove {
            placement: player,
            turn_number: next_turn,
        }];
        next_turn += 1;
        debug!(game_id, column, row = player_row, "Player token placed");

        let early_result = if has_four(board.grid(), Mover::Player) {
            Some(GameResult::PlayerWin)
        } else if is_full(board.heights()) {
            Some(GameResult::Draw)
        } else {
            None
        };
        if let Some(result) = early_result {
            self.store.append_moves(game_id, &appended, result)?;
            info!(game_id, %result, "Game decided by player move");
            return Ok(MoveOutcome {
                player,
                opponent: None,
                result,
            });
        }

        let legal = board.legal_columns();
        let reply_column = {
            let mut opponent = self.opponent.lock().unwrap_or_else(PoisonError::into_inner);
            opponent.choose_column(&board, &legal)
        };
        if !legal.contains(&reply_column) {
            error!(
                game_id,
                column = reply_column,
                legal = ?legal,
                "Opponent chose a closed column"
            );
            return Err(MoveError::IllegalOpponentChoice {
                column: reply_column,
            });
        }
        let reply_row = board
            .drop_token(reply_column, Mover::Opponent)
            .ok_or(MoveError::IllegalOpponentChoice {
                column: reply_column,
            })?;
        let opponent = Placement::new(reply_column, reply_row, Mover::Opponent);
        appended.push(RecordedMove {
            placement: opponent,
            turn_number: next_turn,
        });

        let result = if has_four(board.grid(), Mover::Opponent) {
            GameResult::ComputerWin
        } else if is_full(board.heights()) {
            GameResult::Draw
        } else {
            GameResult::InProgress
        };

        self.store.append_moves(game_id, &appended, result)?;
        info!(
            game_id,
            player_column = column,
            opponent_column = reply_column,
            %result,
            "Move resolved"
        );

        Ok(MoveOutcome {
            player,
            opponent: Some(opponent),
            result,
        })
    }

    /// Ends a game with `requested` (normalized, defaulting to a draw).
    ///
    /// The move history is left as is.
    #[instrument(skip(self))]
    pub fn end_game(&self, game_id: i32, requested: Option<&str>) -> Result<GameResult, MoveError> {
        let result = GameResult::terminal_or_draw(requested);
        self.game(game_id)?;
        let lock = self.locks.lock_for(game_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.store.end_game(game_id, result)? {
            return Err(MoveError::GameNotFound { game_id });
        }
        info!(game_id, %result, "Game ended");
        Ok(result)
    }

    /// Deletes a game and its history.
    #[instrument(skip(self))]
    pub fn delete_game(&self, game_id: i32) -> Result<(), MoveError> {
        self.game(game_id)?;
        let lock = self.locks.lock_for(game_id);
        let deleted = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.store.delete_game(game_id)?
        };
        if !deleted {
            return Err(MoveError::GameNotFound { game_id });
        }
        info!(game_id, "Game deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::connect_four::ROWS;
    use chrono::Utc;
    use std::collections::{HashMap, VecDeque};

    #[derive(Default)]
    struct MemoryStore {
        games: Mutex<HashMap<i32, GameRecord>>,
        moves: Mutex<HashMap<i32, Vec<RecordedMove>>>,
    }

    impl MoveLogStore for MemoryStore {
        fn create_game(&self, owner_identifier: i32) -> Result<GameRecord, DbError> {
            let mut games = self.games.lock().unwrap();
            let id = games.len() as i32 + 1;
            let game = GameRecord::new(
                id,
                owner_identifier,
                Utc::now().naive_utc(),
                None,
                GameResult::InProgress.to_string(),
            );
            games.insert(id, game.clone());
            Ok(game)
        }

        fn find_game(&self, game_id: i32) -> Result<Option<GameRecord>, DbError> {
            Ok(self.games.lock().unwrap().get(&game_id).cloned())
        }

        fn games_for_owner(&self, owner_identifier: i32) -> Result<Vec<GameRecord>, DbError> {
            Ok(self
                .games
                .lock()
                .unwrap()
                .values()
                .filter(|g| *g.owner_identifier() == owner_identifier)
                .cloned()
                .collect())
        }

        fn load_moves(&self, game_id: i32) -> Result<Vec<RecordedMove>, DbError> {
            Ok(self.moves.lock().unwrap().get(&game_id).cloned().unwrap_or_default())
        }

        fn append_moves(
            &self,
            game_id: i32,
            moves: &[RecordedMove],
            result: GameResult,
        ) -> Result<(), DbError> {
            self.moves
                .lock()
                .unwrap()
                .entry(game_id)
                .or_default()
                .extend_from_slice(moves);
            self.end_game(game_id, result)?;
            Ok(())
        }

        fn end_game(&self, game_id: i32, result: GameResult) -> Result<bool, DbError> {
            let mut games = self.games.lock().unwrap();
            let Some(game) = games.get_mut(&game_id) else {
                return Ok(false);
            };
            *game = GameRecord::new(
                *game.id(),
                *game.owner_identifier(),
                *game.started_at(),
                result.is_terminal().then(|| Utc::now().naive_utc()),
                result.to_string(),
            );
            Ok(true)
        }

        fn delete_game(&self, game_id: i32) -> Result<bool, DbError> {
            self.moves.lock().unwrap().remove(&game_id);
            Ok(self.games.lock().unwrap().remove(&game_id).is_some())
        }
    }

    struct Scripted(VecDeque<usize>);

    impl Opponent for Scripted {
        fn choose_column(&mut self, _board: &Board, legal: &[usize]) -> usize {
            self.0.pop_front().unwrap_or(legal[0])
        }
    }

    fn resolver(script: &[usize]) -> MoveResolver<MemoryStore> {
        MoveResolver::new(
            MemoryStore::default(),
            Box::new(Scripted(script.iter().copied().collect())),
        )
    }

    #[test]
    fn test_new_game_is_empty() {
        let r = resolver(&[]);
        let game = r.start_game(12).unwrap();
        assert!(r.moves(*game.id()).unwrap().is_empty());
        assert_eq!(r.board(*game.id()).unwrap(), Board::new());
    }

    #[test]
    fn test_vertical_win_skips_opponent() {
        let r = resolver(&[0, 1, 2]);
        let id = *r.start_game(1).unwrap().id();

        for expected_row in [5, 4, 3] {
            let outcome = r.play(id, 3).unwrap();
            assert_eq!(outcome.player.row, expected_row);
            assert!(outcome.opponent.is_some());
            assert_eq!(outcome.result, GameResult::InProgress);
        }

        let outcome = r.play(id, 3).unwrap();
        assert_eq!(outcome.player, Placement::new(3, 2, Mover::Player));
        assert_eq!(outcome.opponent, None);
        assert_eq!(outcome.result, GameResult::PlayerWin);
        assert_eq!(r.moves(id).unwrap().len(), 7);
        assert_eq!(r.game(id).unwrap().parse_result().unwrap(), GameResult::PlayerWin);
    }

    #[test]
    fn test_full_column_rejected_without_mutation() {
        let r = resolver(&[0, 0, 0]);
        let id = *r.start_game(1).unwrap().id();
        // Column 0 alternates player and opponent, so nobody connects four there.
        for _ in 0..3 {
            r.play(id, 0).unwrap();
        }
        assert_eq!(r.board(id).unwrap().height(0), ROWS);

        let before = r.moves(id).unwrap().len();
        assert!(matches!(r.play(id, 0), Err(MoveError::ColumnFull { column: 0 })));
        assert_eq!(r.moves(id).unwrap().len(), before);
    }

    #[test]
    fn test_invalid_column_rejected() {
        let r = resolver(&[]);
        let id = *r.start_game(1).unwrap().id();
        assert!(matches!(r.play(id, 7), Err(MoveError::InvalidColumn { column: 7 })));
        assert!(matches!(r.play(id, -1), Err(MoveError::InvalidColumn { column: -1 })));
        assert!(r.moves(id).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_game() {
        let r = resolver(&[]);
        assert!(matches!(r.play(99, 0), Err(MoveError::GameNotFound { game_id: 99 })));
        assert!(matches!(r.end_game(99, None), Err(MoveError::GameNotFound { .. })));
    }

    #[test]
    fn test_opponent_win_reported() {
        let r = resolver(&[6, 6, 6, 6]);
        let id = *r.start_game(1).unwrap().id();
        let mut last = None;
        for column in [0, 1, 0, 1] {
            last = Some(r.play(id, column).unwrap());
        }
        let outcome = last.unwrap();
        assert_eq!(outcome.result, GameResult::ComputerWin);
        assert_eq!(outcome.opponent, Some(Placement::new(6, 2, Mover::Opponent)));
        assert!(matches!(r.play(id, 2), Err(MoveError::GameFinished { .. })));
    }

    #[test]
    fn test_corrupt_history_halts_game() {
        let r = resolver(&[]);
        let id = *r.start_game(1).unwrap().id();
        r.store()
            .append_moves(
                id,
                &[RecordedMove {
                    placement: Placement::new(2, 1, Mover::Player),
                    turn_number: 1,
                }],
                GameResult::InProgress,
            )
            .unwrap();
        for _ in 0..2 {
            assert!(matches!(r.play(id, 4), Err(MoveError::CorruptHistory { .. })));
        }
        assert_eq!(r.moves(id).unwrap().len(), 1);
    }

    #[test]
    fn test_illegal_opponent_choice_is_not_persisted() {
        let r = resolver(&[9]);
        let id = *r.start_game(1).unwrap().id();
        assert!(matches!(
            r.play(id, 0),
            Err(MoveError::IllegalOpponentChoice { column: 9 })
        ));
        assert!(r.moves(id).unwrap().is_empty());
    }

    #[test]
    fn test_end_game_defaults_to_draw_and_keeps_moves() {
        let r = resolver(&[1]);
        let id = *r.start_game(1).unwrap().id();
        r.play(id, 0).unwrap();
        assert_eq!(r.end_game(id, None).unwrap(), GameResult::Draw);
        assert_eq!(r.moves(id).unwrap().len(), 2);
        assert!(r.game(id).unwrap().ended_at().is_some());
    }

    #[test]
    fn test_non_positive_owner_rejected() {
        let r = resolver(&[]);
        assert!(matches!(r.start_game(0), Err(MoveError::InvalidOwner { .. })));
    }

    #[test]
    fn test_requests_for_missing_games_leave_no_lock_entries() {
        let r = resolver(&[2]);
        for id in 100..110 {
            assert!(matches!(r.play(id, 0), Err(MoveError::GameNotFound { .. })));
            assert!(matches!(r.end_game(id, None), Err(MoveError::GameNotFound { .. })));
            assert!(matches!(r.delete_game(id), Err(MoveError::GameNotFound { .. })));
        }
        assert_eq!(r.locks().tracked(), 0);

        let id = *r.start_game(1).unwrap().id();
        r.play(id, 0).unwrap();
        assert_eq!(r.locks().tracked(), 0);
    }
}
