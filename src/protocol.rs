//! JSON bodies exchanged between the game server and its clients.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::db::{DbError, GameRecord};
use crate::games::connect_four::{GameResult, Mover, MoveOutcome, Placement, RecordedMove};

/// `POST /api/games` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGameRequest {
    /// User-facing player identifier.
    pub owner_identifier: i32,
}

/// `POST /api/games` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGameResponse {
    /// Identifier of the new game.
    pub game_id: i32,
}

/// `POST /api/games/{id}/player-move` body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlayerMoveRequest {
    /// Column to drop into. Signed so out-of-range values reach validation.
    pub column: i64,
}

/// `POST /api/games/{id}/player-move` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerMoveResponse {
    /// The player's placement.
    pub player: Placement,
    /// The opponent's reply; absent when the player's move ended the game.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opponent: Option<Placement>,
    /// Game state after the move(s).
    pub result: GameResult,
}

impl From<MoveOutcome> for PlayerMoveResponse {
    fn from(outcome: MoveOutcome) -> Self {
        Self {
            player: outcome.player,
            opponent: outcome.opponent,
            result: outcome.result,
        }
    }
}

/// `PUT /api/games/{id}/end` body. A missing result means a draw.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndGameRequest {
    /// Requested terminal result, leniently parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// One entry of `GET /api/games/{id}/moves`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveView {
    /// Column.
    pub column: usize,
    /// Row, 0 at the top.
    pub row: usize,
    /// Who moved.
    pub mover: Mover,
    /// Position in the history.
    pub turn_number: u32,
}

impl From<RecordedMove> for MoveView {
    fn from(recorded: RecordedMove) -> Self {
        Self {
            column: recorded.placement.column,
            row: recorded.placement.row,
            mover: recorded.placement.mover,
            turn_number: recorded.turn_number,
        }
    }
}

impl MoveView {
    /// The placement this move describes.
    pub fn placement(&self) -> Placement {
        Placement::new(self.column, self.row, self.mover)
    }
}

/// `GET /api/games/{id}` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    /// Game identifier.
    pub id: i32,
    /// Owner identifier.
    pub owner_identifier: i32,
    /// When the game started.
    pub start_time: NaiveDateTime,
    /// When the game ended, if it has.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveDateTime>,
    /// Current result.
    pub result: GameResult,
}

impl TryFrom<&GameRecord> for GameView {
    type Error = DbError;

    fn try_from(game: &GameRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: *game.id(),
            owner_identifier: *game.owner_identifier(),
            start_time: *game.started_at(),
            end_time: *game.ended_at(),
            result: game.parse_result()?,
        })
    }
}

/// Error reply body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human readable message.
    pub error: String,
    /// Error kind, such as `ColumnFull`.
    pub code: String,
}

/// `GET /api/games` query string.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OwnerQuery {
    /// Owner whose games to list.
    pub owner: i32,
}
