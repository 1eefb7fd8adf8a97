//! Database models and their conversions to board types.

use std::str::FromStr;

use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use tracing::instrument;

use crate::db::{DbError, schema};
use crate::games::connect_four::{GameResult, Mover, Placement, RecordedMove};

/// Authoritative game record. The board itself is never stored.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Getters, new)]
#[diesel(table_name = schema::games)]
pub struct GameRecord {
    id: i32,
    owner_identifier: i32,
    started_at: NaiveDateTime,
    ended_at: Option<NaiveDateTime>,
    result: String,
}

impl GameRecord {
    /// Parses the stored result string into a [`GameResult`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the stored text is not a known result.
    #[instrument(skip(self), fields(result = %self.result))]
    pub fn parse_result(&self) -> Result<GameResult, DbError> {
        GameResult::parse_lenient(&self.result)
            .ok_or_else(|| DbError::new(format!("Invalid result: '{}'", self.result)))
    }
}

/// Insertable game for starting a new game.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::games)]
pub struct NewGameRecord {
    owner_identifier: i32,
    result: String,
}

/// One authoritative move row.
#[derive(Debug, Clone, Queryable, Selectable, Getters)]
#[diesel(table_name = schema::moves)]
pub struct MoveRow {
    id: i32,
    game_id: i32,
    turn_number: i32,
    column_index: i32,
    row_index: i32,
    mover: String,
    played_at: NaiveDateTime,
}

impl MoveRow {
    /// Converts the row into a [`RecordedMove`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] for negative numbers or an unknown mover.
    #[instrument(skip(self), fields(id = self.id, turn_number = self.turn_number))]
    pub fn to_recorded(&self) -> Result<RecordedMove, DbError> {
        Ok(RecordedMove {
            placement: placement_from_columns(self.column_index, self.row_index, &self.mover)?,
            turn_number: u32::try_from(self.turn_number).map_err(|_| {
                DbError::new(format!("Negative turn number {}", self.turn_number))
            })?,
        })
    }
}

/// Insertable authoritative move.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::moves)]
pub struct NewMoveRow {
    game_id: i32,
    turn_number: i32,
    column_index: i32,
    row_index: i32,
    mover: String,
}

impl NewMoveRow {
    /// Builds the row for `recorded` in game `game_id`.
    pub fn from_recorded(game_id: i32, recorded: &RecordedMove) -> Self {
        let p = recorded.placement;
        Self::new(
            game_id,
            recorded.turn_number as i32,
            p.column as i32,
            p.row as i32,
            p.mover.to_string(),
        )
    }
}

/// Local replay session header.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Getters)]
#[diesel(table_name = schema::replay_sessions)]
pub struct ReplaySession {
    id: i32,
    owner_identifier: i32,
    linked_game_id: Option<i32>,
    started_at: NaiveDateTime,
    ended_at: Option<NaiveDateTime>,
    result: Option<String>,
}

impl ReplaySession {
    /// The stored result, if the session was finished.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the stored text is not a known result.
    #[instrument(skip(self), fields(id = self.id))]
    pub fn parse_result(&self) -> Result<Option<GameResult>, DbError> {
        self.result
            .as_deref()
            .map(|s| {
                GameResult::parse_lenient(s)
                    .ok_or_else(|| DbError::new(format!("Invalid result: '{}'", s)))
            })
            .transpose()
    }

    /// Returns true once the session has been finalized.
    pub fn is_finished(&self) -> bool {
        self.ended_at.is_some()
    }
}

/// Insertable replay session.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::replay_sessions)]
pub struct NewReplaySession {
    owner_identifier: i32,
    linked_game_id: Option<i32>,
}

/// One locally mirrored move.
#[derive(Debug, Clone, Queryable, Selectable, Getters)]
#[diesel(table_name = schema::replay_moves)]
pub struct ReplayMoveRow {
    id: i32,
    session_id: i32,
    move_index: i32,
    column_index: i32,
    row_index: i32,
    mover: String,
    played_at: NaiveDateTime,
}

impl ReplayMoveRow {
    /// Converts the row into a [`Placement`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] for negative coordinates or an unknown mover.
    #[instrument(skip(self), fields(id = self.id, move_index = self.move_index))]
    pub fn to_placement(&self) -> Result<Placement, DbError> {
        placement_from_columns(self.column_index, self.row_index, &self.mover)
    }
}

/// Insertable mirrored move.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::replay_moves)]
pub struct NewReplayMove {
    session_id: i32,
    move_index: i32,
    column_index: i32,
    row_index: i32,
    mover: String,
}

fn placement_from_columns(column: i32, row: i32, mover: &str) -> Result<Placement, DbError> {
    let column = usize::try_from(column)
        .map_err(|_| DbError::new(format!("Negative column {}", column)))?;
    let row = usize::try_from(row).map_err(|_| DbError::new(format!("Negative row {}", row)))?;
    let mover = Mover::from_str(mover)
        .map_err(|_| DbError::new(format!("Invalid mover: '{}'", mover)))?;
    Ok(Placement::new(column, row, mover))
}
