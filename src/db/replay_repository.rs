//! Local replay mirror persistence.

use chrono::Utc;
use diesel::prelude::*;
use tracing::{debug, info, instrument};

use crate::db::connection::{REPLAY_MIGRATIONS, connect, run_migrations};
use crate::db::{DbError, NewReplayMove, NewReplaySession, ReplayMoveRow, ReplaySession, schema};
use crate::games::connect_four::{GameResult, Placement};

/// Default cap on listed sessions.
pub const DEFAULT_SESSION_LIMIT: i64 = 50;

/// Database repository for locally mirrored game histories.
#[derive(Debug, Clone)]
pub struct ReplayRepository {
    db_path: String,
}

impl ReplayRepository {
    /// Creates a repository over the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is invalid.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Result<Self, DbError> {
        info!(path = %db_path, "Creating ReplayRepository");
        Ok(Self { db_path })
    }

    /// Creates a repository and applies pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the database cannot be opened or migrated.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn open(db_path: String) -> Result<Self, DbError> {
        run_migrations(&db_path, REPLAY_MIGRATIONS)?;
        Self::new(db_path)
    }

    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        connect(&self.db_path)
    }

    /// Opens a new session, optionally linked to an authoritative game.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn create_session(
        &self,
        owner_identifier: i32,
        linked_game_id: Option<i32>,
    ) -> Result<ReplaySession, DbError> {
        let mut conn = self.connection()?;
        let session = diesel::insert_into(schema::replay_sessions::table)
            .values(&NewReplaySession::new(owner_identifier, linked_game_id))
            .returning(ReplaySession::as_returning())
            .get_result(&mut conn)?;
        info!(
            session_id = session.id(),
            owner_identifier,
            ?linked_game_id,
            "Replay session created"
        );
        Ok(session)
    }

    /// Writes one mirrored move at `move_index`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the index is taken, the session is missing,
    /// or a database error occurs.
    #[instrument(
        skip(self, placement),
        fields(column = placement.column, row = placement.row, mover = %placement.mover)
    )]
    pub fn add_move(
        &self,
        session_id: i32,
        move_index: i32,
        placement: Placement,
    ) -> Result<ReplayMoveRow, DbError> {
        let mut conn = self.connection()?;
        let new_move = NewReplayMove::new(
            session_id,
            move_index,
            placement.column as i32,
            placement.row as i32,
            placement.mover.to_string(),
        );
        let row = diesel::insert_into(schema::replay_moves::table)
            .values(&new_move)
            .returning(ReplayMoveRow::as_returning())
            .get_result(&mut conn)?;
        debug!(session_id, move_index, "Replay move stored");
        Ok(row)
    }

    /// Stamps the end time and result of an unfinished session.
    ///
    /// Returns `false` when the session is missing or already finished.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self), fields(result = %result))]
    pub fn finish_session(&self, session_id: i32, result: GameResult) -> Result<bool, DbError> {
        let mut conn = self.connection()?;
        let updated = diesel::update(
            schema::replay_sessions::table
                .find(session_id)
                .filter(schema::replay_sessions::ended_at.is_null()),
        )
        .set((
            schema::replay_sessions::ended_at.eq(Some(Utc::now().naive_utc())),
            schema::replay_sessions::result.eq(Some(result.to_string())),
        ))
        .execute(&mut conn)?;
        info!(session_id, updated, "Replay session finished");
        Ok(updated > 0)
    }

    /// Sessions of one owner, most recent first, at most `limit` of them.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_sessions(
        &self,
        owner_identifier: i32,
        limit: i64,
    ) -> Result<Vec<ReplaySession>, DbError> {
        let mut conn = self.connection()?;
        let sessions = schema::replay_sessions::table
            .filter(schema::replay_sessions::owner_identifier.eq(owner_identifier))
            .order((
                schema::replay_sessions::started_at.desc(),
                schema::replay_sessions::id.desc(),
            ))
            .limit(limit)
            .select(ReplaySession::as_select())
            .load(&mut conn)?;
        info!(owner_identifier, count = sessions.len(), "Replay sessions listed");
        Ok(sessions)
    }

    /// Gets one session. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_session(&self, session_id: i32) -> Result<Option<ReplaySession>, DbError> {
        let mut conn = self.connection()?;
        let session = schema::replay_sessions::table
            .find(session_id)
            .select(ReplaySession::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(session)
    }

    /// All mirrored moves of a session, ordered by move index.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn load_moves(&self, session_id: i32) -> Result<Vec<ReplayMoveRow>, DbError> {
        let mut conn = self.connection()?;
        let moves = schema::replay_moves::table
            .filter(schema::replay_moves::session_id.eq(session_id))
            .order(schema::replay_moves::move_index.asc())
            .select(ReplayMoveRow::as_select())
            .load(&mut conn)?;
        debug!(session_id, count = moves.len(), "Replay moves loaded");
        Ok(moves)
    }

    /// Deletes every session of one owner, cascading to their moves.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn delete_all_for_owner(&self, owner_identifier: i32) -> Result<usize, DbError> {
        let mut conn = self.connection()?;
        let deleted = diesel::delete(
            schema::replay_sessions::table
                .filter(schema::replay_sessions::owner_identifier.eq(owner_identifier)),
        )
        .execute(&mut conn)?;
        info!(owner_identifier, deleted, "Replay sessions purged");
        Ok(deleted)
    }

    /// Deletes the sessions linked to one authoritative game.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn delete_for_game(&self, game_id: i32) -> Result<usize, DbError> {
        let mut conn = self.connection()?;
        let deleted = diesel::delete(
            schema::replay_sessions::table
                .filter(schema::replay_sessions::linked_game_id.eq(game_id)),
        )
        .execute(&mut conn)?;
        info!(game_id, deleted, "Replay sessions for game purged");
        Ok(deleted)
    }
}
