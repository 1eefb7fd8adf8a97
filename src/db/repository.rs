//! Authoritative game and move persistence.

use chrono::Utc;
use diesel::prelude::*;
use tracing::{debug, info, instrument};

use crate::db::connection::{SERVER_MIGRATIONS, connect, run_migrations};
use crate::db::{DbError, GameRecord, MoveRow, NewGameRecord, NewMoveRow, schema};
use crate::games::connect_four::{GameResult, MoveLogStore, RecordedMove};

/// Database repository for games and their move histories.
#[derive(Debug, Clone)]
pub struct GameRepository {
    db_path: String,
}

impl GameRepository {
    /// Creates a repository over the database at the given path.
    ///
    /// The schema is expected to exist already; see [`GameRepository::open`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is invalid.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Result<Self, DbError> {
        info!(path = %db_path, "Creating GameRepository");
        Ok(Self { db_path })
    }

    /// Creates a repository and applies pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the database cannot be opened or migrated.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn open(db_path: String) -> Result<Self, DbError> {
        run_migrations(&db_path, SERVER_MIGRATIONS)?;
        Self::new(db_path)
    }

    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        connect(&self.db_path)
    }
}

impl MoveLogStore for GameRepository {
    #[instrument(skip(self))]
    fn create_game(&self, owner_identifier: i32) -> Result<GameRecord, DbError> {
        let mut conn = self.connection()?;
        let new_game = NewGameRecord::new(owner_identifier, GameResult::InProgress.to_string());

        let game = diesel::insert_into(schema::games::table)
            .values(&new_game)
            .returning(GameRecord::as_returning())
            .get_result(&mut conn)?;

        info!(game_id = game.id(), owner_identifier, "Game created");
        Ok(game)
    }

    #[instrument(skip(self))]
    fn find_game(&self, game_id: i32) -> Result<Option<GameRecord>, DbError> {
        let mut conn = self.connection()?;
        let game = schema::games::table
            .find(game_id)
            .select(GameRecord::as_select())
            .first(&mut conn)
            .optional()?;
        debug!(game_id, found = game.is_some(), "Game lookup");
        Ok(game)
    }

    #[instrument(skip(self))]
    fn games_for_owner(&self, owner_identifier: i32) -> Result<Vec<GameRecord>, DbError> {
        let mut conn = self.connection()?;
        let games = schema::games::table
            .filter(schema::games::owner_identifier.eq(owner_identifier))
            .order((schema::games::started_at.desc(), schema::games::id.desc()))
            .select(GameRecord::as_select())
            .load(&mut conn)?;
        info!(owner_identifier, count = games.len(), "Games loaded");
        Ok(games)
    }

    #[instrument(skip(self))]
    fn load_moves(&self, game_id: i32) -> Result<Vec<RecordedMove>, DbError> {
        let mut conn = self.connection()?;
        let rows = schema::moves::table
            .filter(schema::moves::game_id.eq(game_id))
            .order(schema::moves::turn_number.asc())
            .select(MoveRow::as_select())
            .load(&mut conn)?;
        debug!(game_id, count = rows.len(), "Moves loaded");
        rows.iter().map(MoveRow::to_recorded).collect()
    }

    #[instrument(skip(self, moves), fields(count = moves.len(), result = %result))]
    fn append_moves(
        &self,
        game_id: i32,
        moves: &[RecordedMove],
        result: GameResult,
    ) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        let rows: Vec<NewMoveRow> = moves
            .iter()
            .map(|m| NewMoveRow::from_recorded(game_id, m))
            .collect();
        let ended_at = result.is_terminal().then(|| Utc::now().naive_utc());

        conn.transaction::<_, DbError, _>(|conn| {
            diesel::insert_into(schema::moves::table)
                .values(&rows)
                .execute(conn)?;

            let updated = diesel::update(schema::games::table.find(game_id))
                .set((
                    schema::games::result.eq(result.to_string()),
                    schema::games::ended_at.eq(ended_at),
                ))
                .execute(conn)?;
            if updated == 0 {
                return Err(DbError::new(format!("Game {} vanished during append", game_id)));
            }
            Ok(())
        })?;

        info!(game_id, appended = rows.len(), "Moves appended");
        Ok(())
    }

    #[instrument(skip(self), fields(result = %result))]
    fn end_game(&self, game_id: i32, result: GameResult) -> Result<bool, DbError> {
        let mut conn = self.connection()?;
        let updated = diesel::update(schema::games::table.find(game_id))
            .set((
                schema::games::result.eq(result.to_string()),
                schema::games::ended_at.eq(Some(Utc::now().naive_utc())),
            ))
            .execute(&mut conn)?;
        debug!(game_id, updated, "Game end stamped");
        Ok(updated > 0)
    }

    #[instrument(skip(self))]
    fn delete_game(&self, game_id: i32) -> Result<bool, DbError> {
        let mut conn = self.connection()?;
        let deleted = diesel::delete(schema::games::table.find(game_id)).execute(&mut conn)?;
        info!(game_id, deleted, "Game deleted");
        Ok(deleted > 0)
    }
}
