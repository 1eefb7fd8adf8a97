//! Database persistence for authoritative games and local replays.

mod connection;
mod error;
mod models;
mod replay_repository;
mod repository;
mod schema; // Diesel generated schema - internal use only

pub use connection::{REPLAY_MIGRATIONS, SERVER_MIGRATIONS, run_migrations};
pub use error::{DbError, DbErrorKind};
pub use models::{
    GameRecord, MoveRow, NewGameRecord, NewMoveRow, NewReplayMove, NewReplaySession,
    ReplayMoveRow, ReplaySession,
};
pub use replay_repository::{DEFAULT_SESSION_LIMIT, ReplayRepository};
pub use repository::GameRepository;
