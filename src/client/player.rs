//! Playback of locally mirrored sessions.

use derive_more::{Display, Error, From};
use tracing::{info, instrument, warn};

use super::animation::AnimationScheduler;
use super::recorder::ReplayRecorder;
use crate::db::{DbError, ReplayRepository, ReplaySession};
use crate::games::connect_four::{GameResult, Placement};

/// Why a session cannot be replayed.
#[derive(Debug, Clone, Display, Error, From)]
pub enum ReplayError {
    /// No session with this id.
    #[display("Replay session {} not found", session_id)]
    #[from(ignore)]
    SessionNotFound {
        /// Requested session.
        session_id: i32,
    },
    /// The session has no moves.
    #[display("Replay session {} has no moves", session_id)]
    #[from(ignore)]
    NoMoves {
        /// Requested session.
        session_id: i32,
    },
    /// Reading the mirror failed.
    #[display("{}", _0)]
    Storage(DbError),
}

/// A session read back from the mirror, ready to feed a scheduler.
#[derive(Debug, Clone)]
pub struct LoadedReplay {
    session: ReplaySession,
    placements: Vec<Placement>,
    final_result: Option<GameResult>,
}

impl LoadedReplay {
    /// Session header.
    pub fn session(&self) -> &ReplaySession {
        &self.session
    }

    /// Placements in move index order.
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// Result stored when the session was finished, reported as is.
    pub fn final_result(&self) -> Option<GameResult> {
        self.final_result
    }

    /// Switches `scheduler` to replay mode and queues every placement.
    ///
    /// Returns the live recorder the scheduler was holding, if any.
    #[instrument(
        skip(self, scheduler),
        fields(session_id = self.session.id(), moves = self.placements.len())
    )]
    pub fn feed(&self, scheduler: &mut AnimationScheduler) -> Option<ReplayRecorder> {
        let detached = scheduler.enter_replay();
        for placement in &self.placements {
            scheduler.enqueue(*placement);
        }
        info!("Replay queued");
        detached
    }
}

/// Loads sessions from the local mirror.
#[derive(Debug, Clone)]
pub struct ReplayPlayer {
    repository: ReplayRepository,
}

impl ReplayPlayer {
    /// Creates a player over `repository`.
    #[instrument]
    pub fn new(repository: ReplayRepository) -> Self {
        Self { repository }
    }

    /// Sessions of one owner, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::Storage`] if the mirror cannot be read.
    #[instrument(skip(self))]
    pub fn sessions(
        &self,
        owner_identifier: i32,
        limit: i64,
    ) -> Result<Vec<ReplaySession>, ReplayError> {
        Ok(self.repository.list_sessions(owner_identifier, limit)?)
    }

    /// Loads a session and its moves ordered by move index.
    ///
    /// Nothing on the server is touched.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError`] if the session is missing, empty, or unreadable.
    #[instrument(skip(self))]
    pub fn load(&self, session_id: i32) -> Result<LoadedReplay, ReplayError> {
        let session = self
            .repository
            .get_session(session_id)?
            .ok_or(ReplayError::SessionNotFound { session_id })?;
        let rows = self.repository.load_moves(session_id)?;
        if rows.is_empty() {
            warn!(session_id, "Replay session is empty");
            return Err(ReplayError::NoMoves { session_id });
        }
        let placements = rows
            .iter()
            .map(|row| row.to_placement())
            .collect::<Result<Vec<_>, _>>()?;
        let final_result = session.parse_result()?;
        info!(session_id, moves = placements.len(), ?final_result, "Replay loaded");
        Ok(LoadedReplay {
            session,
            placements,
            final_result,
        })
    }
}
