//! Best-effort local mirror of a live game's history.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::db::{DbError, ReplayRepository};
use crate::games::connect_four::{GameResult, Placement};

/// Storage behind a [`ReplayRecorder`].
pub trait ReplayStore: Send + Sync {
    /// Creates a session and returns its id.
    fn create_session(&self, owner_identifier: i32, linked_game_id: Option<i32>)
    -> Result<i32, DbError>;

    /// Writes the move at `move_index`.
    fn add_move(&self, session_id: i32, move_index: i32, placement: Placement)
    -> Result<(), DbError>;

    /// Stamps end time and result. Returns `false` if already finished.
    fn finish_session(&self, session_id: i32, result: GameResult) -> Result<bool, DbError>;
}

impl ReplayStore for ReplayRepository {
    fn create_session(
        &self,
        owner_identifier: i32,
        linked_game_id: Option<i32>,
    ) -> Result<i32, DbError> {
        Ok(*ReplayRepository::create_session(self, owner_identifier, linked_game_id)?.id())
    }

    fn add_move(
        &self,
        session_id: i32,
        move_index: i32,
        placement: Placement,
    ) -> Result<(), DbError> {
        ReplayRepository::add_move(self, session_id, move_index, placement).map(|_| ())
    }

    fn finish_session(&self, session_id: i32, result: GameResult) -> Result<bool, DbError> {
        ReplayRepository::finish_session(self, session_id, result)
    }
}

/// Appends confirmed placements to a local replay session.
///
/// Every write is best-effort: failures are logged and swallowed so the
/// visual game never stalls on the mirror.
pub struct ReplayRecorder {
    store: Arc<dyn ReplayStore>,
    session_id: Option<i32>,
    next_index: i32,
    finished: bool,
}

impl std::fmt::Debug for ReplayRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayRecorder")
            .field("session_id", &self.session_id)
            .field("next_index", &self.next_index)
            .field("finished", &self.finished)
            .finish()
    }
}

impl ReplayRecorder {
    /// Opens a session for `owner_identifier`, optionally linked to a server game.
    ///
    /// If the session cannot be created the recorder stays usable but
    /// writes nothing.
    #[instrument(skip(store))]
    pub fn start(
        store: Arc<dyn ReplayStore>,
        owner_identifier: i32,
        linked_game_id: Option<i32>,
    ) -> Self {
        let session_id = match store.create_session(owner_identifier, linked_game_id) {
            Ok(id) => {
                info!(session_id = id, "Local recording started");
                Some(id)
            }
            Err(e) => {
                warn!(error = %e, "Local recording unavailable");
                None
            }
        };
        Self {
            store,
            session_id,
            next_index: 0,
            finished: false,
        }
    }

    /// Local session id, if one was created.
    pub fn session_id(&self) -> Option<i32> {
        self.session_id
    }

    /// Whether [`ReplayRecorder::finish`] has run.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Writes `placement` at the next move index.
    ///
    /// The index only advances on a successful write, so stored indices
    /// stay contiguous. Returns whether the move was written.
    #[instrument(skip(self), fields(session_id = ?self.session_id, move_index = self.next_index))]
    pub fn append(&mut self, placement: Placement) -> bool {
        let Some(session_id) = self.session_id.filter(|_| !self.finished) else {
            return false;
        };
        match self.store.add_move(session_id, self.next_index, placement) {
            Ok(()) => {
                debug!("Move mirrored locally");
                self.next_index += 1;
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to mirror move locally");
                false
            }
        }
    }

    /// Stamps the session's end time and result.
    ///
    /// Only the first call has any effect; later calls return `false`.
    #[instrument(skip(self), fields(session_id = ?self.session_id))]
    pub fn finish(&mut self, result: GameResult) -> bool {
        if self.finished {
            debug!("Local recording already finished");
            return false;
        }
        self.finished = true;
        let Some(session_id) = self.session_id else {
            return false;
        };
        match self.store.finish_session(session_id, result) {
            Ok(updated) => {
                info!(%result, updated, "Local recording finished");
                updated
            }
            Err(e) => {
                warn!(error = %e, "Failed to finish local recording");
                false
            }
        }
    }
}
