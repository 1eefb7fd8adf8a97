//! Per-game write serialization.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::{debug, instrument};

/// Hands out one lock per game so read-append cycles on the same game run
/// one at a time while different games proceed independently.
///
/// The map only holds weak references; an entry lives as long as some
/// request holds its lock and is pruned afterwards.
#[derive(Debug, Clone, Default)]
pub struct GameLocks {
    locks: Arc<Mutex<HashMap<i32, Weak<Mutex<()>>>>>,
}

impl GameLocks {
    /// Creates an empty lock map.
    #[instrument]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock guarding `game_id`, creating it if no request holds it.
    #[instrument(skip(self))]
    pub fn lock_for(&self, game_id: i32) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|_, weak| weak.strong_count() > 0);
        if let Some(lock) = locks.get(&game_id).and_then(Weak::upgrade) {
            return lock;
        }
        let lock = Arc::new(Mutex::new(()));
        locks.insert(game_id, Arc::downgrade(&lock));
        debug!(game_id, tracked = locks.len(), "Game lock created");
        lock
    }

    /// Number of games whose lock is currently held by some request.
    pub fn tracked(&self) -> usize {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|_, weak| weak.strong_count() > 0);
        locks.len()
    }
}
