//! Connect four: board model, rules, history reconstruction and the
//! authoritative move resolver.

mod locks;
mod opponent;
mod reconstruct;
mod resolver;
mod rules;
mod types;

pub use locks::GameLocks;
pub use opponent::{Opponent, RandomOpponent};
pub use reconstruct::{HistoryError, reconstruct};
pub use resolver::{MoveError, MoveLogStore, MoveOutcome, MoveResolver};
pub use rules::{has_four, is_full};
pub use types::{
    Board, COLUMNS, GameResult, Grid, Mover, Placement, ROWS, RecordedMove, Square,
};
