//! Rebuilds a board from the recorded move history.
//!
//! The history is a list of facts: every move carries the row it landed on.
//! Reconstruction replays those facts in turn order and never recomputes
//! gravity, so a history that disagrees with gravity is reported rather
//! than silently repaired.

use derive_more::{Display, Error};
use tracing::{debug, instrument, warn};

use super::{Board, COLUMNS, ROWS, RecordedMove, Square};

/// A recorded history that no sequence of legal drops could have produced.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum HistoryError {
    /// Two moves share a turn number.
    #[display("Turn {} appears more than once", turn_number)]
    DuplicateTurn {
        /// The repeated turn number.
        turn_number: u32,
    },
    /// A move lies outside the grid.
    #[display("Turn {} at column {}, row {} is off the board", turn_number, column, row)]
    OutOfBounds {
        /// Offending turn.
        turn_number: u32,
        /// Recorded column.
        column: usize,
        /// Recorded row.
        row: usize,
    },
    /// A move lands on a cell that already holds a token.
    #[display("Turn {} collides at column {}, row {}", turn_number, column, row)]
    Collision {
        /// Offending turn.
        turn_number: u32,
        /// Recorded column.
        column: usize,
        /// Recorded row.
        row: usize,
    },
    /// A column's tokens do not form a gap-free run from the bottom.
    #[display("Column {} has a floating token", column)]
    FloatingToken {
        /// Offending column.
        column: usize,
    },
}

/// Replays `moves` onto an empty board in ascending turn order.
///
/// Turn numbers may have gaps; ordering is all that matters.
///
/// # Errors
///
/// Returns [`HistoryError`] on duplicate turn numbers, off-board cells,
/// collisions, or a token that does not rest on its column's stack.
#[instrument(skip(moves), fields(move_count = moves.len()))]
pub fn reconstruct(moves: &[RecordedMove]) -> Result<Board, HistoryError> {
    let mut ordered: Vec<&RecordedMove> = moves.iter().collect();
    ordered.sort_by_key(|m| m.turn_number);

    if let Some(pair) = ordered
        .windows(2)
        .find(|pair| pair[0].turn_number == pair[1].turn_number)
    {
        warn!(turn_number = pair[0].turn_number, "Duplicate turn number in history");
        return Err(HistoryError::DuplicateTurn {
            turn_number: pair[0].turn_number,
        });
    }

    let mut board = Board::new();
    let mut heights = [0usize; COLUMNS];

    for recorded in ordered {
        let p = recorded.placement;
        if p.column >= COLUMNS || p.row >= ROWS {
            warn!(
                turn_number = recorded.turn_number,
                column = p.column,
                row = p.row,
                "Move off the board"
            );
            return Err(HistoryError::OutOfBounds {
                turn_number: recorded.turn_number,
                column: p.column,
                row: p.row,
            });
        }
        if !board.grid().is_empty(p.row, p.column) {
            warn!(
                turn_number = recorded.turn_number,
                column = p.column,
                row = p.row,
                "Cell collision"
            );
            return Err(HistoryError::Collision {
                turn_number: recorded.turn_number,
                column: p.column,
                row: p.row,
            });
        }
        let expected_row = ROWS - 1 - heights[p.column];
        if p.row != expected_row {
            warn!(
                turn_number = recorded.turn_number,
                column = p.column,
                row = p.row,
                expected_row,
                "Token does not rest on the column's stack"
            );
            return Err(HistoryError::FloatingToken { column: p.column });
        }
        board
            .grid_mut()
            .set(p.row, p.column, Square::Occupied(p.mover))
            .map_err(|_| HistoryError::OutOfBounds {
                turn_number: recorded.turn_number,
                column: p.column,
                row: p.row,
            })?;
        heights[p.column] += 1;
    }

    board.set_heights(heights);
    debug!(?heights, "Board reconstructed");
    Ok(board)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::connect_four::{Mover, Placement};

    fn mv(turn_number: u32, column: usize, row: usize, mover: Mover) -> RecordedMove {
        RecordedMove {
            placement: Placement::new(column, row, mover),
            turn_number,
        }
    }

    #[test]
    fn test_empty_history_is_empty_board() {
        let board = reconstruct(&[]).unwrap();
        assert_eq!(board.heights(), &[0; COLUMNS]);
        assert_eq!(board, Board::new());
    }

    #[test]
    fn test_replays_in_turn_order_not_input_order() {
        let moves = vec![
            mv(4, 2, 5, Mover::Opponent),
            mv(1, 3, 5, Mover::Player),
            mv(3, 3, 4, Mover::Player),
            mv(2, 3, 3, Mover::Opponent),
        ];
        // Turn 2 claims row 3 before row 4 exists, so this order floats.
        assert_eq!(
            reconstruct(&moves).unwrap_err(),
            HistoryError::FloatingToken { column: 3 }
        );

        let moves = vec![
            mv(4, 2, 5, Mover::Opponent),
            mv(1, 3, 5, Mover::Player),
            mv(3, 3, 3, Mover::Player),
            mv(2, 3, 4, Mover::Opponent),
        ];
        let board = reconstruct(&moves).unwrap();
        assert_eq!(board.height(3), 3);
        assert_eq!(board.height(2), 1);
        assert_eq!(board.grid().get(4, 3), Some(Square::Occupied(Mover::Opponent)));
    }

    #[test]
    fn test_gapped_turn_numbers_are_tolerated() {
        let moves = vec![mv(1, 0, 5, Mover::Player), mv(7, 0, 4, Mover::Player)];
        let board = reconstruct(&moves).unwrap();
        assert_eq!(board.height(0), 2);
    }

    #[test]
    fn test_collision_is_corrupt() {
        let moves = vec![mv(1, 0, 5, Mover::Player), mv(2, 0, 5, Mover::Opponent)];
        assert_eq!(
            reconstruct(&moves).unwrap_err(),
            HistoryError::Collision {
                turn_number: 2,
                column: 0,
                row: 5
            }
        );
    }

    #[test]
    fn test_floating_token_is_corrupt() {
        let moves = vec![mv(1, 6, 3, Mover::Player)];
        assert_eq!(
            reconstruct(&moves).unwrap_err(),
            HistoryError::FloatingToken { column: 6 }
        );
    }

    #[test]
    fn test_duplicate_turn_is_corrupt() {
        let moves = vec![mv(1, 0, 5, Mover::Player), mv(1, 1, 5, Mover::Opponent)];
        assert_eq!(
            reconstruct(&moves).unwrap_err(),
            HistoryError::DuplicateTurn { turn_number: 1 }
        );
    }

    #[test]
    fn test_off_board_is_corrupt() {
        let moves = vec![mv(1, 7, 5, Mover::Player)];
        assert!(matches!(
            reconstruct(&moves),
            Err(HistoryError::OutOfBounds { column: 7, .. })
        ));
    }
}
