//! Win detection logic for connect four.

use super::super::{COLUMNS, Grid, Mover, ROWS, Square};
use tracing::instrument;

/// Line orientations as `(row step, column step)`.
///
/// Horizontal, vertical, diagonal ascending (towards the top right) and
/// diagonal descending (towards the bottom right).
const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (-1, 1), (1, 1)];

/// Checks whether `mover` has four tokens in a line anywhere on the grid.
///
/// Only windows that lie entirely on the grid are examined.
#[instrument(skip(grid))]
pub fn has_four(grid: &Grid, mover: Mover) -> bool {
    let target = Square::Occupied(mover);

    for (dr, dc) in DIRECTIONS {
        for row in 0..ROWS as isize {
            for column in 0..COLUMNS as isize {
                let end_row = row + 3 * dr;
                let end_column = column + 3 * dc;
                if !(0..ROWS as isize).contains(&end_row)
                    || !(0..COLUMNS as isize).contains(&end_column)
                {
                    continue;
                }

                let four = (0..4).all(|k| {
                    grid.get((row + k * dr) as usize, (column + k * dc) as usize) == Some(target)
                });
                if four {
                    return true;
                }
            }
        }
    }

    false
}
