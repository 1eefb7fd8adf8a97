//! Draw detection logic for connect four.

use super::super::{COLUMNS, ROWS};
use tracing::instrument;

/// Checks if every column is stacked to the top.
///
/// A full board with no winner is a draw.
#[instrument]
pub fn is_full(heights: &[usize; COLUMNS]) -> bool {
    heights.iter().all(|&h| h >= ROWS)
}
