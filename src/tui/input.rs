//! Key mapping for column selection.

use crossterm::event::KeyCode;

use crate::games::connect_four::COLUMNS;

/// Moves the column cursor with the arrow keys, clamped to the board.
pub fn move_cursor(cursor: usize, key: KeyCode) -> usize {
    match key {
        KeyCode::Left => cursor.saturating_sub(1),
        KeyCode::Right => (cursor + 1).min(COLUMNS - 1),
        KeyCode::Home => 0,
        KeyCode::End => COLUMNS - 1,
        _ => cursor,
    }
}

/// Maps `1`..`7` to a column.
pub fn digit_column(c: char) -> Option<usize> {
    c.to_digit(10)
        .map(|d| d as usize)
        .filter(|d| (1..=COLUMNS).contains(d))
        .map(|d| d - 1)
}
