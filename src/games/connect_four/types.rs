//! Core domain types for connect four.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Number of rows on the board.
pub const ROWS: usize = 6;

/// Number of columns on the board.
pub const COLUMNS: usize = 7;

/// Who dropped a token.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum Mover {
    /// The human player.
    Player,
    /// The automated opponent.
    Opponent,
}

/// A cell on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Square {
    /// Empty cell.
    Empty,
    /// Cell holding a token.
    Occupied(Mover),
}

/// 6x7 grid of cells. Row 0 is the top row, row 5 the bottom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    cells: [[Square; COLUMNS]; ROWS],
}

impl Grid {
    /// Creates an empty grid.
    pub fn new() -> Self {
        Self {
            cells: [[Square::Empty; COLUMNS]; ROWS],
        }
    }

    /// Gets the cell at `(row, column)`, or `None` when off the grid.
    pub fn get(&self, row: usize, column: usize) -> Option<Square> {
        self.cells.get(row).and_then(|r| r.get(column)).copied()
    }

    /// Sets the cell at `(row, column)`.
    pub fn set(&mut self, row: usize, column: usize, square: Square) -> Result<(), &'static str> {
        let cell = self
            .cells
            .get_mut(row)
            .and_then(|r| r.get_mut(column))
            .ok_or("Cell out of bounds")?;
        *cell = square;
        Ok(())
    }

    /// Returns true when the cell holds no token.
    pub fn is_empty(&self, row: usize, column: usize) -> bool {
        matches!(self.get(row, column), Some(Square::Empty))
    }

    /// Rows of cells, top first.
    pub fn rows(&self) -> &[[Square; COLUMNS]; ROWS] {
        &self.cells
    }

    /// Formats the grid as text, `X` for the player and `O` for the opponent.
    pub fn display(&self) -> String {
        let mut result = String::new();
        for row in &self.cells {
            for square in row {
                result.push(match square {
                    Square::Empty => '.',
                    Square::Occupied(Mover::Player) => 'X',
                    Square::Occupied(Mover::Opponent) => 'O',
                });
            }
            result.push('\n');
        }
        result.push_str("0123456");
        result
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

/// A grid together with the number of tokens stacked in each column.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Board {
    grid: Grid,
    heights: [usize; COLUMNS],
}

impl Board {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// The grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Tokens stacked per column.
    pub fn heights(&self) -> &[usize; COLUMNS] {
        &self.heights
    }

    /// Height of one column. Out of range columns report as full.
    pub fn height(&self, column: usize) -> usize {
        self.heights.get(column).copied().unwrap_or(ROWS)
    }

    /// Row a token dropped into `column` comes to rest on, if the column has room.
    pub fn landing_row(&self, column: usize) -> Option<usize> {
        let height = self.height(column);
        (height < ROWS).then(|| ROWS - 1 - height)
    }

    /// Columns that still accept a token, in ascending order.
    pub fn legal_columns(&self) -> Vec<usize> {
        (0..COLUMNS).filter(|&c| self.heights[c] < ROWS).collect()
    }

    /// Writes `mover`'s token into `(row, column)` and bumps the column height.
    ///
    /// The row is taken as given; callers that need gravity use [`Board::drop_token`].
    pub fn place(&mut self, row: usize, column: usize, mover: Mover) -> Result<(), &'static str> {
        self.grid.set(row, column, Square::Occupied(mover))?;
        self.heights[column] = (self.heights[column] + 1).min(ROWS);
        Ok(())
    }

    /// Drops `mover`'s token into `column`, returning the landing row.
    pub fn drop_token(&mut self, column: usize, mover: Mover) -> Option<usize> {
        let row = self.landing_row(column)?;
        self.place(row, column, mover).ok()?;
        Some(row)
    }

    pub(crate) fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub(crate) fn set_heights(&mut self, heights: [usize; COLUMNS]) {
        self.heights = heights;
    }
}

/// A token that has come to rest on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    /// Column, 0..7.
    pub column: usize,
    /// Row, 0..6 (0 is the top).
    pub row: usize,
    /// Who dropped it.
    pub mover: Mover,
}

impl Placement {
    /// Creates a placement.
    pub fn new(column: usize, row: usize, mover: Mover) -> Self {
        Self { column, row, mover }
    }
}

/// A placement from the authoritative history with its turn number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedMove {
    /// Where the token landed.
    pub placement: Placement,
    /// Strictly increasing, possibly gapped, sequence number.
    pub turn_number: u32,
}

/// Outcome of a game as stored on the game record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
pub enum GameResult {
    /// No terminal condition yet.
    #[default]
    InProgress,
    /// The human player connected four.
    PlayerWin,
    /// The opponent connected four.
    ComputerWin,
    /// The board filled up, or the game was ended without a winner.
    Draw,
}

impl GameResult {
    /// Returns true for every result except [`GameResult::InProgress`].
    pub fn is_terminal(self) -> bool {
        self != GameResult::InProgress
    }

    /// Parses a stored or client-supplied result, accepting legacy spellings.
    ///
    /// Returns `None` for unrecognised text.
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match s {
            "InProgress" => Some(Self::InProgress),
            "PlayerWin" | "Win" => Some(Self::PlayerWin),
            "ComputerWin" | "Lose" => Some(Self::ComputerWin),
            "Draw" | "Tie" => Some(Self::Draw),
            _ => None,
        }
    }

    /// Maps a requested end-of-game result onto a terminal result.
    ///
    /// Missing, unknown and non-terminal values all become [`GameResult::Draw`].
    pub fn terminal_or_draw(requested: Option<&str>) -> Self {
        match requested.and_then(Self::parse_lenient) {
            Some(result) if result.is_terminal() => result,
            _ => Self::Draw,
        }
    }

    /// The winner, if any.
    pub fn winner(self) -> Option<Mover> {
        match self {
            Self::PlayerWin => Some(Mover::Player),
            Self::ComputerWin => Some(Mover::Opponent),
            Self::InProgress | Self::Draw => None,
        }
    }
}
