//! Core grid types for the Sudoku race.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Rejected row, column, or digit input.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("invalid input: {message}")]
pub struct InvalidInput {
    /// Human-readable description of the rejected input.
    pub message: String,
}

impl InvalidInput {
    /// Creates a new invalid-input error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// 9x9 Sudoku grid. Cells hold digits 1-9, with 0 meaning empty.
///
/// Serializes as nine rows of nine integers, matching the wire format
/// clients exchange over the WebSocket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cells: [[u8; 9]; 9],
}

impl Board {
    /// Creates an empty board (all cells 0).
    pub fn empty() -> Self {
        Self { cells: [[0; 9]; 9] }
    }

    /// Creates a board from raw cells.
    pub fn from_cells(cells: [[u8; 9]; 9]) -> Self {
        Self { cells }
    }

    /// Gets the digit at the given cell. Callers must pass in-range indices.
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.cells[row][col]
    }

    /// Sets the digit at the given cell.
    pub(crate) fn set(&mut self, row: usize, col: usize, value: u8) {
        self.cells[row][col] = value;
    }

    /// Returns the raw cells in row-major order.
    pub fn cells(&self) -> &[[u8; 9]; 9] {
        &self.cells
    }

    /// Counts empty (zero) cells.
    pub fn empty_cells(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|&&cell| cell == 0)
            .count()
    }

    /// Checks whether placing `value` at (`row`, `col`) respects Sudoku rules:
    /// no *other* cell in the same row, column, or 3x3 box already holds `value`.
    ///
    /// The target cell itself is excluded from the scan, so re-validating an
    /// already-placed digit against its own position passes.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInput`] if row/col are outside 0-8 or value is outside 1-9.
    #[instrument(skip(self))]
    pub fn validate_cell(&self, row: usize, col: usize, value: u8) -> Result<bool, InvalidInput> {
        if row > 8 || col > 8 {
            return Err(InvalidInput::new(format!(
                "cell ({row}, {col}) out of range, expected 0-8"
            )));
        }
        if !(1..=9).contains(&value) {
            return Err(InvalidInput::new(format!(
                "value {value} out of range, expected 1-9"
            )));
        }

        // Row and column scans, skipping the target cell.
        for i in 0..9 {
            if i != col && self.cells[row][i] == value {
                return Ok(false);
            }
            if i != row && self.cells[i][col] == value {
                return Ok(false);
            }
        }

        // 3x3 box scan.
        let box_row = (row / 3) * 3;
        let box_col = (col / 3) * 3;
        for r in box_row..box_row + 3 {
            for c in box_col..box_col + 3 {
                if (r != row || c != col) && self.cells[r][c] == value {
                    return Ok(false);
                }
            }
        }

        Ok(true)
    }

    /// Checks whether the board is a completed Sudoku: all 81 cells filled and
    /// every placement pairwise consistent with the rules.
    ///
    /// Acceptance is rule-based only; the board is not compared against any
    /// canonical solution.
    pub fn is_complete(&self) -> bool {
        for row in 0..9 {
            for col in 0..9 {
                let value = self.cells[row][col];
                if value == 0 {
                    return false;
                }
                match self.validate_cell(row, col, value) {
                    Ok(true) => {}
                    _ => return false,
                }
            }
        }
        true
    }
}

/// A player's private working grid, seeded from the shared puzzle.
///
/// Cells present in the original puzzle are tagged prefilled and stay
/// immutable; everything else belongs to the player. Each racer owns exactly
/// one of these and never sees writes from the opponent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerBoard {
    board: Board,
    prefilled: [[bool; 9]; 9],
}

impl PlayerBoard {
    /// Seeds a player board from the shared puzzle grid.
    pub fn from_puzzle(puzzle: &Board) -> Self {
        let mut prefilled = [[false; 9]; 9];
        for row in 0..9 {
            for col in 0..9 {
                prefilled[row][col] = puzzle.get(row, col) != 0;
            }
        }
        Self {
            board: *puzzle,
            prefilled,
        }
    }

    /// Returns the current grid.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// True if the cell came from the original puzzle and cannot be edited.
    pub fn is_prefilled(&self, row: usize, col: usize) -> bool {
        self.prefilled[row][col]
    }

    /// Writes a digit into a non-prefilled cell. Callers are expected to have
    /// validated the placement first.
    pub fn place(&mut self, row: usize, col: usize, value: u8) {
        debug_assert!(!self.prefilled[row][col]);
        self.board.set(row, col, value);
    }

    /// Rule check against this player's own grid.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInput`] for out-of-range coordinates or digits.
    pub fn validate_cell(&self, row: usize, col: usize, value: u8) -> Result<bool, InvalidInput> {
        self.board.validate_cell(row, col, value)
    }

    /// True if this player's grid is a completed, rule-valid Sudoku.
    pub fn is_complete(&self) -> bool {
        self.board.is_complete()
    }
}
