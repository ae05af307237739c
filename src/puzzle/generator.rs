//! Puzzle generation: randomized full-grid fill plus difficulty-based removal.

use super::board::Board;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Race difficulty, which determines how many cells are removed from the
/// solved grid to produce the puzzle.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    /// 30 cells removed.
    Easy,
    /// 40 cells removed.
    Medium,
    /// 50 cells removed.
    Hard,
}

impl Difficulty {
    /// Number of cells removed from the solved grid.
    pub fn removed_cells(self) -> usize {
        match self {
            Difficulty::Easy => 30,
            Difficulty::Medium => 40,
            Difficulty::Hard => 50,
        }
    }
}

/// Generates a puzzle and its solution for the given difficulty.
///
/// The solution is a complete, rule-valid grid; the puzzle is the same grid
/// with [`Difficulty::removed_cells`] cells blanked at random positions. The
/// puzzle is not guaranteed to admit a unique solution; completion is judged
/// by rule validity, not by matching this solution.
#[instrument]
pub fn generate(difficulty: Difficulty) -> (Board, Board) {
    let solution = generate_full_board();
    let puzzle = remove_cells(&solution, difficulty.removed_cells());
    debug!(
        %difficulty,
        removed = difficulty.removed_cells(),
        "Generated puzzle"
    );
    (puzzle, solution)
}

/// Produces a complete valid grid: fill the three diagonal 3x3 boxes with
/// shuffled digits (they share no row or column, so any shuffle is legal),
/// then backtrack over the rest.
fn generate_full_board() -> Board {
    let mut rng = rand::thread_rng();
    let mut cells = [[0u8; 9]; 9];

    for anchor in [0usize, 3, 6] {
        let mut digits: Vec<u8> = (1..=9).collect();
        digits.shuffle(&mut rng);
        let mut next = digits.into_iter();
        for row in anchor..anchor + 3 {
            for col in anchor..anchor + 3 {
                cells[row][col] = next.next().unwrap_or(0);
            }
        }
    }

    let solved = solve(&mut cells);
    debug_assert!(solved, "diagonal seed must always be solvable");
    Board::from_cells(cells)
}

/// Backtracking solver over raw cells. Returns true once the grid is full.
fn solve(cells: &mut [[u8; 9]; 9]) -> bool {
    for row in 0..9 {
        for col in 0..9 {
            if cells[row][col] != 0 {
                continue;
            }
            for value in 1..=9 {
                if placement_fits(cells, row, col, value) {
                    cells[row][col] = value;
                    if solve(cells) {
                        return true;
                    }
                    cells[row][col] = 0;
                }
            }
            return false;
        }
    }
    true
}

/// Placement check for the solver; the target cell is known to be empty.
fn placement_fits(cells: &[[u8; 9]; 9], row: usize, col: usize, value: u8) -> bool {
    for i in 0..9 {
        if cells[row][i] == value || cells[i][col] == value {
            return false;
        }
    }
    let box_row = (row / 3) * 3;
    let box_col = (col / 3) * 3;
    for r in box_row..box_row + 3 {
        for c in box_col..box_col + 3 {
            if cells[r][c] == value {
                return false;
            }
        }
    }
    true
}

/// Blanks `count` randomly chosen cells of a solved grid.
fn remove_cells(solution: &Board, count: usize) -> Board {
    let mut rng = rand::thread_rng();
    let mut positions: Vec<(usize, usize)> = (0..9)
        .flat_map(|row| (0..9).map(move |col| (row, col)))
        .collect();
    positions.shuffle(&mut rng);

    let mut puzzle = *solution;
    for &(row, col) in positions.iter().take(count.min(81)) {
        puzzle.set(row, col, 0);
    }
    puzzle
}

/// Random 8-character session code (uppercase letters and digits).
pub(crate) fn generate_code() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    (0..8)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}
