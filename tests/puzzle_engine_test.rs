//! Tests for the Sudoku puzzle engine.

use sudoku_race::{Board, Difficulty, PlayerBoard, generate};

/// Builds a board with a single 5 at the top-left corner.
fn board_with_corner_five() -> Board {
    let mut cells = [[0u8; 9]; 9];
    cells[0][0] = 5;
    Board::from_cells(cells)
}

#[test]
fn test_validate_cell_accepts_open_placement() {
    let board = board_with_corner_five();
    assert_eq!(board.validate_cell(4, 4, 5), Ok(true));
    assert_eq!(board.validate_cell(0, 1, 6), Ok(true));
}

#[test]
fn test_validate_cell_rejects_row_conflict() {
    let board = board_with_corner_five();
    assert_eq!(board.validate_cell(0, 5, 5), Ok(false));
}

#[test]
fn test_validate_cell_rejects_column_conflict() {
    let board = board_with_corner_five();
    assert_eq!(board.validate_cell(5, 0, 5), Ok(false));
}

#[test]
fn test_validate_cell_rejects_box_conflict() {
    let board = board_with_corner_five();
    assert_eq!(board.validate_cell(1, 1, 5), Ok(false));
}

#[test]
fn test_validate_cell_excludes_target_cell() {
    // Re-validating a placed digit against its own position passes.
    let board = board_with_corner_five();
    assert_eq!(board.validate_cell(0, 0, 5), Ok(true));
}

#[test]
fn test_validate_cell_rejects_out_of_range_input() {
    let board = Board::empty();
    assert!(board.validate_cell(9, 0, 5).is_err());
    assert!(board.validate_cell(0, 9, 5).is_err());
    assert!(board.validate_cell(0, 0, 0).is_err());
    assert!(board.validate_cell(0, 0, 10).is_err());
}

#[test]
fn test_generate_removes_expected_cell_count() {
    for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
        let (puzzle, _) = generate(difficulty);
        assert_eq!(
            puzzle.empty_cells(),
            difficulty.removed_cells(),
            "wrong removal count for {difficulty}"
        );
    }
}

#[test]
fn test_generate_solution_is_complete() {
    let (_, solution) = generate(Difficulty::Medium);
    assert_eq!(solution.empty_cells(), 0);
    assert!(solution.is_complete());
}

#[test]
fn test_generate_puzzle_is_subset_of_solution() {
    let (puzzle, solution) = generate(Difficulty::Hard);
    for row in 0..9 {
        for col in 0..9 {
            let cell = puzzle.get(row, col);
            if cell != 0 {
                assert_eq!(cell, solution.get(row, col), "mismatch at ({row}, {col})");
            }
        }
    }
}

#[test]
fn test_is_complete_rejects_empty_and_partial_boards() {
    assert!(!Board::empty().is_complete());

    let (_, solution) = generate(Difficulty::Easy);
    let mut cells = *solution.cells();
    cells[3][7] = 0;
    assert!(!Board::from_cells(cells).is_complete());
}

#[test]
fn test_is_complete_rejects_rule_violation() {
    let (_, solution) = generate(Difficulty::Easy);
    let mut cells = *solution.cells();
    // Copy a digit onto a neighbor in the same row, creating a duplicate.
    cells[0][1] = cells[0][0];
    assert!(!Board::from_cells(cells).is_complete());
}

#[test]
fn test_is_complete_accepts_any_rule_valid_grid() {
    // Completion is rule-based; the canonical solution is one witness.
    let (_, solution) = generate(Difficulty::Medium);
    assert!(solution.is_complete());
}

#[test]
fn test_player_board_tracks_prefilled_cells() {
    let (puzzle, _) = generate(Difficulty::Easy);
    let board = PlayerBoard::from_puzzle(&puzzle);
    for row in 0..9 {
        for col in 0..9 {
            assert_eq!(board.is_prefilled(row, col), puzzle.get(row, col) != 0);
        }
    }
}

#[test]
fn test_player_board_place_fills_open_cell() {
    let (puzzle, solution) = generate(Difficulty::Easy);
    let mut board = PlayerBoard::from_puzzle(&puzzle);
    let (row, col) = first_empty(&puzzle);
    let value = solution.get(row, col);
    assert_eq!(board.validate_cell(row, col, value), Ok(true));
    board.place(row, col, value);
    assert_eq!(board.board().get(row, col), value);
}

fn first_empty(puzzle: &Board) -> (usize, usize) {
    for row in 0..9 {
        for col in 0..9 {
            if puzzle.get(row, col) == 0 {
                return (row, col);
            }
        }
    }
    panic!("puzzle has no empty cells");
}
