//! Sudoku puzzle engine: grid types, rule validation, and generation.

mod board;
mod generator;

pub use board::{Board, InvalidInput, PlayerBoard};
pub use generator::{Difficulty, generate};

pub(crate) use generator::generate_code;
