//! Sudoku Race - real-time two-player puzzle race server.
//!
//! Both players receive the same Sudoku puzzle and solve it simultaneously on
//! private boards; the first valid completion (or the survivor of a forfeit)
//! wins. Sessions are driven over a WebSocket endpoint by a small state
//! machine, with a concurrency guard making sure a race finishes exactly once
//! no matter how close the photo finish is.
//!
//! # Architecture
//!
//! - **Puzzle**: grid types, rule validation, and generation
//! - **Race**: the session state machine (join / move / complete / leave /
//!   play-again)
//! - **Guard**: finalize-once semantics over session status
//! - **Broadcast**: group fan-out to the sockets of a session
//! - **Store**: repository trait with in-memory and SQLite implementations
//! - **Connection**: axum WebSocket endpoint binding sockets to sessions

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod broadcast;
mod connection;
mod db;
mod error;
mod guard;
mod messages;
mod puzzle;
mod race;
mod session;
mod store;

// Crate-level exports - puzzle engine
pub use puzzle::{Board, Difficulty, InvalidInput, PlayerBoard, generate};

// Crate-level exports - domain model
pub use session::{
    DID_NOT_FINISH, GameResult, GameSession, MoveRecord, Player, PlayerId, ResultType,
    SessionStatus, Slot, format_race_time,
};

// Crate-level exports - errors
pub use error::GameError;

// Crate-level exports - coordination
pub use broadcast::{Broadcaster, ConnectionId};
pub use guard::{FinalizeGuard, FinalizeOutcome, SessionLocks};
pub use race::RaceCoordinator;

// Crate-level exports - wire protocol
pub use messages::{ClientMessage, ServerMessage};

// Crate-level exports - persistence
pub use db::SqliteStore;
pub use store::{MemoryStore, SessionStore, StoreError};

// Crate-level exports - HTTP surface
pub use connection::{ConnectQuery, CreateGameRequest, CreateGameResponse, router};
