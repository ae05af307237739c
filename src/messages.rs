//! Wire protocol: tagged JSON message unions for the WebSocket endpoint.
//!
//! Every frame is a JSON object with a `type` discriminator. Decoding into
//! these enums keeps dispatch exhaustive; unknown types fail at the serde
//! boundary and are answered with an `error` frame.

use crate::puzzle::{Board, Difficulty};
use crate::session::{PlayerId, SessionStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Frames a client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Take a seat in the session. The second join starts the race.
    JoinGame {
        /// Must match the id the connection was opened with.
        player_id: PlayerId,
    },
    /// Place a digit on the sender's own board.
    Move {
        /// Row, 0-8.
        row: usize,
        /// Column, 0-8.
        col: usize,
        /// Digit, 1-9.
        value: u8,
    },
    /// Claim the puzzle is done; the server re-validates the full grid.
    Complete,
    /// Request a rematch with fresh puzzle and code.
    PlayAgain {
        /// Difficulty for the new session.
        difficulty: Difficulty,
    },
    /// Leave the session. Leaving mid-race forfeits.
    LeaveGame {
        /// Client-supplied reason, if any.
        #[serde(default)]
        reason: Option<String>,
    },
    /// Re-request the current `game_state` (stateless reconnection).
    GetBoard,
    /// Application-level keepalive.
    Ping,
}

/// Frames the server sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Snapshot for the receiving player: their own board, never the
    /// opponent's live grid.
    GameState {
        /// The receiver's private board.
        board: Board,
        /// The shared starting grid.
        puzzle: Board,
        /// Slot-one username.
        player1: Option<String>,
        /// Slot-two username.
        player2: Option<String>,
        /// Session status.
        status: SessionStatus,
        /// Race start time, once racing.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_time: Option<DateTime<Utc>>,
    },
    /// Both seats are filled; the race is on.
    RaceStarted {
        /// Shared race clock origin.
        start_time: DateTime<Utc>,
        /// The shared starting grid.
        puzzle: Board,
    },
    /// Opponent progress notification. Sent only to the other player.
    Move {
        /// Mover's username.
        username: String,
        /// Mover's id.
        player_id: PlayerId,
        /// Row, 0-8.
        row: usize,
        /// Column, 0-8.
        col: usize,
        /// Digit, 1-9.
        value: u8,
    },
    /// The race is over for both players.
    RaceFinished {
        /// Winner's id.
        winner_id: PlayerId,
        /// Winner's username.
        winner_username: String,
        /// Winner's time, `MM:SS` or `HH:MM:SS`.
        winner_time: String,
        /// Loser's time, or `"Did not finish"`.
        loser_time: String,
    },
    /// A rematch session exists; connect to it to race again.
    NewGameCreated {
        /// Code of the new session.
        game_code: String,
    },
    /// A player left the session.
    PlayerLeftGame {
        /// Username of the player who left.
        leaving_player: String,
        /// Username of the player still seated, if any.
        remaining_player: Option<String>,
        /// Reason supplied with the leave (or `"disconnect"`).
        reason: String,
    },
    /// Acknowledges the sender's own leave.
    LeaveGameConfirmed {
        /// Human-readable confirmation.
        message: String,
    },
    /// Recoverable error; the client may correct its input and resubmit.
    Error {
        /// Error text.
        error: String,
    },
    /// Informational broadcast (connects, disconnects).
    Notification {
        /// Notification text.
        message: String,
    },
    /// Keepalive reply.
    Pong,
}
