//! Game session domain model: sessions, players, moves, and results.

use crate::error::GameError;
use crate::puzzle::{self, Board, Difficulty, PlayerBoard};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Unique identifier for a player, issued by the external identity provider.
pub type PlayerId = i64;

/// Shown in place of a time for a player who never completed the puzzle.
pub const DID_NOT_FINISH: &str = "Did not finish";

/// A participant in a race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Identity-provider id.
    pub id: PlayerId,
    /// Display name.
    pub username: String,
}

impl Player {
    /// Creates a player record.
    pub fn new(id: PlayerId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }
}

/// Lifecycle status of a session.
///
/// `Finished` and `Abandoned` are terminal; sessions in those states are
/// immutable history and are never deleted.
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
pub enum SessionStatus {
    /// Waiting for a second player.
    Waiting,
    /// Both slots filled, race not yet started. Unused by the authoritative
    /// flow (joins auto-start), kept for stores migrated from older data.
    Ready,
    /// Race in progress.
    Racing,
    /// Race over, result recorded.
    Finished,
    /// Abandoned before the race started; no result exists.
    Abandoned,
}

impl SessionStatus {
    /// True for `Finished` and `Abandoned`.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Finished | SessionStatus::Abandoned)
    }
}

/// How a race ended.
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
pub enum ResultType {
    /// Winner submitted a valid completed grid.
    Completion,
    /// Opponent left mid-race.
    Forfeit,
}

/// Which session slot a player occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// First slot (session creator).
    One,
    /// Second slot (joiner whose arrival starts the race).
    Two,
}

/// A two-player race session.
///
/// Both players solve the same `puzzle` on private boards; the first valid
/// completion (or the survivor of a forfeit) wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    /// Internal id.
    pub id: Uuid,
    /// Short public code addressing the session via the WebSocket path.
    pub code: String,
    /// First player.
    pub player1: Option<Player>,
    /// Second player. Present only once the race has started (or ended).
    pub player2: Option<Player>,
    /// The shared starting grid.
    pub puzzle: Board,
    /// A full solution of the puzzle. Kept for reference; completion is
    /// judged by rule validity, not by matching this grid.
    pub solution: Board,
    /// Slot-one private board.
    pub board1: PlayerBoard,
    /// Slot-two private board.
    pub board2: PlayerBoard,
    /// Race difficulty.
    pub difficulty: Difficulty,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Set when the race starts.
    pub start_time: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl GameSession {
    /// Creates a fresh `waiting` session with a generated puzzle and the given
    /// creator in slot one.
    #[instrument(skip(creator), fields(player = %creator.username))]
    pub fn new(code: String, difficulty: Difficulty, creator: Player) -> Self {
        let (puzzle, solution) = puzzle::generate(difficulty);
        info!(%code, %difficulty, "Creating game session");
        Self {
            id: Uuid::new_v4(),
            code,
            player1: Some(creator),
            player2: None,
            board1: PlayerBoard::from_puzzle(&puzzle),
            board2: PlayerBoard::from_puzzle(&puzzle),
            puzzle,
            solution,
            difficulty,
            status: SessionStatus::Waiting,
            start_time: None,
            created_at: Utc::now(),
        }
    }

    /// Generates a session code: 8 uppercase letters/digits.
    pub fn generate_code() -> String {
        puzzle::generate_code()
    }

    /// Returns the slot occupied by the given player, if any.
    pub fn slot_of(&self, player_id: PlayerId) -> Option<Slot> {
        if self.player1.as_ref().map(|p| p.id) == Some(player_id) {
            Some(Slot::One)
        } else if self.player2.as_ref().map(|p| p.id) == Some(player_id) {
            Some(Slot::Two)
        } else {
            None
        }
    }

    /// Looks up a participant by id.
    pub fn player(&self, player_id: PlayerId) -> Option<&Player> {
        match self.slot_of(player_id)? {
            Slot::One => self.player1.as_ref(),
            Slot::Two => self.player2.as_ref(),
        }
    }

    /// Returns the other participant, if both slots are filled.
    pub fn opponent_of(&self, player_id: PlayerId) -> Option<&Player> {
        match self.slot_of(player_id)? {
            Slot::One => self.player2.as_ref(),
            Slot::Two => self.player1.as_ref(),
        }
    }

    /// Returns the private board of the given player.
    pub fn board_of(&self, player_id: PlayerId) -> Option<&PlayerBoard> {
        match self.slot_of(player_id)? {
            Slot::One => Some(&self.board1),
            Slot::Two => Some(&self.board2),
        }
    }

    /// Mutable access to the private board of the given player.
    pub fn board_of_mut(&mut self, player_id: PlayerId) -> Option<&mut PlayerBoard> {
        match self.slot_of(player_id)? {
            Slot::One => Some(&mut self.board1),
            Slot::Two => Some(&mut self.board2),
        }
    }

    /// Seats a player in the first free slot.
    ///
    /// Seating the second player sets `start_time` and flips the session
    /// straight to `racing`; there is no separate ready handshake. Returns the
    /// slot taken.
    ///
    /// # Errors
    ///
    /// `GameError::State` if the session is over or both slots are taken.
    #[instrument(skip(self, player), fields(code = %self.code, player = %player.username))]
    pub fn seat_player(&mut self, player: Player) -> Result<Slot, GameError> {
        if self.status.is_terminal() {
            warn!(status = %self.status, "Join rejected: session over");
            return Err(GameError::state(format!(
                "session {} is {}",
                self.code, self.status
            )));
        }
        if self.player1.is_none() {
            info!(player_id = player.id, "Seated player in slot one");
            self.player1 = Some(player);
            Ok(Slot::One)
        } else if self.player2.is_none() {
            info!(player_id = player.id, "Seated player in slot two, race starts");
            self.player2 = Some(player);
            self.start_time = Some(Utc::now());
            self.status = SessionStatus::Racing;
            Ok(Slot::Two)
        } else {
            warn!("Join rejected: session full");
            Err(GameError::state(format!("session {} is full", self.code)))
        }
    }
}

/// Append-only record of a submitted move, including rejected attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// Session the move belongs to.
    pub session_code: String,
    /// Player who submitted the move.
    pub player_id: PlayerId,
    /// Target row, 0-8.
    pub row: usize,
    /// Target column, 0-8.
    pub col: usize,
    /// Digit, 1-9.
    pub value: u8,
    /// Whether the placement passed rule validation when submitted.
    pub valid_at_submission: bool,
    /// Server receive time.
    pub timestamp: DateTime<Utc>,
}

/// Outcome of a finished race. At most one exists per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    /// Session the result belongs to.
    pub session_code: String,
    /// The winner.
    pub winner: Player,
    /// The loser, if a second player ever joined.
    pub loser: Option<Player>,
    /// Winner's elapsed race time in whole seconds.
    pub winner_time_secs: i64,
    /// Loser's elapsed time; `None` renders as "Did not finish".
    pub loser_time_secs: Option<i64>,
    /// Difficulty the race was played at.
    pub difficulty: Difficulty,
    /// Completion or forfeit.
    pub result_type: ResultType,
    /// When the result was recorded.
    pub created_at: DateTime<Utc>,
}

impl GameResult {
    /// Winner's time formatted for clients.
    pub fn winner_time(&self) -> String {
        format_race_time(self.winner_time_secs)
    }

    /// Loser's time formatted for clients, or "Did not finish".
    pub fn loser_time(&self) -> String {
        match self.loser_time_secs {
            Some(secs) => format_race_time(secs),
            None => DID_NOT_FINISH.to_string(),
        }
    }
}

/// Formats whole seconds as `MM:SS`, or `HH:MM:SS` once an hour is exceeded.
pub fn format_race_time(total_secs: i64) -> String {
    let total_secs = total_secs.max(0);
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}
