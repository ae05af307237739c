//! Database row models and conversions to the domain types.

use chrono::{DateTime, NaiveDateTime, Utc};
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;

use crate::db::schema;
use crate::session::{GameResult, GameSession, MoveRecord, Player};
use crate::store::StoreError;

fn to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(naive, Utc)
}

/// Session row as stored in SQLite. Grids are JSON-encoded text columns.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::game_sessions)]
pub struct SessionRow {
    id: String,
    code: String,
    player1_id: Option<i64>,
    player1_name: Option<String>,
    player2_id: Option<i64>,
    player2_name: Option<String>,
    puzzle: String,
    solution: String,
    player1_board: String,
    player2_board: String,
    difficulty: String,
    status: String,
    start_time: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
}

impl SessionRow {
    /// Decodes the row into a domain session.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a JSON column or enum string fails to parse.
    pub fn into_domain(self) -> Result<GameSession, StoreError> {
        let id = self
            .id
            .parse()
            .map_err(|e| StoreError::new(format!("bad session id: {e}")))?;
        let difficulty = self
            .difficulty
            .parse()
            .map_err(|e| StoreError::new(format!("bad difficulty '{}': {e}", self.difficulty)))?;
        let status = self
            .status
            .parse()
            .map_err(|e| StoreError::new(format!("bad status '{}': {e}", self.status)))?;
        let player1 = match (self.player1_id, self.player1_name) {
            (Some(id), Some(name)) => Some(Player::new(id, name)),
            _ => None,
        };
        let player2 = match (self.player2_id, self.player2_name) {
            (Some(id), Some(name)) => Some(Player::new(id, name)),
            _ => None,
        };
        Ok(GameSession {
            id,
            code: self.code,
            player1,
            player2,
            puzzle: serde_json::from_str(&self.puzzle)?,
            solution: serde_json::from_str(&self.solution)?,
            board1: serde_json::from_str(&self.player1_board)?,
            board2: serde_json::from_str(&self.player2_board)?,
            difficulty,
            status,
            start_time: self.start_time.map(to_utc),
            created_at: to_utc(self.created_at),
        })
    }
}

/// Insertable session row.
#[derive(Debug, Clone, Insertable, AsChangeset, new)]
#[diesel(table_name = schema::game_sessions)]
pub struct NewSessionRow {
    id: String,
    code: String,
    player1_id: Option<i64>,
    player1_name: Option<String>,
    player2_id: Option<i64>,
    player2_name: Option<String>,
    puzzle: String,
    solution: String,
    player1_board: String,
    player2_board: String,
    difficulty: String,
    status: String,
    start_time: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
}

impl NewSessionRow {
    /// Encodes a domain session for storage.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a grid fails to serialize.
    pub fn from_domain(session: &GameSession) -> Result<Self, StoreError> {
        Ok(Self::new(
            session.id.to_string(),
            session.code.clone(),
            session.player1.as_ref().map(|p| p.id),
            session.player1.as_ref().map(|p| p.username.clone()),
            session.player2.as_ref().map(|p| p.id),
            session.player2.as_ref().map(|p| p.username.clone()),
            serde_json::to_string(&session.puzzle)?,
            serde_json::to_string(&session.solution)?,
            serde_json::to_string(&session.board1)?,
            serde_json::to_string(&session.board2)?,
            session.difficulty.to_string(),
            session.status.to_string(),
            session.start_time.map(|t| t.naive_utc()),
            session.created_at.naive_utc(),
        ))
    }
}

/// Move log row.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::moves)]
pub struct MoveRow {
    id: i32,
    session_code: String,
    player_id: i64,
    row: i32,
    col: i32,
    value: i32,
    valid_at_submission: bool,
    created_at: NaiveDateTime,
}

impl MoveRow {
    /// Decodes the row into a domain move record.
    pub fn into_domain(self) -> MoveRecord {
        MoveRecord {
            session_code: self.session_code,
            player_id: self.player_id,
            row: self.row as usize,
            col: self.col as usize,
            value: self.value as u8,
            valid_at_submission: self.valid_at_submission,
            timestamp: to_utc(self.created_at),
        }
    }
}

/// Insertable move row.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::moves)]
pub struct NewMoveRow {
    session_code: String,
    player_id: i64,
    row: i32,
    col: i32,
    value: i32,
    valid_at_submission: bool,
    created_at: NaiveDateTime,
}

impl NewMoveRow {
    /// Encodes a domain move record for storage.
    pub fn from_domain(record: &MoveRecord) -> Self {
        Self::new(
            record.session_code.clone(),
            record.player_id,
            record.row as i32,
            record.col as i32,
            record.value as i32,
            record.valid_at_submission,
            record.timestamp.naive_utc(),
        )
    }
}

/// Race result row. `session_code` carries a unique constraint so the
/// database itself enforces the one-result-per-session invariant.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::game_results)]
pub struct ResultRow {
    id: i32,
    session_code: String,
    winner_id: i64,
    winner_name: String,
    loser_id: Option<i64>,
    loser_name: Option<String>,
    winner_time_secs: i64,
    loser_time_secs: Option<i64>,
    difficulty: String,
    result_type: String,
    created_at: NaiveDateTime,
}

impl ResultRow {
    /// Decodes the row into a domain result.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if an enum string fails to parse.
    pub fn into_domain(self) -> Result<GameResult, StoreError> {
        let difficulty = self
            .difficulty
            .parse()
            .map_err(|e| StoreError::new(format!("bad difficulty '{}': {e}", self.difficulty)))?;
        let result_type = self
            .result_type
            .parse()
            .map_err(|e| StoreError::new(format!("bad result type '{}': {e}", self.result_type)))?;
        let loser = match (self.loser_id, self.loser_name) {
            (Some(id), Some(name)) => Some(Player::new(id, name)),
            _ => None,
        };
        Ok(GameResult {
            session_code: self.session_code,
            winner: Player::new(self.winner_id, self.winner_name),
            loser,
            winner_time_secs: self.winner_time_secs,
            loser_time_secs: self.loser_time_secs,
            difficulty,
            result_type,
            created_at: to_utc(self.created_at),
        })
    }
}

/// Insertable result row.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::game_results)]
pub struct NewResultRow {
    session_code: String,
    winner_id: i64,
    winner_name: String,
    loser_id: Option<i64>,
    loser_name: Option<String>,
    winner_time_secs: i64,
    loser_time_secs: Option<i64>,
    difficulty: String,
    result_type: String,
    created_at: NaiveDateTime,
}

impl NewResultRow {
    /// Encodes a domain result for storage.
    pub fn from_domain(result: &GameResult) -> Self {
        Self::new(
            result.session_code.clone(),
            result.winner.id,
            result.winner.username.clone(),
            result.loser.as_ref().map(|p| p.id),
            result.loser.as_ref().map(|p| p.username.clone()),
            result.winner_time_secs,
            result.loser_time_secs,
            result.difficulty.to_string(),
            result.result_type.to_string(),
            result.created_at.naive_utc(),
        )
    }
}
