//! Durable session repository consumed by the race coordinator.
//!
//! The coordinator is written against the [`SessionStore`] trait so the same
//! state machine runs over the in-memory store (tests, single instance) or the
//! SQLite store in [`crate::db`].

mod error;
mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

use crate::puzzle::PlayerBoard;
use crate::session::{GameResult, GameSession, MoveRecord, PlayerId};
use async_trait::async_trait;

/// Repository for sessions, the append-only move log, and race results.
///
/// Callers that mutate session status (join, leave, finalize) are expected to
/// hold the per-session lock from [`crate::guard`]; board updates touch only
/// the calling player's column and need no cross-player coordination.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persists a new session.
    ///
    /// # Errors
    ///
    /// Fails if the session code is already taken.
    async fn create_session(&self, session: &GameSession) -> Result<(), StoreError>;

    /// Loads a session by public code. `None` if unknown.
    async fn get_session(&self, code: &str) -> Result<Option<GameSession>, StoreError>;

    /// Replaces the stored session record.
    async fn update_session(&self, session: &GameSession) -> Result<(), StoreError>;

    /// Writes one player's private board without touching the rest of the
    /// session record.
    async fn update_board(
        &self,
        code: &str,
        player_id: PlayerId,
        board: &PlayerBoard,
    ) -> Result<(), StoreError>;

    /// Appends a move to the immutable log. Invalid attempts are logged too.
    async fn append_move(&self, record: &MoveRecord) -> Result<(), StoreError>;

    /// Returns the move log for a session in submission order.
    async fn moves_for_session(&self, code: &str) -> Result<Vec<MoveRecord>, StoreError>;

    /// Records a race result, enforcing at most one per session.
    ///
    /// Returns the committed result and whether this call inserted it. When a
    /// concurrent writer got there first (unique-constraint race), the
    /// already-committed row is returned with `false` instead of an error.
    async fn create_result(&self, result: &GameResult) -> Result<(GameResult, bool), StoreError>;

    /// Loads the result for a session, if one was recorded.
    async fn get_result(&self, code: &str) -> Result<Option<GameResult>, StoreError>;
}
