//! In-process session store backed by a shared map.

use super::{SessionStore, StoreError};
use crate::puzzle::PlayerBoard;
use crate::session::{GameResult, GameSession, MoveRecord, PlayerId, Slot};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument};

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<String, GameSession>,
    moves: Vec<MoveRecord>,
    results: HashMap<String, GameResult>,
}

/// Map-backed [`SessionStore`] for tests and single-instance deployments.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating in-memory session store");
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    #[instrument(skip(self, session), fields(code = %session.code))]
    async fn create_session(&self, session: &GameSession) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.sessions.contains_key(&session.code) {
            return Err(StoreError::new(format!(
                "session code {} already exists",
                session.code
            )));
        }
        inner.sessions.insert(session.code.clone(), session.clone());
        debug!("Session stored");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_session(&self, code: &str) -> Result<Option<GameSession>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.sessions.get(code).cloned())
    }

    #[instrument(skip(self, session), fields(code = %session.code))]
    async fn update_session(&self, session: &GameSession) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.sessions.contains_key(&session.code) {
            return Err(StoreError::new(format!("unknown session {}", session.code)));
        }
        inner.sessions.insert(session.code.clone(), session.clone());
        Ok(())
    }

    #[instrument(skip(self, board))]
    async fn update_board(
        &self,
        code: &str,
        player_id: PlayerId,
        board: &PlayerBoard,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let session = inner
            .sessions
            .get_mut(code)
            .ok_or_else(|| StoreError::new(format!("unknown session {code}")))?;
        match session.slot_of(player_id) {
            Some(Slot::One) => session.board1 = board.clone(),
            Some(Slot::Two) => session.board2 = board.clone(),
            None => {
                return Err(StoreError::new(format!(
                    "player {player_id} not in session {code}"
                )));
            }
        }
        Ok(())
    }

    #[instrument(skip(self, record), fields(code = %record.session_code))]
    async fn append_move(&self, record: &MoveRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.moves.push(record.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn moves_for_session(&self, code: &str) -> Result<Vec<MoveRecord>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .moves
            .iter()
            .filter(|m| m.session_code == code)
            .cloned()
            .collect())
    }

    #[instrument(skip(self, result), fields(code = %result.session_code, winner = result.winner.id))]
    async fn create_result(&self, result: &GameResult) -> Result<(GameResult, bool), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.results.get(&result.session_code) {
            debug!("Result already committed, returning existing row");
            return Ok((existing.clone(), false));
        }
        inner
            .results
            .insert(result.session_code.clone(), result.clone());
        info!("Race result recorded");
        Ok((result.clone(), true))
    }

    #[instrument(skip(self))]
    async fn get_result(&self, code: &str) -> Result<Option<GameResult>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.results.get(code).cloned())
    }
}
