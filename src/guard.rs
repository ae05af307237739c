//! Race-safe finalize-once semantics over session status.

use crate::error::GameError;
use crate::session::{GameResult, PlayerId, ResultType, SessionStatus};
use crate::store::SessionStore;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, instrument, warn};

/// Registry of per-session async locks.
///
/// Any path that mutates session status (join, abandon, finalize) takes the
/// session's lock first, so status transitions serialize per session without
/// a process-wide bottleneck. Ordinary moves never touch this.
#[derive(Debug, Clone, Default)]
pub struct SessionLocks {
    locks: Arc<StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl SessionLocks {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock for a session code, creating it on first use.
    pub fn lock_for(&self, code: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks
            .entry(code.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Drops the lock entry for a session. Called once the session turns
    /// terminal; a straggler gets a fresh lock and re-reads the terminal
    /// status under it.
    pub fn remove(&self, code: &str) {
        self.locks.lock().unwrap().remove(code);
    }

    /// True if a lock entry exists for the session code.
    pub fn contains(&self, code: &str) -> bool {
        self.locks.lock().unwrap().contains_key(code)
    }
}

/// Outcome of a finalize call.
#[derive(Debug, Clone)]
pub struct FinalizeOutcome {
    /// The committed result every caller observes.
    pub result: GameResult,
    /// True if some earlier call (or concurrent writer) had already
    /// finalized the session.
    pub already_finalized: bool,
}

/// Guards the only contested resource of a race: session status plus the
/// one-and-only [`GameResult`].
///
/// Protocol: take the per-session lock, re-read status under it, write the
/// result and flip the status, release. Broadcast I/O is the caller's job and
/// happens strictly after the lock is released. A unique-constraint race in
/// the store resolves to the committed row rather than an error.
#[derive(Clone)]
pub struct FinalizeGuard {
    store: Arc<dyn SessionStore>,
    locks: SessionLocks,
}

impl FinalizeGuard {
    /// Creates a guard over the given store, sharing the lock registry with
    /// the rest of the coordinator.
    pub fn new(store: Arc<dyn SessionStore>, locks: SessionLocks) -> Self {
        Self { store, locks }
    }

    /// Finalizes the race, crediting `winner_id`.
    ///
    /// Idempotent: if the session is already `finished`, the existing result
    /// is returned with `already_finalized = true`. N concurrent calls yield
    /// exactly one persisted result, and every caller observes the same
    /// winner.
    ///
    /// # Errors
    ///
    /// `GameError::State` if the session does not exist, is not racing, or
    /// the named winner is not seated in it.
    #[instrument(skip(self))]
    pub async fn finalize(
        &self,
        code: &str,
        winner_id: PlayerId,
        result_type: ResultType,
    ) -> Result<FinalizeOutcome, GameError> {
        let lock = self.locks.lock_for(code);
        let _guard = lock.lock().await;

        let mut session = self
            .store
            .get_session(code)
            .await?
            .ok_or_else(|| GameError::state(format!("unknown session {code}")))?;

        match session.status {
            SessionStatus::Finished => {
                let existing = self.store.get_result(code).await?.ok_or_else(|| {
                    GameError::state(format!("session {code} finished without a result"))
                })?;
                debug!(winner = existing.winner.id, "Session already finalized");
                self.locks.remove(code);
                return Ok(FinalizeOutcome {
                    result: existing,
                    already_finalized: true,
                });
            }
            SessionStatus::Racing => {}
            other => {
                warn!(status = %other, "Finalize rejected outside racing");
                return Err(GameError::state(format!(
                    "cannot finalize session {code} in status {other}"
                )));
            }
        }

        let winner = session
            .player(winner_id)
            .cloned()
            .ok_or_else(|| GameError::state(format!("player {winner_id} not in session {code}")))?;
        let loser = session.opponent_of(winner_id).cloned();
        let start = session
            .start_time
            .ok_or_else(|| GameError::state(format!("racing session {code} has no start time")))?;
        let elapsed = (Utc::now() - start).num_seconds().max(0);

        let result = GameResult {
            session_code: code.to_string(),
            winner,
            loser,
            winner_time_secs: elapsed,
            loser_time_secs: None,
            difficulty: session.difficulty,
            result_type,
            created_at: Utc::now(),
        };

        let (committed, inserted) = self.store.create_result(&result).await?;
        session.status = SessionStatus::Finished;
        self.store.update_session(&session).await?;
        self.locks.remove(code);

        info!(
            winner = committed.winner.id,
            %result_type,
            inserted,
            "Race finalized"
        );
        Ok(FinalizeOutcome {
            result: committed,
            already_finalized: !inserted,
        })
    }
}
