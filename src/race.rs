//! Session state machine: join, move, complete, leave, play-again.
//!
//! One [`RaceCoordinator`] is shared by every connection task. It owns the
//! broadcaster and the finalize guard and talks to the injected
//! [`SessionStore`]; no global state is involved.

use crate::broadcast::Broadcaster;
use crate::error::GameError;
use crate::guard::{FinalizeGuard, SessionLocks};
use crate::messages::{ClientMessage, ServerMessage};
use crate::puzzle::{Difficulty, PlayerBoard};
use crate::session::{
    GameSession, MoveRecord, Player, PlayerId, ResultType, SessionStatus,
};
use crate::store::SessionStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Orchestrates all session transitions for the race mode.
#[derive(Clone)]
pub struct RaceCoordinator {
    store: Arc<dyn SessionStore>,
    broadcaster: Broadcaster,
    guard: FinalizeGuard,
    locks: SessionLocks,
}

impl RaceCoordinator {
    /// Creates a coordinator over the given store.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        info!("Creating race coordinator");
        let locks = SessionLocks::new();
        let guard = FinalizeGuard::new(store.clone(), locks.clone());
        Self {
            store,
            broadcaster: Broadcaster::new(),
            guard,
            locks,
        }
    }

    /// The store sessions are read from and written to.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// The group broadcaster connections register with.
    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Creates a new `waiting` session with a fresh code and puzzle.
    ///
    /// # Errors
    ///
    /// Returns a store error if no free code is found or the write fails.
    #[instrument(skip(self, creator), fields(player = %creator.username))]
    pub async fn create_session(
        &self,
        difficulty: Difficulty,
        creator: Player,
    ) -> Result<GameSession, GameError> {
        for _ in 0..4 {
            let code = GameSession::generate_code();
            if self.store.get_session(&code).await?.is_some() {
                debug!(%code, "Code collision, regenerating");
                continue;
            }
            let session = GameSession::new(code, difficulty, creator.clone());
            self.store.create_session(&session).await?;
            return Ok(session);
        }
        Err(GameError::connection("could not allocate a session code"))
    }

    /// Routes a decoded client frame to the matching operation.
    ///
    /// # Errors
    ///
    /// Any [`GameError`]; the connection layer renders it as an `error` frame
    /// for the offending client without touching session state.
    #[instrument(skip(self, player, message), fields(player = player.id))]
    pub async fn handle_message(
        &self,
        code: &str,
        player: &Player,
        message: ClientMessage,
    ) -> Result<(), GameError> {
        match message {
            ClientMessage::JoinGame { player_id } => {
                if player_id != player.id {
                    return Err(GameError::validation(format!(
                        "join_game player_id {player_id} does not match this connection"
                    )));
                }
                self.join(code, player.clone()).await
            }
            ClientMessage::Move { row, col, value } => {
                self.submit_move(code, player, row, col, value).await
            }
            ClientMessage::Complete => self.complete(code, player).await,
            ClientMessage::PlayAgain { difficulty } => {
                self.play_again(code, player, difficulty).await
            }
            ClientMessage::LeaveGame { reason } => {
                let reason = reason.unwrap_or_else(|| "left".to_string());
                self.leave(code, player, &reason).await
            }
            ClientMessage::GetBoard => {
                let state = self.game_state_for(code, player.id).await?;
                self.broadcaster.send_to_player(code, player.id, state);
                Ok(())
            }
            ClientMessage::Ping => {
                self.broadcaster
                    .send_to_player(code, player.id, ServerMessage::Pong);
                Ok(())
            }
        }
    }

    /// Seats a player. The second seat starts the race immediately: the
    /// session flips to `racing`, `start_time` is stamped, and
    /// `race_started` goes out to the whole group. Re-joining is an
    /// idempotent no-op that just re-sends `game_state`.
    #[instrument(skip(self, player), fields(player = player.id))]
    pub async fn join(&self, code: &str, player: Player) -> Result<(), GameError> {
        let lock = self.locks.lock_for(code);
        let seated = {
            let _guard = lock.lock().await;
            let mut session = self.require_session(code).await?;
            if session.slot_of(player.id).is_some() {
                debug!("Player already seated, re-sending state");
                None
            } else {
                session.seat_player(player.clone())?;
                self.store.update_session(&session).await?;
                Some(session)
            }
        };

        // All broadcast I/O happens after the lock is released.
        match seated {
            None => {
                let state = self.game_state_for(code, player.id).await?;
                self.broadcaster.send_to_player(code, player.id, state);
            }
            Some(session) if session.status == SessionStatus::Racing => {
                let start_time = session.start_time.ok_or_else(|| {
                    GameError::state(format!("racing session {code} has no start time"))
                })?;
                info!(%start_time, "Race started");
                self.broadcaster.send_to_group(
                    code,
                    ServerMessage::RaceStarted {
                        start_time,
                        puzzle: session.puzzle,
                    },
                );
            }
            Some(_) => {
                let state = self.game_state_for(code, player.id).await?;
                self.broadcaster.send_to_player(code, player.id, state);
                self.broadcaster.send_to_others(
                    code,
                    player.id,
                    ServerMessage::Notification {
                        message: format!("{} joined the game", player.username),
                    },
                );
            }
        }
        Ok(())
    }

    /// Applies a move to the mover's own board.
    ///
    /// Well-formed but rule-conflicting placements (digit already in the row,
    /// column, or box, or a prefilled target cell) are appended to the move
    /// log with `valid_at_submission = false`, leave the board untouched, and
    /// come back as a validation error. Valid moves mutate only the mover's
    /// board and notify the opponent; the opponent's copy is display-only.
    #[instrument(skip(self, player), fields(player = player.id))]
    pub async fn submit_move(
        &self,
        code: &str,
        player: &Player,
        row: usize,
        col: usize,
        value: u8,
    ) -> Result<(), GameError> {
        let session = self.require_session(code).await?;
        if session.status != SessionStatus::Racing {
            return Err(GameError::state(format!(
                "cannot move while session is {}",
                session.status
            )));
        }
        let board = session
            .board_of(player.id)
            .ok_or_else(|| GameError::state(format!("player {} not in session", player.id)))?;

        // Malformed coordinates fail here and are never logged.
        let fits = board.validate_cell(row, col, value)?;
        let valid = fits && !board.is_prefilled(row, col);

        self.store
            .append_move(&MoveRecord {
                session_code: code.to_string(),
                player_id: player.id,
                row,
                col,
                value,
                valid_at_submission: valid,
                timestamp: Utc::now(),
            })
            .await?;

        if !valid {
            let reason = if board.is_prefilled(row, col) {
                "that cell is part of the puzzle"
            } else {
                "that digit conflicts with an existing one"
            };
            debug!(row, col, value, "Move rejected: {reason}");
            return Err(GameError::validation(format!("invalid move: {reason}")));
        }

        let mut board = board.clone();
        board.place(row, col, value);
        self.store.update_board(code, player.id, &board).await?;

        self.broadcaster.send_to_others(
            code,
            player.id,
            ServerMessage::Move {
                username: player.username.clone(),
                player_id: player.id,
                row,
                col,
                value,
            },
        );
        Ok(())
    }

    /// Handles a completion claim: re-validates the full board, finalizes on
    /// success, and broadcasts `race_finished` to both players.
    ///
    /// # Errors
    ///
    /// `Validation` if the board is not a completed valid grid (the player
    /// may keep editing and resubmit); `Conflict` if the opponent already
    /// won.
    #[instrument(skip(self, player), fields(player = player.id))]
    pub async fn complete(&self, code: &str, player: &Player) -> Result<(), GameError> {
        let session = self.require_session(code).await?;
        match session.status {
            SessionStatus::Racing => {}
            SessionStatus::Finished => {
                return Err(GameError::conflict(format!(
                    "the race in session {code} is already finished"
                )));
            }
            other => {
                return Err(GameError::state(format!(
                    "cannot complete while session is {other}"
                )));
            }
        }
        let board = session
            .board_of(player.id)
            .ok_or_else(|| GameError::state(format!("player {} not in session", player.id)))?;
        if !board.is_complete() {
            warn!("Completion claim rejected, board not valid");
            return Err(GameError::validation(
                "the board is not a valid completed grid",
            ));
        }

        let outcome = self
            .guard
            .finalize(code, player.id, ResultType::Completion)
            .await?;
        if outcome.already_finalized && outcome.result.winner.id != player.id {
            return Err(GameError::conflict(format!(
                "{} already won this race",
                outcome.result.winner.username
            )));
        }

        let finished = ServerMessage::RaceFinished {
            winner_id: outcome.result.winner.id,
            winner_username: outcome.result.winner.username.clone(),
            winner_time: outcome.result.winner_time(),
            loser_time: outcome.result.loser_time(),
        };
        if outcome.already_finalized {
            // Duplicate submit from the winner; just repeat the verdict.
            self.broadcaster.send_to_player(code, player.id, finished);
        } else {
            self.broadcaster.send_to_group(code, finished);
        }
        Ok(())
    }

    /// Handles a leave. Mid-race the remaining player wins by forfeit;
    /// before the race the session is abandoned with no result; after the
    /// race nothing changes. The leaver always gets a confirmation.
    ///
    /// The status read and the abandon write happen under the session lock,
    /// so a join landing at the same moment cannot flip the session to
    /// `racing` underneath the abandon.
    #[instrument(skip(self, player), fields(player = player.id))]
    pub async fn leave(&self, code: &str, player: &Player, reason: &str) -> Result<(), GameError> {
        let lock = self.locks.lock_for(code);
        let (status, remaining) = {
            let _guard = lock.lock().await;
            let mut session = self.require_session(code).await?;
            if session.slot_of(player.id).is_none() {
                return Err(GameError::state(format!(
                    "player {} not in session {code}",
                    player.id
                )));
            }
            let remaining = session.opponent_of(player.id).cloned();
            match session.status {
                SessionStatus::Waiting | SessionStatus::Ready => {
                    session.status = SessionStatus::Abandoned;
                    self.store.update_session(&session).await?;
                    self.locks.remove(code);
                    info!("Session abandoned");
                }
                SessionStatus::Racing => {}
                SessionStatus::Finished | SessionStatus::Abandoned => {
                    debug!("Leave after session end, nothing to transition");
                    self.locks.remove(code);
                }
            }
            (session.status, remaining)
        };

        // The forfeit runs after the lock is released; the guard re-reads
        // status under it and absorbs any concurrent finalize.
        if status == SessionStatus::Racing {
            let winner = remaining.clone().ok_or_else(|| {
                GameError::state(format!("racing session {code} is missing a player"))
            })?;
            let outcome = self
                .guard
                .finalize(code, winner.id, ResultType::Forfeit)
                .await?;
            if !outcome.already_finalized {
                info!(winner = winner.id, "Race won by forfeit");
                self.broadcaster.send_to_group(
                    code,
                    ServerMessage::RaceFinished {
                        winner_id: outcome.result.winner.id,
                        winner_username: outcome.result.winner.username.clone(),
                        winner_time: outcome.result.winner_time(),
                        loser_time: outcome.result.loser_time(),
                    },
                );
            }
        }

        self.broadcaster.send_to_others(
            code,
            player.id,
            ServerMessage::PlayerLeftGame {
                leaving_player: player.username.clone(),
                remaining_player: remaining.map(|p| p.username),
                reason: reason.to_string(),
            },
        );
        self.broadcaster.send_to_player(
            code,
            player.id,
            ServerMessage::LeaveGameConfirmed {
                message: format!("You left game {code}"),
            },
        );
        Ok(())
    }

    /// Implicit leave for a dropped socket, treated like
    /// `leave_game{reason: "disconnect"}`. A drop after the session already
    /// ended (including one caused by an explicit leave) is a no-op, so the
    /// group is not notified twice.
    #[instrument(skip(self, player), fields(player = player.id))]
    pub async fn handle_disconnect(&self, code: &str, player: &Player) {
        let session = match self.store.get_session(code).await {
            Ok(Some(session)) => session,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "Disconnect cleanup failed to load session");
                return;
            }
        };
        if session.status.is_terminal() || session.slot_of(player.id).is_none() {
            debug!("Disconnect needs no transition");
            return;
        }
        if let Err(e) = self.leave(code, player, "disconnect").await {
            warn!(error = %e, "Disconnect cleanup failed");
        }
    }

    /// Creates a rematch session and announces its code to the old group.
    /// The finished session is left untouched; the opponent joins the new
    /// code to start the next race.
    #[instrument(skip(self, player), fields(player = player.id))]
    pub async fn play_again(
        &self,
        code: &str,
        player: &Player,
        difficulty: Difficulty,
    ) -> Result<(), GameError> {
        let session = self.require_session(code).await?;
        if session.status != SessionStatus::Finished {
            return Err(GameError::state(format!(
                "play again is only available once the race is finished, session is {}",
                session.status
            )));
        }
        if session.slot_of(player.id).is_none() {
            return Err(GameError::state(format!(
                "player {} not in session {code}",
                player.id
            )));
        }

        let rematch = self.create_session(difficulty, player.clone()).await?;
        info!(new_code = %rematch.code, "Rematch created");
        self.broadcaster.send_to_group(
            code,
            ServerMessage::NewGameCreated {
                game_code: rematch.code,
            },
        );
        Ok(())
    }

    /// Builds the `game_state` snapshot for one player: their own board
    /// only, never the opponent's live grid.
    #[instrument(skip(self))]
    pub async fn game_state_for(
        &self,
        code: &str,
        player_id: PlayerId,
    ) -> Result<ServerMessage, GameError> {
        let session = self.require_session(code).await?;
        let board = session
            .board_of(player_id)
            .cloned()
            // Not seated yet: show the bare puzzle.
            .unwrap_or_else(|| PlayerBoard::from_puzzle(&session.puzzle));
        Ok(ServerMessage::GameState {
            board: *board.board(),
            puzzle: session.puzzle,
            player1: session.player1.as_ref().map(|p| p.username.clone()),
            player2: session.player2.as_ref().map(|p| p.username.clone()),
            status: session.status,
            start_time: session.start_time,
        })
    }

    async fn require_session(&self, code: &str) -> Result<GameSession, GameError> {
        self.store
            .get_session(code)
            .await?
            .ok_or_else(|| GameError::state(format!("unknown session {code}")))
    }
}
