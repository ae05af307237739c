//! Diesel-backed [`SessionStore`] implementation.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_migrations::MigrationHarness;
use tracing::{debug, info, instrument, warn};

use crate::db::models::{
    MoveRow, NewMoveRow, NewResultRow, NewSessionRow, ResultRow, SessionRow,
};
use crate::db::{MIGRATIONS, schema};
use crate::puzzle::PlayerBoard;
use crate::session::{GameResult, GameSession, MoveRecord, PlayerId};
use crate::store::{SessionStore, StoreError};

/// SQLite session store.
///
/// Opens a fresh connection per operation, the same pattern the rest of the
/// deployment uses for its short-lived CRUD queries. Use `":memory:"` only in
/// single-connection tests; each connection gets its own in-memory database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: String,
}

impl SqliteStore {
    /// Creates a store for the database at the given path.
    #[instrument]
    pub fn new(db_path: String) -> Self {
        info!(path = %db_path, "Creating SQLite session store");
        Self { db_path }
    }

    /// Applies any pending embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the connection or a migration fails.
    #[instrument(skip(self))]
    pub fn run_migrations(&self) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::new(format!("Migration error: {e}")))?;
        info!("Migrations applied");
        Ok(())
    }

    fn connection(&self) -> Result<SqliteConnection, StoreError> {
        debug!(path = %self.db_path, "Establishing connection");
        SqliteConnection::establish(&self.db_path)
            .map_err(|e| StoreError::new(format!("Failed to connect to '{}': {}", self.db_path, e)))
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    #[instrument(skip(self, session), fields(code = %session.code))]
    async fn create_session(&self, session: &GameSession) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        let row = NewSessionRow::from_domain(session)?;
        diesel::insert_into(schema::game_sessions::table)
            .values(&row)
            .execute(&mut conn)?;
        info!("Session stored");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_session(&self, code: &str) -> Result<Option<GameSession>, StoreError> {
        let mut conn = self.connection()?;
        let row = schema::game_sessions::table
            .filter(schema::game_sessions::code.eq(code))
            .select(SessionRow::as_select())
            .first::<SessionRow>(&mut conn)
            .optional()?;
        row.map(SessionRow::into_domain).transpose()
    }

    #[instrument(skip(self, session), fields(code = %session.code))]
    async fn update_session(&self, session: &GameSession) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        let changes = NewSessionRow::from_domain(session)?;
        let updated = diesel::update(
            schema::game_sessions::table.filter(schema::game_sessions::code.eq(&session.code)),
        )
        .set(&changes)
        .execute(&mut conn)?;
        if updated == 0 {
            return Err(StoreError::new(format!("unknown session {}", session.code)));
        }
        debug!("Session updated");
        Ok(())
    }

    #[instrument(skip(self, board))]
    async fn update_board(
        &self,
        code: &str,
        player_id: PlayerId,
        board: &PlayerBoard,
    ) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        let encoded = serde_json::to_string(board)?;
        let slots = schema::game_sessions::table
            .filter(schema::game_sessions::code.eq(code))
            .select((
                schema::game_sessions::player1_id,
                schema::game_sessions::player2_id,
            ))
            .first::<(Option<i64>, Option<i64>)>(&mut conn)
            .optional()?
            .ok_or_else(|| StoreError::new(format!("unknown session {code}")))?;

        let target = schema::game_sessions::table.filter(schema::game_sessions::code.eq(code));
        if slots.0 == Some(player_id) {
            diesel::update(target)
                .set(schema::game_sessions::player1_board.eq(encoded))
                .execute(&mut conn)?;
        } else if slots.1 == Some(player_id) {
            diesel::update(target)
                .set(schema::game_sessions::player2_board.eq(encoded))
                .execute(&mut conn)?;
        } else {
            return Err(StoreError::new(format!(
                "player {player_id} not in session {code}"
            )));
        }
        debug!("Player board updated");
        Ok(())
    }

    #[instrument(skip(self, record), fields(code = %record.session_code))]
    async fn append_move(&self, record: &MoveRecord) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        let row = NewMoveRow::from_domain(record);
        diesel::insert_into(schema::moves::table)
            .values(&row)
            .execute(&mut conn)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn moves_for_session(&self, code: &str) -> Result<Vec<MoveRecord>, StoreError> {
        let mut conn = self.connection()?;
        let rows = schema::moves::table
            .filter(schema::moves::session_code.eq(code))
            .order(schema::moves::id.asc())
            .select(MoveRow::as_select())
            .load::<MoveRow>(&mut conn)?;
        Ok(rows.into_iter().map(MoveRow::into_domain).collect())
    }

    #[instrument(skip(self, result), fields(code = %result.session_code, winner = result.winner.id))]
    async fn create_result(&self, result: &GameResult) -> Result<(GameResult, bool), StoreError> {
        let mut conn = self.connection()?;
        let row = NewResultRow::from_domain(result);
        let inserted = diesel::insert_into(schema::game_results::table)
            .values(&row)
            .returning(ResultRow::as_returning())
            .get_result(&mut conn);

        match inserted {
            Ok(row) => {
                info!("Race result recorded");
                Ok((row.into_domain()?, true))
            }
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                // Lost the finalize race to another writer; their row wins.
                warn!("Result already committed, reading existing row");
                let existing = schema::game_results::table
                    .filter(schema::game_results::session_code.eq(&result.session_code))
                    .select(ResultRow::as_select())
                    .first::<ResultRow>(&mut conn)?;
                Ok((existing.into_domain()?, false))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn get_result(&self, code: &str) -> Result<Option<GameResult>, StoreError> {
        let mut conn = self.connection()?;
        let row = schema::game_results::table
            .filter(schema::game_results::session_code.eq(code))
            .select(ResultRow::as_select())
            .first::<ResultRow>(&mut conn)
            .optional()?;
        row.map(ResultRow::into_domain).transpose()
    }
}
