//! Error taxonomy for the race coordinator.

use crate::puzzle::InvalidInput;
use crate::store::StoreError;
use derive_more::{Display, Error, From};

/// Errors surfaced to connections and callers of the state machine.
///
/// `Validation` and `State` are recoverable: they are reported back to the
/// offending client as an `error` message and leave the session untouched.
/// `Conflict` means the race was already finalized by the other player.
#[derive(Debug, Clone, Display, Error, From)]
pub enum GameError {
    /// Malformed row/col/value or otherwise bad client input.
    #[display("validation error: {_0}")]
    Validation(#[error(not(source))] String),
    /// Action not valid for the session's current status.
    #[display("state error: {_0}")]
    State(#[error(not(source))] String),
    /// The race result was already finalized.
    #[display("conflict: {_0}")]
    Conflict(#[error(not(source))] String),
    /// Abrupt socket loss or undeliverable peer.
    #[display("connection error: {_0}")]
    Connection(#[error(not(source))] String),
    /// Failure in the session store.
    #[display("store error: {_0}")]
    #[from]
    Store(StoreError),
}

impl GameError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        GameError::Validation(message.into())
    }

    /// Creates a state error.
    pub fn state(message: impl Into<String>) -> Self {
        GameError::State(message.into())
    }

    /// Creates a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        GameError::Conflict(message.into())
    }

    /// Creates a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        GameError::Connection(message.into())
    }
}

impl From<InvalidInput> for GameError {
    fn from(err: InvalidInput) -> Self {
        GameError::Validation(err.message)
    }
}
