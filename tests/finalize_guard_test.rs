//! Tests for finalize-once semantics under contention.

use std::sync::Arc;
use sudoku_race::{
    Difficulty, FinalizeGuard, GameError, GameSession, MemoryStore, Player, ResultType,
    SessionLocks, SessionStatus, SessionStore,
};

fn alice() -> Player {
    Player::new(1, "alice")
}

fn bob() -> Player {
    Player::new(2, "bob")
}

/// Seeds a store with a racing session and returns a guard over it.
async fn racing_fixture(code: &str) -> (Arc<dyn SessionStore>, FinalizeGuard) {
    let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
    let mut session = GameSession::new(code.to_string(), Difficulty::Easy, alice());
    session
        .seat_player(bob())
        .expect("Failed to seat second player");
    store
        .create_session(&session)
        .await
        .expect("Failed to create session");
    let guard = FinalizeGuard::new(store.clone(), SessionLocks::new());
    (store, guard)
}

#[tokio::test]
async fn test_finalize_records_result_and_finishes_session() {
    let (store, guard) = racing_fixture("GUARD001").await;

    let outcome = guard
        .finalize("GUARD001", 1, ResultType::Completion)
        .await
        .expect("Finalize failed");
    assert!(!outcome.already_finalized);
    assert_eq!(outcome.result.winner.id, 1);
    assert_eq!(outcome.result.loser.as_ref().map(|p| p.id), Some(2));
    assert_eq!(outcome.result.result_type, ResultType::Completion);
    assert_eq!(outcome.result.loser_time_secs, None);

    let session = store
        .get_session("GUARD001")
        .await
        .expect("Failed to load session")
        .expect("Session missing");
    assert_eq!(session.status, SessionStatus::Finished);

    let result = store
        .get_result("GUARD001")
        .await
        .expect("Failed to load result")
        .expect("Result missing");
    assert_eq!(result.winner.id, 1);
}

#[tokio::test]
async fn test_finalize_is_idempotent() {
    let (_store, guard) = racing_fixture("GUARD002").await;

    let first = guard
        .finalize("GUARD002", 2, ResultType::Forfeit)
        .await
        .expect("First finalize failed");
    assert!(!first.already_finalized);

    // A later call, even crediting a different winner, returns the committed
    // result untouched.
    let second = guard
        .finalize("GUARD002", 1, ResultType::Completion)
        .await
        .expect("Second finalize failed");
    assert!(second.already_finalized);
    assert_eq!(second.result.winner.id, 2);
    assert_eq!(second.result.result_type, ResultType::Forfeit);
}

#[tokio::test]
async fn test_finalize_rejects_waiting_session() {
    let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
    let session = GameSession::new("GUARD003".to_string(), Difficulty::Easy, alice());
    store
        .create_session(&session)
        .await
        .expect("Failed to create session");
    let guard = FinalizeGuard::new(store, SessionLocks::new());

    let err = guard
        .finalize("GUARD003", 1, ResultType::Completion)
        .await
        .expect_err("Finalize should fail before the race starts");
    assert!(matches!(err, GameError::State(_)), "unexpected error: {err}");
}

#[tokio::test]
async fn test_finalize_rejects_unknown_winner() {
    let (_store, guard) = racing_fixture("GUARD004").await;
    let err = guard
        .finalize("GUARD004", 99, ResultType::Completion)
        .await
        .expect_err("Finalize should reject an unseated winner");
    assert!(matches!(err, GameError::State(_)), "unexpected error: {err}");
}

#[tokio::test]
async fn test_finalize_prunes_session_lock_entry() {
    let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
    let mut session = GameSession::new("GUARD006".to_string(), Difficulty::Easy, alice());
    session
        .seat_player(bob())
        .expect("Failed to seat second player");
    store
        .create_session(&session)
        .await
        .expect("Failed to create session");
    let locks = SessionLocks::new();
    let guard = FinalizeGuard::new(store, locks.clone());

    let _lock = locks.lock_for("GUARD006");
    assert!(locks.contains("GUARD006"));

    guard
        .finalize("GUARD006", 1, ResultType::Completion)
        .await
        .expect("Finalize failed");
    assert!(
        !locks.contains("GUARD006"),
        "terminal sessions keep no lock entry"
    );

    // A late duplicate gets a fresh lock, re-reads the finished status, and
    // still resolves to the committed result.
    let outcome = guard
        .finalize("GUARD006", 2, ResultType::Completion)
        .await
        .expect("Late finalize failed");
    assert!(outcome.already_finalized);
    assert_eq!(outcome.result.winner.id, 1);
    assert!(!locks.contains("GUARD006"));
}

#[tokio::test]
async fn test_concurrent_finalize_commits_exactly_once() {
    let (store, guard) = racing_fixture("GUARD005").await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let guard = guard.clone();
        let winner = if i % 2 == 0 { 1 } else { 2 };
        handles.push(tokio::spawn(async move {
            guard
                .finalize("GUARD005", winner, ResultType::Completion)
                .await
        }));
    }

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(
            handle
                .await
                .expect("Finalize task panicked")
                .expect("Finalize failed"),
        );
    }

    let inserted: Vec<_> = outcomes.iter().filter(|o| !o.already_finalized).collect();
    assert_eq!(inserted.len(), 1, "exactly one caller commits the result");

    // Every caller observed the same winner.
    let winner = outcomes[0].result.winner.id;
    assert!(outcomes.iter().all(|o| o.result.winner.id == winner));

    let committed = store
        .get_result("GUARD005")
        .await
        .expect("Failed to load result")
        .expect("Result missing");
    assert_eq!(committed.winner.id, winner);
}
