//! Per-socket connection lifecycle and HTTP routing.
//!
//! Each WebSocket at `/ws/game/{code}` is bound to a `(session, player)` pair
//! at upgrade time. The socket itself holds no session state; a reconnecting
//! client opens a fresh socket and re-requests `game_state`.

use crate::error::GameError;
use crate::messages::{ClientMessage, ServerMessage};
use crate::puzzle::Difficulty;
use crate::race::RaceCoordinator;
use crate::session::{Player, PlayerId};
use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

/// Identity of the connecting player, supplied by the (out-of-scope)
/// identity layer as query parameters.
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    /// Player id.
    pub player_id: PlayerId,
    /// Display name.
    pub username: String,
}

/// Request body for creating a session over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGameRequest {
    /// Race difficulty.
    pub difficulty: Difficulty,
    /// Creator's player id.
    pub player_id: PlayerId,
    /// Creator's display name.
    pub username: String,
}

/// Response body for a created session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGameResponse {
    /// Public code for joining via the WebSocket path.
    pub code: String,
    /// Difficulty the session was created with.
    pub difficulty: Difficulty,
}

/// Builds the server router: the WebSocket endpoint plus the minimal
/// session-creation route the rest of the (external) CRUD layer would
/// otherwise provide.
pub fn router(coordinator: RaceCoordinator) -> Router {
    Router::new()
        .route("/ws/game/{code}", get(ws_handler))
        .route("/games", post(create_game))
        .with_state(coordinator)
}

#[instrument(skip(coordinator, req), fields(player = req.player_id))]
async fn create_game(
    State(coordinator): State<RaceCoordinator>,
    axum::Json(req): axum::Json<CreateGameRequest>,
) -> Response {
    let creator = Player::new(req.player_id, req.username);
    match coordinator.create_session(req.difficulty, creator).await {
        Ok(session) => (
            StatusCode::CREATED,
            axum::Json(CreateGameResponse {
                code: session.code,
                difficulty: session.difficulty,
            }),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to create session");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

#[instrument(skip(ws, coordinator, query), fields(player = query.player_id))]
async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(code): Path<String>,
    Query(query): Query<ConnectQuery>,
    State(coordinator): State<RaceCoordinator>,
) -> Response {
    // Reject unknown codes before upgrading.
    match coordinator.store().get_session(&code).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            warn!(%code, "WebSocket rejected: unknown session");
            return (StatusCode::NOT_FOUND, "game not found").into_response();
        }
        Err(e) => {
            error!(error = %e, "WebSocket rejected: store failure");
            return (StatusCode::INTERNAL_SERVER_ERROR, "store unavailable").into_response();
        }
    }

    let player = Player::new(query.player_id, query.username);
    ws.on_upgrade(move |socket| handle_socket(socket, coordinator, code, player))
}

/// Runs one connection to completion: register with the group, send the
/// initial snapshot, pump both directions, then clean up. A bare disconnect
/// mid-race forfeits via the coordinator's implicit leave.
async fn handle_socket(socket: WebSocket, coordinator: RaceCoordinator, code: String, player: Player) {
    let broadcaster = coordinator.broadcaster().clone();
    let (conn_id, mut outbox) = broadcaster.register(&code, player.id);
    info!(%code, player = player.id, connection = %conn_id, "Player connected");

    match coordinator.game_state_for(&code, player.id).await {
        Ok(state) => broadcaster.send_to_connection(&code, conn_id, state),
        Err(e) => {
            error!(error = %e, "Failed to build initial game state");
            broadcaster.send_to_connection(
                &code,
                conn_id,
                ServerMessage::Error {
                    error: e.to_string(),
                },
            );
        }
    }
    broadcaster.send_to_others(
        &code,
        player.id,
        ServerMessage::Notification {
            message: format!("{} connected", player.username),
        },
    );

    let (mut sink, mut stream) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(message) = outbox.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!(error = %e, "Failed to serialize server message");
                    continue;
                }
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_coordinator = coordinator.clone();
    let recv_broadcaster = broadcaster.clone();
    let recv_code = code.clone();
    let recv_player = player.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    let message: ClientMessage = match serde_json::from_str(text.as_str()) {
                        Ok(message) => message,
                        Err(e) => {
                            debug!(error = %e, "Undecodable client frame");
                            recv_broadcaster.send_to_player(
                                &recv_code,
                                recv_player.id,
                                ServerMessage::Error {
                                    error: format!("invalid message: {e}"),
                                },
                            );
                            continue;
                        }
                    };
                    let leaving = matches!(message, ClientMessage::LeaveGame { .. });
                    match recv_coordinator
                        .handle_message(&recv_code, &recv_player, message)
                        .await
                    {
                        Ok(()) if leaving => break,
                        Ok(()) => {}
                        Err(e) => {
                            report_error(&recv_broadcaster, &recv_code, recv_player.id, e);
                        }
                    }
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    debug!("Keepalive frame");
                }
                Ok(Message::Close(_)) => {
                    debug!("Client closed socket");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Socket error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    broadcaster.unregister(&code, conn_id);
    broadcaster.send_to_others(
        &code,
        player.id,
        ServerMessage::Notification {
            message: format!("{} disconnected", player.username),
        },
    );
    coordinator.handle_disconnect(&code, &player).await;
    info!(%code, player = player.id, connection = %conn_id, "Player disconnected");
}

/// Renders a recoverable [`GameError`] back to the offending client.
fn report_error(
    broadcaster: &crate::broadcast::Broadcaster,
    code: &str,
    player_id: PlayerId,
    error: GameError,
) {
    debug!(%error, "Client operation failed");
    broadcaster.send_to_player(
        code,
        player_id,
        ServerMessage::Error {
            error: error.to_string(),
        },
    );
}
