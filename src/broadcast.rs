//! Group fan-out to the sockets of a session.
//!
//! Groups are keyed by session code. Each connection registers its own
//! unbounded channel, so delivery to one recipient is FIFO; no ordering is
//! promised across different members.

use crate::messages::ServerMessage;
use crate::session::PlayerId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Unique id for one socket's membership in a group.
pub type ConnectionId = Uuid;

#[derive(Debug)]
struct Member {
    id: ConnectionId,
    player_id: PlayerId,
    sender: mpsc::UnboundedSender<ServerMessage>,
}

/// Pub/sub hub delivering [`ServerMessage`]s to session groups.
#[derive(Debug, Clone, Default)]
pub struct Broadcaster {
    groups: Arc<Mutex<HashMap<String, Vec<Member>>>>,
}

impl Broadcaster {
    /// Creates an empty broadcaster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to a session group and returns its id plus the
    /// receiving end the socket task should drain.
    #[instrument(skip(self))]
    pub fn register(
        &self,
        code: &str,
        player_id: PlayerId,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<ServerMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        let mut groups = self.groups.lock().unwrap();
        groups.entry(code.to_string()).or_default().push(Member {
            id,
            player_id,
            sender,
        });
        debug!(connection = %id, "Registered connection");
        (id, receiver)
    }

    /// Removes a connection from its group. Empty groups are dropped.
    #[instrument(skip(self))]
    pub fn unregister(&self, code: &str, id: ConnectionId) {
        let mut groups = self.groups.lock().unwrap();
        if let Some(members) = groups.get_mut(code) {
            members.retain(|m| m.id != id);
            if members.is_empty() {
                groups.remove(code);
            }
        }
        debug!(connection = %id, "Unregistered connection");
    }

    /// Sends to every member of the group.
    #[instrument(skip(self, message))]
    pub fn send_to_group(&self, code: &str, message: ServerMessage) {
        self.send_where(code, &message, |_| true);
    }

    /// Sends to every connection of one player (a player may hold more than
    /// one socket briefly around a reconnect).
    #[instrument(skip(self, message))]
    pub fn send_to_player(&self, code: &str, player_id: PlayerId, message: ServerMessage) {
        self.send_where(code, &message, |m| m.player_id == player_id);
    }

    /// Sends to everyone in the group except the given player.
    #[instrument(skip(self, message))]
    pub fn send_to_others(&self, code: &str, except: PlayerId, message: ServerMessage) {
        self.send_where(code, &message, |m| m.player_id != except);
    }

    /// Sends to a single connection.
    #[instrument(skip(self, message))]
    pub fn send_to_connection(&self, code: &str, id: ConnectionId, message: ServerMessage) {
        self.send_where(code, &message, |m| m.id == id);
    }

    fn send_where(&self, code: &str, message: &ServerMessage, pred: impl Fn(&Member) -> bool) {
        let groups = self.groups.lock().unwrap();
        let Some(members) = groups.get(code) else {
            debug!("No group for session, dropping message");
            return;
        };
        for member in members.iter().filter(|m| pred(m)) {
            if member.sender.send(message.clone()).is_err() {
                // Receiver task already gone; unregister will clean it up.
                warn!(connection = %member.id, "Dropping message for dead connection");
            }
        }
    }
}
