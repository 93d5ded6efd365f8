use crate::relay_config::RelayConfig;
use axum::extract::ws::Message;
use dashmap::DashMap;
use meshroom_core::{PeerId, RoomId, SignalMessage};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

struct RelayInner {
    clients: DashMap<PeerId, mpsc::UnboundedSender<Message>>,
    rooms: DashMap<RoomId, Vec<PeerId>>,
    announce_existing: bool,
}

/// Room membership and message forwarding for every connected client.
///
/// The relay never looks inside an offer, answer or candidate. It checks
/// that the addressee is a member of the named room, stamps `from` with
/// the connection the frame arrived on and passes the frame on otherwise
/// untouched, extra fields included.
#[derive(Clone)]
pub struct RelayService {
    inner: Arc<RelayInner>,
}

impl RelayService {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            inner: Arc::new(RelayInner {
                clients: DashMap::new(),
                rooms: DashMap::new(),
                announce_existing: config.announce_existing,
            }),
        }
    }

    /// Registers a new connection and tells it the id it was given.
    pub fn register(&self, tx: mpsc::UnboundedSender<Message>) -> PeerId {
        let client_id = PeerId::new();
        self.inner.clients.insert(client_id.clone(), tx);
        self.send(
            &client_id,
            &SignalMessage::ClientId {
                client_id: client_id.clone(),
            },
        );
        client_id
    }

    pub fn handle_text(&self, from: &PeerId, text: &str) {
        let msg = match SignalMessage::decode(text) {
            Ok(Some(msg)) => msg,
            Ok(None) => {
                debug!("Ignoring unknown message type from {}", from);
                return;
            }
            Err(e) => {
                warn!("Invalid message from {}: {}", from, e);
                return;
            }
        };

        match &msg {
            SignalMessage::Join { room_id } => self.join(from, room_id),
            SignalMessage::Leave { room_id } => self.leave(from, room_id),
            SignalMessage::Offer { .. }
            | SignalMessage::Answer { .. }
            | SignalMessage::Candidate { .. } => self.forward(from, &msg, text),
            other => warn!("Client {} sent relay-only message {}", from, other.kind()),
        }
    }

    pub fn join(&self, client_id: &PeerId, room_id: &RoomId) {
        let existing = {
            let mut members = self.inner.rooms.entry(room_id.clone()).or_default();
            if members.contains(client_id) {
                debug!("Client {} already in room {}", client_id, room_id);
                return;
            }
            let existing = members.clone();
            members.push(client_id.clone());
            existing
        };

        info!(
            "Client {} joined room {} ({} members)",
            client_id,
            room_id,
            existing.len() + 1
        );

        for member in &existing {
            self.send(
                member,
                &SignalMessage::UserJoined {
                    user_id: client_id.clone(),
                },
            );
            if self.inner.announce_existing {
                self.send(
                    client_id,
                    &SignalMessage::UserJoined {
                        user_id: member.clone(),
                    },
                );
            }
        }
    }

    pub fn leave(&self, client_id: &PeerId, room_id: &RoomId) {
        let remaining = {
            let Some(mut members) = self.inner.rooms.get_mut(room_id) else {
                debug!("Client {} left unknown room {}", client_id, room_id);
                return;
            };
            let before = members.len();
            members.retain(|member| member != client_id);
            if members.len() == before {
                return;
            }
            members.clone()
        };

        info!("Client {} left room {}", client_id, room_id);

        if remaining.is_empty() {
            self.inner
                .rooms
                .remove_if(room_id, |_, members| members.is_empty());
            info!("Room {} is empty, removed", room_id);
            return;
        }

        for member in &remaining {
            self.send(
                member,
                &SignalMessage::UserLeft {
                    user_id: client_id.clone(),
                },
            );
        }
    }

    /// Drops a closed connection and leaves every room it was in.
    pub fn disconnect(&self, client_id: &PeerId) {
        self.inner.clients.remove(client_id);

        let joined: Vec<RoomId> = self
            .inner
            .rooms
            .iter()
            .filter(|entry| entry.value().contains(client_id))
            .map(|entry| entry.key().clone())
            .collect();

        for room_id in &joined {
            self.leave(client_id, room_id);
        }
    }

    pub fn room_members(&self, room_id: &RoomId) -> Vec<PeerId> {
        self.inner
            .rooms
            .get(room_id)
            .map(|members| members.value().clone())
            .unwrap_or_default()
    }

    pub fn room_count(&self) -> usize {
        self.inner.rooms.len()
    }

    pub fn client_count(&self) -> usize {
        self.inner.clients.len()
    }

    fn forward(&self, from: &PeerId, msg: &SignalMessage, raw: &str) {
        let Some(to) = msg.recipient().filter(|to| !to.is_empty()) else {
            warn!("Dropping {} from {}: no recipient", msg.kind(), from);
            return;
        };
        let Some(room_id) = msg.room_id() else {
            warn!("Dropping {} from {}: no room", msg.kind(), from);
            return;
        };

        let in_room = self
            .inner
            .rooms
            .get(room_id)
            .is_some_and(|members| members.contains(to));
        if !in_room {
            warn!(
                "Dropping {} from {}: {} is not in room {}",
                msg.kind(),
                from,
                to,
                room_id
            );
            return;
        }

        let mut value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to re-read {} from {}: {}", msg.kind(), from, e);
                return;
            }
        };
        if let Some(fields) = value.as_object_mut() {
            fields.insert("from".to_owned(), Value::String(from.to_string()));
        }

        if self.send_raw(to, value.to_string()) {
            debug!("Relayed {} {} -> {}", msg.kind(), from, to);
        } else {
            warn!("Dropping {} from {}: {} is not connected", msg.kind(), from, to);
        }
    }

    fn send(&self, to: &PeerId, msg: &SignalMessage) {
        match msg.encode() {
            Ok(json) => {
                if !self.send_raw(to, json) {
                    debug!("Client {} is gone, {} not delivered", to, msg.kind());
                }
            }
            Err(e) => error!("Failed to serialize {}: {}", msg.kind(), e),
        }
    }

    fn send_raw(&self, to: &PeerId, json: String) -> bool {
        self.inner
            .clients
            .get(to)
            .is_some_and(|tx| tx.send(Message::Text(json.into())).is_ok())
    }
}
