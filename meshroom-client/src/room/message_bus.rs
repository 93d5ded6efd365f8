use crate::room::{ChatRecord, MeshEvent};
use crate::session::SessionRegistry;
use crate::transport::LinkOp;
use bytes::Bytes;
use chrono::Utc;
use meshroom_core::{ChatPayload, PeerId};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Fan-out of chat payloads to open data channels, and delivery of received
/// payloads to the view layer.
///
/// The bus owns no peer state. It reads the registry the orchestrator hands
/// it, so it only ever sees what the orchestrator sees.
#[derive(Debug, Clone)]
pub struct MessageBus {
    username: String,
    events: mpsc::UnboundedSender<MeshEvent>,
}

impl MessageBus {
    pub fn new(username: impl Into<String>, events: mpsc::UnboundedSender<MeshEvent>) -> Self {
        Self {
            username: username.into(),
            events,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn emit(&self, event: MeshEvent) {
        if self.events.send(event).is_err() {
            debug!("No view attached, dropping mesh event");
        }
    }

    /// Queues `data` on every session whose channel is open and returns how
    /// many sessions it went to. Peers still connecting do not get a copy.
    pub fn broadcast(&self, registry: &SessionRegistry, data: Bytes) -> usize {
        registry
            .all()
            .filter(|session| session.is_open())
            .filter(|session| session.link().submit(LinkOp::Send(data.clone())))
            .count()
    }

    /// Echoes `text` locally and broadcasts it as a chat payload. Surrounding
    /// whitespace is trimmed and blank input is ignored.
    pub fn send_chat(&self, registry: &SessionRegistry, text: &str) -> usize {
        let text = text.trim();
        if text.is_empty() {
            return 0;
        }

        let data = match ChatPayload::new(text, self.username.as_str()).encode() {
            Ok(data) => Bytes::from(data),
            Err(e) => {
                error!("Failed to encode chat payload: {}", e);
                return 0;
            }
        };

        self.emit(MeshEvent::Chat(ChatRecord {
            sender: self.username.clone(),
            text: text.to_owned(),
            from_me: true,
            peer_id: None,
            received_at: Utc::now(),
        }));

        let sent = self.broadcast(registry, data);
        debug!("Chat message sent to {} peers", sent);
        sent
    }

    pub fn on_receive(&self, peer_id: &PeerId, data: &[u8]) {
        match ChatPayload::decode(data) {
            Ok(payload) => self.emit(MeshEvent::Chat(ChatRecord {
                sender: payload.username,
                text: payload.message,
                from_me: false,
                peer_id: Some(peer_id.clone()),
                received_at: Utc::now(),
            })),
            Err(e) => warn!("Dropping malformed chat frame from {}: {}", peer_id, e),
        }
    }
}
