use chrono::{DateTime, Utc};
use meshroom_core::PeerId;

/// A chat line as the view layer shows it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRecord {
    pub sender: String,
    pub text: String,
    pub from_me: bool,
    /// Session the frame arrived on; `None` for the local echo.
    pub peer_id: Option<PeerId>,
    pub received_at: DateTime<Utc>,
}

/// Notifications the orchestrator pushes to the view layer, in the order
/// they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshEvent {
    /// The relay assigned this client its id.
    Identity(PeerId),
    PeerJoined(PeerId),
    /// The data channel to this peer is open.
    PeerConnected(PeerId),
    PeerDisconnected(PeerId),
    PeerLeft(PeerId),
    Chat(ChatRecord),
    /// The relay connection is gone. Open channels keep working.
    RelayClosed,
}
