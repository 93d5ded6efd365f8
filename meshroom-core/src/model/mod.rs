mod chat;
mod peer;
mod room;
mod signaling;

pub use chat::ChatPayload;
pub use peer::PeerId;
pub use room::RoomId;
pub use signaling::{IceCandidate, IceServerConfig, SdpKind, SessionDescription, SignalMessage};
