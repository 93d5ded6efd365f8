pub mod room;
pub mod session;
pub mod signaling;
pub mod transport;

mod client;
mod config;
mod error;

pub use client::{MeshClient, connect};
pub use config::{ClientConfig, random_username};
pub use error::{MeshStopped, NegotiationError, TransportError};
pub use room::{
    ChatRecord, MeshCommand, MeshEvent, MeshHandle, MessageBus, NegotiationOrchestrator,
    RoomSnapshot,
};
pub use session::{
    ChannelState, NegotiationState, NegotiationStep, PeerSession, Role, SessionRegistry,
};
pub use signaling::{SignalingEvent, SignalingOutput, WsSignaling};
pub use transport::{
    LinkHandle, LinkOp, PeerConnector, PeerLink, SessionTag, StepKind, StepOutcome,
    TransportConfig, TransportEvent, WebRtcConnector,
};
