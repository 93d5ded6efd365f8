use crate::session::NegotiationState;
use meshroom_core::{PeerId, ProtocolError};
use thiserror::Error;

/// Why an inbound event did not advance a peer session. None of these are
/// fatal: the orchestrator logs them and keeps running.
#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("malformed signaling message: {0}")]
    MalformedMessage(#[from] ProtocolError),

    #[error("no session for peer {0}")]
    UnknownPeerReference(PeerId),

    #[error("peer {peer}: cannot {action} while {state:?}")]
    StaleTransition {
        peer: PeerId,
        action: &'static str,
        state: NegotiationState,
    },

    #[error("peer connection rejected the step: {0}")]
    NegotiationRejected(String),

    #[error("relay connection closed")]
    TransportClosed,
}

impl NegotiationError {
    pub(crate) fn rejected(err: anyhow::Error) -> Self {
        NegotiationError::NegotiationRejected(format!("{err:#}"))
    }

    pub(crate) fn stale(peer: &PeerId, action: &'static str, state: NegotiationState) -> Self {
        NegotiationError::StaleTransition {
            peer: peer.clone(),
            action,
            state,
        }
    }
}

/// Failure of the relay connection itself.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("failed to encode signal: {0}")]
    Encode(#[from] ProtocolError),

    #[error("relay connection closed")]
    Closed,
}

/// The orchestrator loop behind a [`crate::MeshHandle`] has exited.
#[derive(Debug, Error)]
#[error("mesh orchestrator has stopped")]
pub struct MeshStopped;
