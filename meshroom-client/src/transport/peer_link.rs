use crate::error::NegotiationError;
use crate::transport::TransportEvent;
use async_trait::async_trait;
use bytes::Bytes;
use meshroom_core::{IceCandidate, PeerId, SessionDescription};
use std::fmt;
use tokio::sync::mpsc;

/// Identity of one incarnation of a peer session. The epoch changes every time
/// a session for the same peer is recreated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionTag {
    pub peer_id: PeerId,
    pub epoch: u64,
}

impl fmt::Display for SessionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.peer_id, self.epoch)
    }
}

/// Creates the negotiation context for one remote participant.
#[async_trait]
pub trait PeerConnector: Send + Sync + 'static {
    async fn connect(
        &self,
        tag: SessionTag,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn PeerLink>, NegotiationError>;
}

/// Offer/answer/ICE primitive plus the reliable data channel bound to it.
///
/// `create_offer` and `create_answer` also install the result as the local
/// description. The offerer side opens the data channel inside
/// `create_offer`; the answerer adopts the one announced by the remote side.
#[async_trait]
pub trait PeerLink: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError>;

    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError>;

    async fn set_remote_description(&self, desc: SessionDescription)
    -> Result<(), NegotiationError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), NegotiationError>;

    /// Discard a local offer that has not been answered, together with the
    /// chat channel opened for it. Afterwards the link holds no local or
    /// remote description and is ready to take the remote offer.
    async fn rollback(&self) -> Result<(), NegotiationError>;

    async fn send(&self, data: Bytes) -> Result<(), NegotiationError>;

    async fn close(&self) -> Result<(), NegotiationError>;
}
