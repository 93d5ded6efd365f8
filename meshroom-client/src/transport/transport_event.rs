use crate::transport::SessionTag;
use bytes::Bytes;
use meshroom_core::IceCandidate;

/// Events a peer link raises for the orchestrator's loop. Every event carries
/// the tag of the session that owns the link, so events from a torn-down
/// session are recognisable and dropped.
#[derive(Debug)]
pub enum TransportEvent {
    /// A local ICE candidate to be sent to the remote peer through the relay.
    CandidateGenerated(SessionTag, IceCandidate),

    /// The underlying connection finished negotiating.
    Connected(SessionTag),

    /// The underlying connection failed or was closed from below.
    Failed(SessionTag),

    DataChannelOpen(SessionTag),

    DataChannelClosed(SessionTag),

    /// A frame received on the peer's data channel.
    Message(SessionTag, Bytes),
}

impl TransportEvent {
    pub fn tag(&self) -> &SessionTag {
        match self {
            TransportEvent::CandidateGenerated(tag, _)
            | TransportEvent::Connected(tag)
            | TransportEvent::Failed(tag)
            | TransportEvent::DataChannelOpen(tag)
            | TransportEvent::DataChannelClosed(tag)
            | TransportEvent::Message(tag, _) => tag,
        }
    }
}
