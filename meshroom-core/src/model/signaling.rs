use crate::ProtocolError;
use crate::model::peer::PeerId;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

impl SdpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SdpKind::Offer => "offer",
            SdpKind::Answer => "answer",
            SdpKind::Pranswer => "pranswer",
            SdpKind::Rollback => "rollback",
        }
    }
}

/// `{"type": "offer" | "answer", "sdp": "..."}`, the same shape browsers emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(
        default,
        rename = "sdpMLineIndex",
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
            username_fragment: None,
        }
    }
}

/// Messages exchanged with the relay. Unknown fields are ignored and an
/// unknown `type` decodes to [`SignalMessage::Unknown`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SignalMessage {
    Join {
        room_id: RoomId,
    },
    Leave {
        room_id: RoomId,
    },
    ClientId {
        client_id: PeerId,
    },
    UserJoined {
        user_id: PeerId,
    },
    UserLeft {
        user_id: PeerId,
    },
    Offer {
        offer: SessionDescription,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<PeerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<PeerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<RoomId>,
    },
    Answer {
        answer: SessionDescription,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<PeerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<PeerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<RoomId>,
    },
    Candidate {
        candidate: IceCandidate,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<PeerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<PeerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<RoomId>,
    },
    #[serde(other)]
    Unknown,
}

impl SignalMessage {
    /// Parses a relay frame. `Ok(None)` means the frame was well formed but
    /// carried a `type` this client does not handle.
    pub fn decode(raw: &str) -> Result<Option<Self>, ProtocolError> {
        match serde_json::from_str::<SignalMessage>(raw)? {
            SignalMessage::Unknown => Ok(None),
            msg => Ok(Some(msg)),
        }
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn offer(to: PeerId, room_id: RoomId, offer: SessionDescription) -> Self {
        SignalMessage::Offer {
            offer,
            to: Some(to),
            from: None,
            room_id: Some(room_id),
        }
    }

    pub fn answer(to: PeerId, room_id: RoomId, answer: SessionDescription) -> Self {
        SignalMessage::Answer {
            answer,
            to: Some(to),
            from: None,
            room_id: Some(room_id),
        }
    }

    pub fn candidate(to: PeerId, room_id: RoomId, candidate: IceCandidate) -> Self {
        SignalMessage::Candidate {
            candidate,
            to: Some(to),
            from: None,
            room_id: Some(room_id),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SignalMessage::Join { .. } => "join",
            SignalMessage::Leave { .. } => "leave",
            SignalMessage::ClientId { .. } => "clientId",
            SignalMessage::UserJoined { .. } => "userJoined",
            SignalMessage::UserLeft { .. } => "userLeft",
            SignalMessage::Offer { .. } => "offer",
            SignalMessage::Answer { .. } => "answer",
            SignalMessage::Candidate { .. } => "candidate",
            SignalMessage::Unknown => "unknown",
        }
    }

    /// Destination of a peer-scoped message.
    pub fn recipient(&self) -> Option<&PeerId> {
        match self {
            SignalMessage::Offer { to, .. }
            | SignalMessage::Answer { to, .. }
            | SignalMessage::Candidate { to, .. } => to.as_ref(),
            _ => None,
        }
    }

    /// Sender of a peer-scoped message, filled in by the relay.
    pub fn sender(&self) -> Option<&PeerId> {
        match self {
            SignalMessage::Offer { from, .. }
            | SignalMessage::Answer { from, .. }
            | SignalMessage::Candidate { from, .. } => from.as_ref(),
            _ => None,
        }
    }

    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            SignalMessage::Join { room_id } | SignalMessage::Leave { room_id } => Some(room_id),
            SignalMessage::Offer { room_id, .. }
            | SignalMessage::Answer { room_id, .. }
            | SignalMessage::Candidate { room_id, .. } => room_id.as_ref(),
            _ => None,
        }
    }

    /// Stamps the sender on a peer-scoped message. Other messages are returned unchanged.
    pub fn with_sender(mut self, sender: PeerId) -> Self {
        match &mut self {
            SignalMessage::Offer { from, .. }
            | SignalMessage::Answer { from, .. }
            | SignalMessage::Candidate { from, .. } => *from = Some(sender),
            _ => {}
        }
        self
    }

    pub fn require_sender(&self) -> Result<&PeerId, ProtocolError> {
        self.sender().ok_or(ProtocolError::MissingField {
            kind: self.kind(),
            field: "from",
        })
    }
}
