use crate::ProtocolError;
use serde::{Deserialize, Serialize};

/// Frame carried on a peer's data channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub message: String,
    pub username: String,
}

impl ChatPayload {
    pub fn new(message: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            username: username.into(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
