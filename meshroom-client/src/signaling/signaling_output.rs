use crate::error::TransportError;
use async_trait::async_trait;
use meshroom_core::SignalMessage;

/// Outbound half of the relay connection. The orchestrator writes every
/// message it produces through this trait, already tagged with room and
/// destination.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    async fn send_signal(&self, msg: SignalMessage) -> Result<(), TransportError>;
}
