use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::room::{MeshEvent, MeshHandle, NegotiationOrchestrator};
use crate::signaling::WsSignaling;
use crate::transport::WebRtcConnector;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

/// A running client: the handle to drive it, the stream of what happens, and
/// the orchestrator task.
pub struct MeshClient {
    pub handle: MeshHandle,
    pub events: mpsc::UnboundedReceiver<MeshEvent>,
    pub task: JoinHandle<()>,
}

/// Connects to the relay, joins `config.room_id` and starts negotiating with
/// whoever else is there.
pub async fn connect(config: ClientConfig) -> Result<MeshClient, TransportError> {
    let (signaling, signaling_rx) =
        WsSignaling::connect(&config.relay_url, config.channel_capacity).await?;
    let connector = WebRtcConnector::new(config.transport.clone());

    let (orchestrator, events) = NegotiationOrchestrator::new(
        config.room_id.clone(),
        config.username.clone(),
        Arc::new(connector),
        Arc::new(signaling),
    );

    let (command_tx, command_rx) = mpsc::channel(config.channel_capacity.max(1));
    let task = tokio::spawn(orchestrator.run(signaling_rx, command_rx));
    info!(
        "Client '{}' started for room {}",
        config.username, config.room_id
    );

    Ok(MeshClient {
        handle: MeshHandle::new(command_tx),
        events,
        task,
    })
}
