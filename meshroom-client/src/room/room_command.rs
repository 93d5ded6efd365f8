use meshroom_core::{PeerId, RoomId};
use tokio::sync::oneshot;

/// Requests from the view layer to the orchestrator's loop.
#[derive(Debug)]
pub enum MeshCommand {
    /// Chat text typed by the user, to be echoed locally and broadcast.
    Send(String),

    Snapshot(oneshot::Sender<RoomSnapshot>),

    /// Leave the room, close every session and stop the loop.
    Leave,
}

/// Point-in-time view of the mesh for display.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSnapshot {
    pub local_id: Option<PeerId>,
    pub room_id: RoomId,
    /// Known peers in the order they were first seen.
    pub members: Vec<PeerId>,
    /// Peers whose data channel is open.
    pub connected: usize,
    pub relay_open: bool,
}
