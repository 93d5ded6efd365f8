use crate::error::MeshStopped;
use crate::room::{MeshCommand, RoomSnapshot};
use tokio::sync::{mpsc, oneshot};

/// Cloneable entry point the view layer uses to talk to a running orchestrator.
#[derive(Debug, Clone)]
pub struct MeshHandle {
    commands: mpsc::Sender<MeshCommand>,
}

impl MeshHandle {
    pub fn new(commands: mpsc::Sender<MeshCommand>) -> Self {
        Self { commands }
    }

    pub async fn send(&self, text: impl Into<String>) -> Result<(), MeshStopped> {
        self.commands
            .send(MeshCommand::Send(text.into()))
            .await
            .map_err(|_| MeshStopped)
    }

    pub async fn snapshot(&self) -> Result<RoomSnapshot, MeshStopped> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(MeshCommand::Snapshot(tx))
            .await
            .map_err(|_| MeshStopped)?;
        rx.await.map_err(|_| MeshStopped)
    }

    pub async fn leave(&self) -> Result<(), MeshStopped> {
        self.commands
            .send(MeshCommand::Leave)
            .await
            .map_err(|_| MeshStopped)
    }
}
