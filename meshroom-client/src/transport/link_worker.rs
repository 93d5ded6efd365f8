use crate::error::NegotiationError;
use crate::transport::{PeerConnector, PeerLink, SessionTag, TransportEvent};
use bytes::Bytes;
use meshroom_core::{IceCandidate, SdpKind, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// One operation on a peer link. Operations for a session run strictly in
/// the order they were submitted.
#[derive(Debug)]
pub enum LinkOp {
    CreateOffer,
    CreateAnswer,
    ApplyRemote(SessionDescription),
    AddCandidate(IceCandidate),
    Rollback,
    Send(Bytes),
    Close,
}

/// Which suspended step a [`StepOutcome`] completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Connect,
    CreateOffer,
    CreateAnswer,
    ApplyRemoteOffer,
    ApplyRemoteAnswer,
    AddCandidate,
    Rollback,
}

impl LinkOp {
    fn step_kind(&self) -> Option<StepKind> {
        match self {
            LinkOp::CreateOffer => Some(StepKind::CreateOffer),
            LinkOp::CreateAnswer => Some(StepKind::CreateAnswer),
            LinkOp::ApplyRemote(desc) if desc.kind == SdpKind::Offer => {
                Some(StepKind::ApplyRemoteOffer)
            }
            LinkOp::ApplyRemote(_) => Some(StepKind::ApplyRemoteAnswer),
            LinkOp::AddCandidate(_) => Some(StepKind::AddCandidate),
            LinkOp::Rollback => Some(StepKind::Rollback),
            LinkOp::Send(_) | LinkOp::Close => None,
        }
    }

    /// Whether the orchestrator gets a [`StepOutcome`] back for this op.
    pub fn reports_outcome(&self) -> bool {
        self.step_kind().is_some()
    }
}

/// Result of a suspended negotiation step, delivered back to the
/// orchestrator's loop. The orchestrator must check the tag is still live
/// before applying it.
#[derive(Debug)]
pub struct StepOutcome {
    pub tag: SessionTag,
    pub kind: StepKind,
    pub result: Result<Option<SessionDescription>, NegotiationError>,
}

/// Submission side of a session's link worker.
#[derive(Debug, Clone)]
pub struct LinkHandle {
    tag: SessionTag,
    ops: mpsc::UnboundedSender<LinkOp>,
}

impl LinkHandle {
    pub fn new(tag: SessionTag, ops: mpsc::UnboundedSender<LinkOp>) -> Self {
        Self { tag, ops }
    }

    pub fn tag(&self) -> &SessionTag {
        &self.tag
    }

    pub fn submit(&self, op: LinkOp) -> bool {
        self.ops.send(op).is_ok()
    }

    /// Ops already queued still run; the link is closed after them.
    pub fn close(&self) {
        let _ = self.ops.send(LinkOp::Close);
    }
}

/// Spawns the task that owns one peer link and executes its ops in order.
pub fn spawn_link_worker(
    tag: SessionTag,
    connector: Arc<dyn PeerConnector>,
    events: mpsc::Sender<TransportEvent>,
    outcomes: mpsc::UnboundedSender<StepOutcome>,
) -> LinkHandle {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = LinkHandle::new(tag.clone(), tx);

    tokio::spawn(async move {
        let link = match connector.connect(tag.clone(), events).await {
            Ok(link) => Some(link),
            Err(e) => {
                error!("Failed to create peer connection for {}: {}", tag, e);
                let _ = outcomes.send(StepOutcome {
                    tag: tag.clone(),
                    kind: StepKind::Connect,
                    result: Err(e),
                });
                None
            }
        };

        while let Some(op) = rx.recv().await {
            if matches!(op, LinkOp::Close) {
                break;
            }

            let kind = op.step_kind();
            let result = match &link {
                Some(link) => run_op(link.as_ref(), op).await,
                None => Err(NegotiationError::NegotiationRejected(
                    "peer connection unavailable".to_owned(),
                )),
            };

            match kind {
                Some(kind) => {
                    let outcome = StepOutcome {
                        tag: tag.clone(),
                        kind,
                        result,
                    };
                    if outcomes.send(outcome).is_err() {
                        break;
                    }
                }
                None => {
                    if let Err(e) = result {
                        warn!("Data channel send to {} failed: {}", tag, e);
                    }
                }
            }
        }

        if let Some(link) = link {
            if let Err(e) = link.close().await {
                warn!("Failed to close peer connection for {}: {}", tag, e);
            }
        }
        debug!("Link worker for {} finished", tag);
    });

    handle
}

async fn run_op(
    link: &dyn PeerLink,
    op: LinkOp,
) -> Result<Option<SessionDescription>, NegotiationError> {
    match op {
        LinkOp::CreateOffer => link.create_offer().await.map(Some),
        LinkOp::CreateAnswer => link.create_answer().await.map(Some),
        LinkOp::ApplyRemote(desc) => link.set_remote_description(desc).await.map(|_| None),
        LinkOp::AddCandidate(candidate) => link.add_ice_candidate(candidate).await.map(|_| None),
        LinkOp::Rollback => link.rollback().await.map(|_| None),
        LinkOp::Send(data) => link.send(data).await.map(|_| None),
        LinkOp::Close => link.close().await.map(|_| None),
    }
}
