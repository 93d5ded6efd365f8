use crate::error::NegotiationError;
use crate::room::{MeshCommand, MeshEvent, MessageBus, RoomSnapshot};
use crate::session::{NegotiationStep, PeerSession, SessionRegistry};
use crate::signaling::{SignalingEvent, SignalingOutput};
use crate::transport::{
    LinkHandle, LinkOp, PeerConnector, SessionTag, StepKind, StepOutcome, TransportEvent,
    spawn_link_worker,
};
use meshroom_core::{
    IceCandidate, PeerId, ProtocolError, RoomId, SdpKind, SessionDescription, SignalMessage,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Spawns a link worker for each new session, wired to the orchestrator's
/// event and outcome channels.
struct LinkFactory {
    connector: Arc<dyn PeerConnector>,
    events: mpsc::Sender<TransportEvent>,
    outcomes: mpsc::UnboundedSender<StepOutcome>,
}

impl LinkFactory {
    fn spawn(&self, tag: SessionTag) -> LinkHandle {
        spawn_link_worker(
            tag,
            self.connector.clone(),
            self.events.clone(),
            self.outcomes.clone(),
        )
    }
}

/// Drives every peer session of one room from relay messages, link step
/// outcomes and transport events.
///
/// All state lives here and is touched by one task only. Link operations
/// (offer/answer creation, applying descriptions and candidates) run on
/// per-session workers; their results come back as [`StepOutcome`]s and are
/// applied only if the session that asked for them is still the live one.
pub struct NegotiationOrchestrator {
    room_id: RoomId,
    local_id: Option<PeerId>,
    registry: SessionRegistry,
    signaling: Arc<dyn SignalingOutput>,
    bus: MessageBus,
    links: LinkFactory,
    transport_rx: mpsc::Receiver<TransportEvent>,
    step_rx: mpsc::UnboundedReceiver<StepOutcome>,
    in_flight: usize,
    relay_open: bool,
    relay_closed: bool,
}

impl NegotiationOrchestrator {
    pub fn new(
        room_id: RoomId,
        username: impl Into<String>,
        connector: Arc<dyn PeerConnector>,
        signaling: Arc<dyn SignalingOutput>,
    ) -> (Self, mpsc::UnboundedReceiver<MeshEvent>) {
        let (transport_tx, transport_rx) = mpsc::channel(256);
        let (step_tx, step_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let orchestrator = Self {
            room_id,
            local_id: None,
            registry: SessionRegistry::new(),
            signaling,
            bus: MessageBus::new(username, event_tx),
            links: LinkFactory {
                connector,
                events: transport_tx,
                outcomes: step_tx,
            },
            transport_rx,
            step_rx,
            in_flight: 0,
            relay_open: false,
            relay_closed: false,
        };
        (orchestrator, event_rx)
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn local_id(&self) -> Option<&PeerId> {
        self.local_id.as_ref()
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    pub fn connected_count(&self) -> usize {
        self.registry.all().filter(|s| s.is_open()).count()
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            local_id: self.local_id.clone(),
            room_id: self.room_id.clone(),
            members: self.registry.ids(),
            connected: self.connected_count(),
            relay_open: self.relay_open,
        }
    }

    pub async fn run(
        mut self,
        mut signaling_rx: mpsc::Receiver<SignalingEvent>,
        mut command_rx: mpsc::Receiver<MeshCommand>,
    ) {
        info!("Mesh event loop started for room {}", self.room_id);
        let mut signaling_live = true;

        loop {
            tokio::select! {
                evt = signaling_rx.recv(), if signaling_live => {
                    match evt {
                        Some(SignalingEvent::Opened) => self.on_transport_open().await,
                        Some(SignalingEvent::Message(raw)) => {
                            if let Err(e) = self.on_message(&raw) {
                                log_dropped(&e);
                            }
                        }
                        Some(SignalingEvent::Closed) | None => {
                            signaling_live = false;
                            self.on_transport_closed();
                        }
                    }
                }

                cmd = command_rx.recv() => {
                    match cmd {
                        Some(MeshCommand::Send(text)) => {
                            self.bus.send_chat(&self.registry, &text);
                        }
                        Some(MeshCommand::Snapshot(reply)) => {
                            let _ = reply.send(self.snapshot());
                        }
                        Some(MeshCommand::Leave) | None => {
                            self.shutdown().await;
                            break;
                        }
                    }
                }

                Some(evt) = self.transport_rx.recv() => {
                    self.handle_transport_event(evt).await;
                }

                Some(outcome) = self.step_rx.recv() => {
                    self.handle_step(outcome).await;
                }
            }
        }

        info!("Mesh event loop finished for room {}", self.room_id);
    }

    /// Relay connection is up: join the room.
    pub async fn on_transport_open(&mut self) {
        self.relay_open = true;
        self.relay_closed = false;
        info!("Joining room {}", self.room_id);
        self.send_signal(SignalMessage::Join {
            room_id: self.room_id.clone(),
        })
        .await;
    }

    pub fn on_transport_closed(&mut self) {
        self.relay_open = false;
        if self.relay_closed {
            return;
        }
        self.relay_closed = true;
        let err = NegotiationError::TransportClosed;
        warn!(
            "{}: no new peers can be reached, keeping {} sessions",
            err,
            self.registry.len()
        );
        self.bus.emit(MeshEvent::RelayClosed);
    }

    /// Parses one relay frame and applies it. An `Err` means the frame was
    /// dropped; the orchestrator itself is unaffected.
    pub fn on_message(&mut self, raw: &str) -> Result<(), NegotiationError> {
        match SignalMessage::decode(raw)? {
            Some(msg) => self.dispatch(msg),
            None => {
                debug!("Ignoring relay message of unknown type");
                Ok(())
            }
        }
    }

    pub fn dispatch(&mut self, msg: SignalMessage) -> Result<(), NegotiationError> {
        match msg {
            SignalMessage::ClientId { client_id } => {
                info!("Relay assigned id {}", client_id);
                self.local_id = Some(client_id.clone());
                self.bus.emit(MeshEvent::Identity(client_id));
                Ok(())
            }
            SignalMessage::UserJoined { user_id } => self.on_peer_joined(user_id),
            SignalMessage::UserLeft { user_id } => {
                self.on_peer_left(&user_id);
                Ok(())
            }
            SignalMessage::Offer { .. }
            | SignalMessage::Answer { .. }
            | SignalMessage::Candidate { .. } => {
                let from = msg.require_sender()?.clone();
                if self.local_id.as_ref() == Some(&from) {
                    debug!("Ignoring {} echoed back from ourselves", msg.kind());
                    return Ok(());
                }
                match msg {
                    SignalMessage::Offer { offer, .. } => self.on_offer(from, offer),
                    SignalMessage::Answer { answer, .. } => self.on_answer(&from, answer),
                    SignalMessage::Candidate { candidate, .. } => {
                        self.on_candidate(&from, candidate)
                    }
                    _ => Ok(()),
                }
            }
            SignalMessage::Join { .. } | SignalMessage::Leave { .. } | SignalMessage::Unknown => {
                debug!("Ignoring {} from relay", msg.kind());
                Ok(())
            }
        }
    }

    fn on_peer_joined(&mut self, peer_id: PeerId) -> Result<(), NegotiationError> {
        if self.local_id.as_ref() == Some(&peer_id) {
            debug!("Ignoring our own join notification");
            return Ok(());
        }
        if self.registry.contains(&peer_id) {
            debug!("Peer {} already known, ignoring join", peer_id);
            return Ok(());
        }

        let (session, _) = self.registry.ensure(&peer_id, |tag| self.links.spawn(tag));
        self.bus.emit(MeshEvent::PeerJoined(peer_id.clone()));
        session.begin_offer()?;
        submit(&mut self.in_flight, session, LinkOp::CreateOffer);
        info!("Peer {} joined, sending offer", peer_id);
        Ok(())
    }

    fn on_peer_left(&mut self, peer_id: &PeerId) {
        if self.registry.contains(peer_id) {
            info!("Peer {} left the room", peer_id);
            self.teardown(peer_id);
        } else {
            debug!("Peer {} left before we knew it", peer_id);
        }
    }

    fn on_offer(&mut self, from: PeerId, offer: SessionDescription) -> Result<(), NegotiationError> {
        expect_kind(&offer, SdpKind::Offer)?;

        let keep_local_offer = wins_glare(self.local_id.as_ref(), &from);
        let (session, created) = self.registry.ensure(&from, |tag| self.links.spawn(tag));
        if created {
            self.bus.emit(MeshEvent::PeerJoined(from.clone()));
        }

        if session.is_offering() {
            if keep_local_offer {
                info!("Offer collision with {}: keeping our offer", from);
                return Ok(());
            }
            info!("Offer collision with {}: rolling back and answering", from);
            session.yield_to_remote_offer()?;
            submit(&mut self.in_flight, session, LinkOp::Rollback);
        } else {
            session.begin_accept_offer()?;
            info!("Received offer from {}", from);
        }

        submit(&mut self.in_flight, session, LinkOp::ApplyRemote(offer));
        Ok(())
    }

    fn on_answer(&mut self, from: &PeerId, answer: SessionDescription) -> Result<(), NegotiationError> {
        expect_kind(&answer, SdpKind::Answer)?;

        let Some(session) = self.registry.get_mut(from) else {
            return Err(NegotiationError::UnknownPeerReference(from.clone()));
        };
        session.begin_accept_answer()?;
        submit(&mut self.in_flight, session, LinkOp::ApplyRemote(answer));
        info!("Received answer from {}", from);
        Ok(())
    }

    fn on_candidate(&mut self, from: &PeerId, candidate: IceCandidate) -> Result<(), NegotiationError> {
        let Some(session) = self.registry.get_mut(from) else {
            return Err(NegotiationError::UnknownPeerReference(from.clone()));
        };
        match session.accept_candidate(candidate) {
            Some(candidate) => submit(&mut self.in_flight, session, LinkOp::AddCandidate(candidate)),
            None => debug!(
                "Queued candidate from {} ({} pending)",
                from,
                session.pending_candidates().len()
            ),
        }
        Ok(())
    }

    /// Applies the result of a link step. Results for sessions that were
    /// removed or replaced in the meantime are discarded.
    pub async fn handle_step(&mut self, outcome: StepOutcome) {
        let StepOutcome { tag, kind, result } = outcome;
        if kind != StepKind::Connect {
            self.in_flight = self.in_flight.saturating_sub(1);
        }

        let Some(session) = self.registry.get_live(&tag) else {
            debug!("Discarding {:?} result for closed session {}", kind, tag);
            return;
        };

        let desc = match result {
            Ok(desc) => desc,
            Err(e) => {
                log_dropped(&e);
                if let Some(step) = negotiation_step(kind) {
                    session.step_failed(step);
                }
                if kind == StepKind::Connect {
                    self.teardown(&tag.peer_id);
                }
                return;
            }
        };

        let reply = match (kind, desc) {
            (StepKind::CreateOffer, Some(offer)) => match session.offer_created() {
                Ok(()) => Some(SignalMessage::offer(
                    tag.peer_id.clone(),
                    self.room_id.clone(),
                    offer,
                )),
                Err(e) => {
                    // a remote offer won the collision while ours was being built
                    log_dropped(&e);
                    None
                }
            },
            (StepKind::CreateAnswer, Some(answer)) => match session.answer_created() {
                Ok(()) => {
                    if session.is_connected() {
                        let _ = session.negotiation_completed();
                    }
                    Some(SignalMessage::answer(
                        tag.peer_id.clone(),
                        self.room_id.clone(),
                        answer,
                    ))
                }
                Err(e) => {
                    log_dropped(&e);
                    None
                }
            },
            (StepKind::ApplyRemoteOffer, _) => {
                match session.remote_offer_applied() {
                    Ok(pending) => {
                        drain_candidates(&mut self.in_flight, session, pending);
                        submit(&mut self.in_flight, session, LinkOp::CreateAnswer);
                    }
                    Err(e) => log_dropped(&e),
                }
                None
            }
            (StepKind::ApplyRemoteAnswer, _) => {
                match session.remote_answer_applied() {
                    Ok(pending) => {
                        info!("Negotiation with {} is stable", tag);
                        drain_candidates(&mut self.in_flight, session, pending);
                    }
                    Err(e) => log_dropped(&e),
                }
                None
            }
            (StepKind::CreateOffer | StepKind::CreateAnswer, None) => {
                error!("Link for {} returned no description for {:?}", tag, kind);
                if let Some(step) = negotiation_step(kind) {
                    session.step_failed(step);
                }
                None
            }
            (StepKind::Connect | StepKind::AddCandidate | StepKind::Rollback, _) => None,
        };

        if let Some(msg) = reply {
            self.send_signal(msg).await;
        }
    }

    pub async fn handle_transport_event(&mut self, event: TransportEvent) {
        let Some(session) = self.registry.get_live(event.tag()) else {
            debug!("Discarding transport event for closed session {}", event.tag());
            return;
        };

        match event {
            TransportEvent::CandidateGenerated(tag, candidate) => {
                let msg = SignalMessage::candidate(tag.peer_id, self.room_id.clone(), candidate);
                self.send_signal(msg).await;
            }
            TransportEvent::Connected(tag) => {
                session.link_connected();
                debug!("Connection to {} established ({:?})", tag, session.state());
            }
            TransportEvent::DataChannelOpen(tag) => {
                session.link_connected();
                session.channel_opened();
                self.bus.emit(MeshEvent::PeerConnected(tag.peer_id.clone()));
                info!(
                    "Channel to {} open, {} peers connected",
                    tag,
                    self.connected_count()
                );
            }
            TransportEvent::DataChannelClosed(tag) => {
                if session.is_open() {
                    session.channel_closed();
                    self.bus.emit(MeshEvent::PeerDisconnected(tag.peer_id.clone()));
                    info!(
                        "Channel to {} closed, {} peers connected",
                        tag,
                        self.connected_count()
                    );
                }
            }
            TransportEvent::Failed(tag) => {
                warn!("Connection to {} failed, dropping session", tag);
                self.teardown(&tag.peer_id);
            }
            TransportEvent::Message(tag, data) => {
                self.bus.on_receive(&tag.peer_id, &data);
            }
        }
    }

    /// Handles queued transport events and step results until no link step
    /// is outstanding. Useful when driving the orchestrator by hand instead
    /// of through [`NegotiationOrchestrator::run`].
    pub async fn settle(&mut self) {
        loop {
            while let Ok(event) = self.transport_rx.try_recv() {
                self.handle_transport_event(event).await;
            }
            if self.in_flight == 0 {
                break;
            }
            match self.step_rx.recv().await {
                Some(outcome) => self.handle_step(outcome).await,
                None => break,
            }
        }
    }

    /// Leaves the room and closes every session.
    pub async fn shutdown(&mut self) {
        if self.relay_open {
            self.send_signal(SignalMessage::Leave {
                room_id: self.room_id.clone(),
            })
            .await;
        }
        let closed = self.registry.drain();
        info!("Left room {}, closed {} sessions", self.room_id, closed.len());
    }

    fn teardown(&mut self, peer_id: &PeerId) {
        let was_open = self.registry.get(peer_id).is_some_and(|s| s.is_open());
        if self.registry.remove(peer_id).is_none() {
            return;
        }
        if was_open {
            self.bus.emit(MeshEvent::PeerDisconnected(peer_id.clone()));
        }
        self.bus.emit(MeshEvent::PeerLeft(peer_id.clone()));
    }

    async fn send_signal(&self, msg: SignalMessage) {
        let kind = msg.kind();
        if let Err(e) = self.signaling.send_signal(msg).await {
            warn!("Failed to send {} to relay: {}", kind, e);
        }
    }
}

fn submit(in_flight: &mut usize, session: &PeerSession, op: LinkOp) {
    let reports = op.reports_outcome();
    if session.link().submit(op) {
        if reports {
            *in_flight += 1;
        }
    } else {
        warn!("Link worker for {} is gone", session.tag());
    }
}

fn drain_candidates(in_flight: &mut usize, session: &PeerSession, pending: Vec<IceCandidate>) {
    if !pending.is_empty() {
        debug!("Applying {} queued candidates for {}", pending.len(), session.tag());
    }
    for candidate in pending {
        submit(in_flight, session, LinkOp::AddCandidate(candidate));
    }
}

/// Which side keeps its offer when both sent one: the higher id. Without a
/// local id we cannot compare, so we yield.
fn wins_glare(local: Option<&PeerId>, remote: &PeerId) -> bool {
    local.is_some_and(|local| local > remote)
}

fn expect_kind(desc: &SessionDescription, expected: SdpKind) -> Result<(), ProtocolError> {
    if desc.kind == expected {
        Ok(())
    } else {
        Err(ProtocolError::UnexpectedSdpKind {
            expected: expected.as_str(),
            actual: desc.kind.as_str(),
        })
    }
}

fn negotiation_step(kind: StepKind) -> Option<NegotiationStep> {
    match kind {
        StepKind::CreateOffer => Some(NegotiationStep::CreatingOffer),
        StepKind::CreateAnswer => Some(NegotiationStep::CreatingAnswer),
        StepKind::ApplyRemoteOffer => Some(NegotiationStep::ApplyingOffer),
        StepKind::ApplyRemoteAnswer => Some(NegotiationStep::ApplyingAnswer),
        StepKind::Connect | StepKind::AddCandidate | StepKind::Rollback => None,
    }
}

fn log_dropped(err: &NegotiationError) {
    match err {
        NegotiationError::MalformedMessage(_) | NegotiationError::UnknownPeerReference(_) => {
            warn!("Dropped signaling message: {}", err)
        }
        NegotiationError::StaleTransition { .. } => debug!("Ignored stale transition: {}", err),
        NegotiationError::NegotiationRejected(_) => error!("{}", err),
        NegotiationError::TransportClosed => warn!("{}", err),
    }
}
