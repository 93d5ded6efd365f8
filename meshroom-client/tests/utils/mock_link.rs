use async_trait::async_trait;
use bytes::Bytes;
use meshroom_client::{NegotiationError, PeerConnector, PeerLink, SessionTag, TransportEvent};
use meshroom_core::{IceCandidate, PeerId, SdpKind, SessionDescription};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// A call made on a [`MockLink`], recorded in order.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkCall {
    CreateOffer,
    CreateAnswer,
    SetRemote(SdpKind),
    AddCandidate(String),
    Rollback,
    Send(Bytes),
    Close,
}

#[derive(Default)]
struct LinkState {
    calls: Vec<LinkCall>,
    local: Option<SdpKind>,
    remote: Option<SdpKind>,
    opened: bool,
    local_channel: bool,
    generation: u32,
}

/// Shared state of one mock peer link. Tests keep a reference to inspect
/// calls and inject transport events.
pub struct MockLinkProbe {
    pub tag: SessionTag,
    events: mpsc::Sender<TransportEvent>,
    state: Mutex<LinkState>,
    reject_remote: bool,
    defer_connection: bool,
}

impl MockLinkProbe {
    pub fn calls(&self) -> Vec<LinkCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Candidates applied to the link, in order.
    pub fn applied_candidates(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                LinkCall::AddCandidate(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn sent_frames(&self) -> Vec<Bytes> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                LinkCall::Send(data) => Some(data),
                _ => None,
            })
            .collect()
    }

    /// Whether the link holds a chat channel it opened itself.
    pub fn has_local_channel(&self) -> bool {
        self.state.lock().unwrap().local_channel
    }

    /// How many times the underlying connection was replaced.
    pub fn generation(&self) -> u32 {
        self.state.lock().unwrap().generation
    }

    pub fn is_closed(&self) -> bool {
        self.calls().contains(&LinkCall::Close)
    }

    /// Raises a transport event as if the real connection had produced it.
    pub async fn emit(&self, event: TransportEvent) {
        let _ = self.events.send(event).await;
    }

    pub async fn receive(&self, data: &'static [u8]) {
        self.emit(TransportEvent::Message(self.tag.clone(), Bytes::from_static(data)))
            .await;
    }

    fn record(&self, call: LinkCall) {
        self.state.lock().unwrap().calls.push(call);
    }

    /// Once both descriptions are set the fake connection "connects" and
    /// the data channel opens, once.
    async fn maybe_open(&self) {
        if self.defer_connection {
            return;
        }
        let open = {
            let mut state = self.state.lock().unwrap();
            let ready = state.local.is_some() && state.remote.is_some() && !state.opened;
            if ready {
                state.opened = true;
            }
            ready
        };
        if open {
            self.emit(TransportEvent::Connected(self.tag.clone())).await;
            self.emit(TransportEvent::DataChannelOpen(self.tag.clone()))
                .await;
        }
    }
}

pub struct MockLink(Arc<MockLinkProbe>);

fn rejected(reason: &str) -> NegotiationError {
    NegotiationError::NegotiationRejected(reason.to_owned())
}

#[async_trait]
impl PeerLink for MockLink {
    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError> {
        self.0.record(LinkCall::CreateOffer);
        {
            let mut state = self.0.state.lock().unwrap();
            state.local = Some(SdpKind::Offer);
            state.local_channel = true;
        }
        self.0.maybe_open().await;
        Ok(SessionDescription::offer(format!("offer-for-{}", self.0.tag)))
    }

    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError> {
        self.0.record(LinkCall::CreateAnswer);
        {
            let mut state = self.0.state.lock().unwrap();
            if state.remote != Some(SdpKind::Offer) {
                return Err(rejected("no remote offer to answer"));
            }
            state.local = Some(SdpKind::Answer);
        }
        self.0.maybe_open().await;
        Ok(SessionDescription::answer(format!("answer-for-{}", self.0.tag)))
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), NegotiationError> {
        self.0.record(LinkCall::SetRemote(desc.kind));
        if self.0.reject_remote {
            return Err(rejected("remote description refused"));
        }
        {
            let mut state = self.0.state.lock().unwrap();
            if desc.kind == SdpKind::Offer && state.local == Some(SdpKind::Offer) {
                return Err(rejected("remote offer while a local offer is pending"));
            }
            if desc.kind == SdpKind::Answer && state.local != Some(SdpKind::Offer) {
                return Err(rejected("answer without a local offer"));
            }
            state.remote = Some(desc.kind);
        }
        self.0.maybe_open().await;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), NegotiationError> {
        if self.0.state.lock().unwrap().remote.is_none() {
            return Err(rejected("candidate before remote description"));
        }
        self.0.record(LinkCall::AddCandidate(candidate.candidate));
        Ok(())
    }

    /// Behaves like the webrtc link: the connection is replaced, so both
    /// descriptions and the locally opened channel are gone.
    async fn rollback(&self) -> Result<(), NegotiationError> {
        self.0.record(LinkCall::Rollback);
        let mut state = self.0.state.lock().unwrap();
        state.local = None;
        state.remote = None;
        state.opened = false;
        state.local_channel = false;
        state.generation += 1;
        Ok(())
    }

    async fn send(&self, data: Bytes) -> Result<(), NegotiationError> {
        self.0.record(LinkCall::Send(data));
        Ok(())
    }

    async fn close(&self) -> Result<(), NegotiationError> {
        self.0.record(LinkCall::Close);
        Ok(())
    }
}

/// Scriptable [`PeerConnector`] handing out [`MockLink`]s.
#[derive(Clone, Default)]
pub struct MockConnector {
    links: Arc<Mutex<Vec<Arc<MockLinkProbe>>>>,
    reject_remote: Arc<AtomicBool>,
    fail_connect: Arc<AtomicBool>,
    defer_connection: Arc<AtomicBool>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Links created from now on refuse every remote description.
    pub fn reject_remote_descriptions(&self) {
        self.reject_remote.store(true, Ordering::SeqCst);
    }

    /// Connection attempts from now on fail.
    pub fn fail_connections(&self) {
        self.fail_connect.store(true, Ordering::SeqCst);
    }

    /// Links created from now on never connect by themselves; the test
    /// raises `Connected`/`DataChannelOpen` through the probe.
    pub fn defer_connections(&self) {
        self.defer_connection.store(true, Ordering::SeqCst);
    }

    /// The most recent link created for `peer_id`.
    pub fn link_for(&self, peer_id: &PeerId) -> Option<Arc<MockLinkProbe>> {
        self.links
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|link| &link.tag.peer_id == peer_id)
            .cloned()
    }

    pub fn link_count(&self) -> usize {
        self.links.lock().unwrap().len()
    }
}

#[async_trait]
impl PeerConnector for MockConnector {
    async fn connect(
        &self,
        tag: SessionTag,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn PeerLink>, NegotiationError> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(rejected("connection refused"));
        }
        tracing::debug!("[MockConnector] link for {}", tag);
        let probe = Arc::new(MockLinkProbe {
            tag,
            events,
            state: Mutex::new(LinkState::default()),
            reject_remote: self.reject_remote.load(Ordering::SeqCst),
            defer_connection: self.defer_connection.load(Ordering::SeqCst),
        });
        self.links.lock().unwrap().push(probe.clone());
        Ok(Box::new(MockLink(probe)))
    }
}
