use crate::error::NegotiationError;
use crate::transport::{PeerConnector, PeerLink, SessionTag, TransportConfig, TransportEvent};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use meshroom_core::utils::DATA_CHANNEL_LABEL;
use meshroom_core::{IceCandidate, SdpKind, SessionDescription};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

type DataChannelSlot = Arc<Mutex<Option<Arc<RTCDataChannel>>>>;

/// [`PeerConnector`] backed by webrtc-rs.
#[derive(Clone, Default)]
pub struct WebRtcConnector {
    config: TransportConfig,
}

impl WebRtcConnector {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PeerConnector for WebRtcConnector {
    async fn connect(
        &self,
        tag: SessionTag,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn PeerLink>, NegotiationError> {
        let wrapper = ConnectionWrapper::new(tag, &self.config, events)
            .await
            .map_err(NegotiationError::rejected)?;
        Ok(Box::new(wrapper))
    }
}

pub struct ConnectionWrapper {
    tag: SessionTag,
    config: TransportConfig,
    peer_connection: Mutex<Arc<RTCPeerConnection>>,
    data_channel: DataChannelSlot,
    events: mpsc::Sender<TransportEvent>,
}

impl ConnectionWrapper {
    pub async fn new(
        tag: SessionTag,
        config: &TransportConfig,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Self> {
        let data_channel: DataChannelSlot = Arc::new(Mutex::new(None));
        let peer_connection = build_peer_connection(&tag, config, &events, &data_channel).await?;

        Ok(Self {
            tag,
            config: config.clone(),
            peer_connection: Mutex::new(peer_connection),
            data_channel,
            events,
        })
    }

    async fn pc(&self) -> Arc<RTCPeerConnection> {
        self.peer_connection.lock().await.clone()
    }

    /// Opens the chat channel (first call only), then creates the offer and
    /// installs it locally.
    pub async fn create_offer(&self) -> Result<String> {
        let pc = self.pc().await;
        {
            let mut slot = self.data_channel.lock().await;
            if slot.is_none() {
                let init = RTCDataChannelInit {
                    ordered: Some(true),
                    ..Default::default()
                };
                let dc = pc
                    .create_data_channel(DATA_CHANNEL_LABEL, Some(init))
                    .await
                    .context("Failed to create data channel")?;
                wire_data_channel(&dc, &self.tag, &self.events);
                *slot = Some(dc);
            }
        }

        let offer = pc.create_offer(None).await?;
        pc.set_local_description(offer.clone()).await?;
        Ok(offer.sdp)
    }

    pub async fn create_answer(&self) -> Result<String> {
        let pc = self.pc().await;
        let answer = pc.create_answer(None).await?;
        pc.set_local_description(answer.clone()).await?;
        Ok(answer.sdp)
    }

    pub async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        let desc = match desc.kind {
            SdpKind::Offer => RTCSessionDescription::offer(desc.sdp)?,
            SdpKind::Answer => RTCSessionDescription::answer(desc.sdp)?,
            SdpKind::Pranswer => RTCSessionDescription::pranswer(desc.sdp)?,
            SdpKind::Rollback => anyhow::bail!("rollback is not a remote description"),
        };
        self.pc().await.set_remote_description(desc).await?;
        Ok(())
    }

    pub async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.pc()
            .await
            .add_ice_candidate(init)
            .await
            .context("Failed to add ICE candidate")?;
        Ok(())
    }

    /// Throws away an unanswered local offer. webrtc-rs cannot apply an SDP
    /// rollback, so the link starts over on a fresh peer connection. The
    /// chat channel opened for our offer is dropped with the old connection
    /// and the remote side's channel is adopted instead.
    pub async fn rollback(&self) -> Result<()> {
        let fresh =
            build_peer_connection(&self.tag, &self.config, &self.events, &self.data_channel)
                .await
                .context("Failed to replace peer connection")?;

        if let Some(dc) = self.data_channel.lock().await.take() {
            silence_data_channel(&dc);
            let _ = dc.close().await;
        }

        let stale = std::mem::replace(&mut *self.peer_connection.lock().await, fresh);
        silence_peer_connection(&stale);
        stale
            .close()
            .await
            .context("Failed to close discarded peer connection")?;

        debug!("Replaced peer connection for {} after yielding", self.tag);
        Ok(())
    }

    pub async fn send(&self, data: Bytes) -> Result<()> {
        let dc = self
            .data_channel
            .lock()
            .await
            .clone()
            .context("Data channel not available")?;
        dc.send(&data).await.context("Failed to send on data channel")?;
        Ok(())
    }

    pub async fn close(&self) -> Result<()> {
        if let Some(dc) = self.data_channel.lock().await.take() {
            let _ = dc.close().await;
        }
        self.pc().await.close().await?;
        Ok(())
    }
}

#[async_trait]
impl PeerLink for ConnectionWrapper {
    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError> {
        ConnectionWrapper::create_offer(self)
            .await
            .map(SessionDescription::offer)
            .map_err(NegotiationError::rejected)
    }

    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError> {
        ConnectionWrapper::create_answer(self)
            .await
            .map(SessionDescription::answer)
            .map_err(NegotiationError::rejected)
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), NegotiationError> {
        ConnectionWrapper::set_remote_description(self, desc)
            .await
            .map_err(NegotiationError::rejected)
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), NegotiationError> {
        ConnectionWrapper::add_ice_candidate(self, candidate)
            .await
            .map_err(NegotiationError::rejected)
    }

    async fn rollback(&self) -> Result<(), NegotiationError> {
        ConnectionWrapper::rollback(self)
            .await
            .map_err(NegotiationError::rejected)
    }

    async fn send(&self, data: Bytes) -> Result<(), NegotiationError> {
        ConnectionWrapper::send(self, data)
            .await
            .map_err(NegotiationError::rejected)
    }

    async fn close(&self) -> Result<(), NegotiationError> {
        ConnectionWrapper::close(self)
            .await
            .map_err(NegotiationError::rejected)
    }
}

/// Builds a peer connection whose callbacks report to `events`. A channel
/// announced by the remote side lands in `data_channel`.
async fn build_peer_connection(
    tag: &SessionTag,
    config: &TransportConfig,
    events: &mpsc::Sender<TransportEvent>,
    data_channel: &DataChannelSlot,
) -> Result<Arc<RTCPeerConnection>> {
    let mut m = MediaEngine::default();
    m.register_default_codecs()?;
    let registry = register_default_interceptors(Registry::new(), &mut m)?;

    let api = APIBuilder::new()
        .with_media_engine(m)
        .with_interceptor_registry(registry)
        .build();

    let rtc_config = RTCConfiguration {
        ice_servers: config
            .ice_servers
            .iter()
            .map(|server| RTCIceServer {
                urls: server.urls.clone(),
                username: server.username.clone().unwrap_or_default(),
                credential: server.credential.clone().unwrap_or_default(),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    };

    let peer_connection = Arc::new(
        api.new_peer_connection(rtc_config)
            .await
            .context("Failed to create peer connection")?,
    );

    let state_tx = events.clone();
    let tag_state = tag.clone();
    peer_connection.on_peer_connection_state_change(Box::new(
        move |s: RTCPeerConnectionState| {
            let tx = state_tx.clone();
            let tag = tag_state.clone();

            Box::pin(async move {
                info!("Peer connection state for {}: {:?}", tag, s);
                let event = match s {
                    RTCPeerConnectionState::Connected => TransportEvent::Connected(tag),
                    RTCPeerConnectionState::Failed | RTCPeerConnectionState::Closed => {
                        TransportEvent::Failed(tag)
                    }
                    _ => return,
                };
                let _ = tx.send(event).await;
            })
        },
    ));

    let ice_tx = events.clone();
    let tag_ice = tag.clone();
    peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
        let tx = ice_tx.clone();
        let tag = tag_ice.clone();

        Box::pin(async move {
            let Some(candidate) = c else { return };
            let Ok(init) = candidate.to_json() else {
                return;
            };
            let candidate = IceCandidate {
                candidate: init.candidate,
                sdp_mid: init.sdp_mid,
                sdp_m_line_index: init.sdp_mline_index,
                username_fragment: init.username_fragment,
            };
            let _ = tx
                .send(TransportEvent::CandidateGenerated(tag, candidate))
                .await;
        })
    }));

    let dc_tx = events.clone();
    let tag_dc = tag.clone();
    let dc_slot = data_channel.clone();
    peer_connection.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
        let tx = dc_tx.clone();
        let tag = tag_dc.clone();
        let slot = dc_slot.clone();

        Box::pin(async move {
            debug!("Remote opened data channel '{}' for {}", dc.label(), tag);
            wire_data_channel(&dc, &tag, &tx);
            *slot.lock().await = Some(dc);
        })
    }));

    Ok(peer_connection)
}

/// Detaches a discarded connection so closing it does not read as the
/// session failing.
fn silence_peer_connection(pc: &RTCPeerConnection) {
    pc.on_peer_connection_state_change(Box::new(|_: RTCPeerConnectionState| {
        Box::pin(async {})
    }));
    pc.on_ice_candidate(Box::new(|_: Option<RTCIceCandidate>| Box::pin(async {})));
    pc.on_data_channel(Box::new(|_: Arc<RTCDataChannel>| Box::pin(async {})));
}

fn silence_data_channel(dc: &RTCDataChannel) {
    dc.on_open(Box::new(|| Box::pin(async {})));
    dc.on_close(Box::new(|| Box::pin(async {})));
    dc.on_message(Box::new(|_: DataChannelMessage| Box::pin(async {})));
}

fn wire_data_channel(
    dc: &Arc<RTCDataChannel>,
    tag: &SessionTag,
    events: &mpsc::Sender<TransportEvent>,
) {
    let tx_open = events.clone();
    let tag_open = tag.clone();
    dc.on_open(Box::new(move || {
        let tx = tx_open.clone();
        let tag = tag_open.clone();

        Box::pin(async move {
            info!("Data channel open for {}", tag);
            let _ = tx.send(TransportEvent::DataChannelOpen(tag)).await;
        })
    }));

    let tx_close = events.clone();
    let tag_close = tag.clone();
    dc.on_close(Box::new(move || {
        let tx = tx_close.clone();
        let tag = tag_close.clone();

        Box::pin(async move {
            info!("Data channel closed for {}", tag);
            let _ = tx.send(TransportEvent::DataChannelClosed(tag)).await;
        })
    }));

    let tx_msg = events.clone();
    let tag_msg = tag.clone();
    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let tx = tx_msg.clone();
        let tag = tag_msg.clone();

        Box::pin(async move {
            let data = Bytes::from(msg.data.to_vec());
            let _ = tx.send(TransportEvent::Message(tag, data)).await;
        })
    }));
}
