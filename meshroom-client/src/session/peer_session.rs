use crate::error::NegotiationError;
use crate::transport::{LinkHandle, SessionTag};
use meshroom_core::{IceCandidate, PeerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    OfferSent,
    OfferReceived,
    AnswerSent,
    Stable,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Offerer,
    Answerer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Closed,
}

/// Asynchronous step currently outstanding on the link. While a step is in
/// flight the session refuses to start another one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationStep {
    CreatingOffer,
    ApplyingOffer,
    CreatingAnswer,
    ApplyingAnswer,
}

/// Negotiation state for one remote participant.
///
/// Transition methods only mutate the session when their guard holds;
/// otherwise they return [`NegotiationError::StaleTransition`] and leave it
/// untouched. Side effects on the link are the caller's job.
#[derive(Debug)]
pub struct PeerSession {
    tag: SessionTag,
    state: NegotiationState,
    role: Option<Role>,
    step: Option<NegotiationStep>,
    remote_description: bool,
    pending_candidates: Vec<IceCandidate>,
    channel_state: ChannelState,
    connected: bool,
    link: LinkHandle,
}

impl PeerSession {
    pub fn new(link: LinkHandle) -> Self {
        Self {
            tag: link.tag().clone(),
            state: NegotiationState::Idle,
            role: None,
            step: None,
            remote_description: false,
            pending_candidates: Vec::new(),
            channel_state: ChannelState::Connecting,
            connected: false,
            link,
        }
    }

    pub fn id(&self) -> &PeerId {
        &self.tag.peer_id
    }

    pub fn tag(&self) -> &SessionTag {
        &self.tag
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn step(&self) -> Option<NegotiationStep> {
        self.step
    }

    pub fn channel_state(&self) -> ChannelState {
        self.channel_state
    }

    pub fn has_remote_description(&self) -> bool {
        self.remote_description
    }

    pub fn pending_candidates(&self) -> &[IceCandidate] {
        &self.pending_candidates
    }

    /// Whether the underlying connection has reported itself connected.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn link(&self) -> &LinkHandle {
        &self.link
    }

    pub fn is_open(&self) -> bool {
        self.channel_state == ChannelState::Open
    }

    /// True while this side holds, or is about to hold, an unanswered local offer.
    pub fn is_offering(&self) -> bool {
        self.role == Some(Role::Offerer)
            && match self.state {
                NegotiationState::OfferSent => self.step.is_none(),
                NegotiationState::Idle => self.step == Some(NegotiationStep::CreatingOffer),
                _ => false,
            }
    }

    fn stale(&self, action: &'static str) -> NegotiationError {
        NegotiationError::stale(self.id(), action, self.state)
    }

    /// Idle → (creating offer). Role becomes Offerer.
    pub fn begin_offer(&mut self) -> Result<(), NegotiationError> {
        if self.state != NegotiationState::Idle || self.step.is_some() {
            return Err(self.stale("start an offer"));
        }
        self.role = Some(Role::Offerer);
        self.step = Some(NegotiationStep::CreatingOffer);
        Ok(())
    }

    /// Local offer is ready and about to be transmitted: Idle → OfferSent.
    pub fn offer_created(&mut self) -> Result<(), NegotiationError> {
        if self.state != NegotiationState::Idle
            || self.step != Some(NegotiationStep::CreatingOffer)
        {
            return Err(self.stale("send an offer"));
        }
        self.state = NegotiationState::OfferSent;
        self.step = None;
        Ok(())
    }

    /// An offer arrived for an idle session. Role becomes Answerer.
    pub fn begin_accept_offer(&mut self) -> Result<(), NegotiationError> {
        if self.state != NegotiationState::Idle || self.step.is_some() {
            return Err(self.stale("accept an offer"));
        }
        self.role = Some(Role::Answerer);
        self.step = Some(NegotiationStep::ApplyingOffer);
        Ok(())
    }

    /// Glare lost: drop the local offer (sent or still being created) and
    /// answer the remote one instead.
    pub fn yield_to_remote_offer(&mut self) -> Result<(), NegotiationError> {
        if !self.is_offering() {
            return Err(self.stale("yield to a remote offer"));
        }
        self.state = NegotiationState::Idle;
        self.role = Some(Role::Answerer);
        self.step = Some(NegotiationStep::ApplyingOffer);
        Ok(())
    }

    /// Remote offer applied: Idle → OfferReceived. Returns the queued
    /// candidates, in arrival order, which the caller must apply now.
    pub fn remote_offer_applied(&mut self) -> Result<Vec<IceCandidate>, NegotiationError> {
        if self.state != NegotiationState::Idle
            || self.step != Some(NegotiationStep::ApplyingOffer)
        {
            return Err(self.stale("apply a remote offer"));
        }
        self.state = NegotiationState::OfferReceived;
        self.step = Some(NegotiationStep::CreatingAnswer);
        Ok(self.take_remote_description())
    }

    /// Local answer is ready and about to be transmitted: OfferReceived → AnswerSent.
    pub fn answer_created(&mut self) -> Result<(), NegotiationError> {
        if self.state != NegotiationState::OfferReceived
            || self.step != Some(NegotiationStep::CreatingAnswer)
        {
            return Err(self.stale("send an answer"));
        }
        self.state = NegotiationState::AnswerSent;
        self.step = None;
        Ok(())
    }

    /// An answer arrived. Only valid in OfferSent with nothing in flight, which
    /// also rejects duplicates of an answer already being applied.
    pub fn begin_accept_answer(&mut self) -> Result<(), NegotiationError> {
        if self.state != NegotiationState::OfferSent || self.step.is_some() {
            return Err(self.stale("accept an answer"));
        }
        self.step = Some(NegotiationStep::ApplyingAnswer);
        Ok(())
    }

    /// Remote answer applied: OfferSent → Stable. Returns the queued candidates.
    pub fn remote_answer_applied(&mut self) -> Result<Vec<IceCandidate>, NegotiationError> {
        if self.state != NegotiationState::OfferSent
            || self.step != Some(NegotiationStep::ApplyingAnswer)
        {
            return Err(self.stale("apply a remote answer"));
        }
        self.state = NegotiationState::Stable;
        self.step = None;
        Ok(self.take_remote_description())
    }

    /// Answerer side: the connection finished negotiating. AnswerSent → Stable.
    pub fn negotiation_completed(&mut self) -> Result<(), NegotiationError> {
        if self.state != NegotiationState::AnswerSent {
            return Err(self.stale("complete negotiation"));
        }
        self.state = NegotiationState::Stable;
        Ok(())
    }

    /// A suspended step failed. The state stays where it was; only the
    /// in-flight marker is cleared, and only if it still refers to `step`.
    pub fn step_failed(&mut self, step: NegotiationStep) {
        if self.step == Some(step) {
            self.step = None;
        }
    }

    /// Returns the candidate back if it can be applied right away, or queues
    /// it until the first remote description is set.
    pub fn accept_candidate(&mut self, candidate: IceCandidate) -> Option<IceCandidate> {
        if self.remote_description {
            Some(candidate)
        } else {
            self.pending_candidates.push(candidate);
            None
        }
    }

    /// The connection finished negotiating. Completes an answerer session
    /// waiting in AnswerSent; otherwise only remembered, since the answer may
    /// not have been sent yet.
    pub fn link_connected(&mut self) {
        self.connected = true;
        if self.state == NegotiationState::AnswerSent {
            self.state = NegotiationState::Stable;
        }
    }

    pub fn channel_opened(&mut self) {
        if self.state != NegotiationState::Closed {
            self.channel_state = ChannelState::Open;
        }
    }

    pub fn channel_closed(&mut self) {
        self.channel_state = ChannelState::Closed;
    }

    /// Any state → Closed. Releases the link and discards queued candidates.
    pub fn close(&mut self) {
        self.state = NegotiationState::Closed;
        self.step = None;
        self.channel_state = ChannelState::Closed;
        self.pending_candidates.clear();
        self.link.close();
    }

    fn take_remote_description(&mut self) -> Vec<IceCandidate> {
        self.remote_description = true;
        std::mem::take(&mut self.pending_candidates)
    }
}
