use crate::session::PeerSession;
use crate::transport::{LinkHandle, SessionTag};
use meshroom_core::PeerId;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::debug;

/// Every known remote participant, at most one session each.
///
/// Sessions are kept in insertion order so broadcasts and snapshots are
/// deterministic. Each created session gets a fresh epoch; events tagged
/// with an older epoch for the same peer are recognisably stale.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<PeerId, PeerSession>,
    order: Vec<PeerId>,
    next_epoch: u64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session for `peer_id`, creating it if absent. `make_link`
    /// is only called on creation. The flag is true when a session was created.
    pub fn ensure<F>(&mut self, peer_id: &PeerId, make_link: F) -> (&mut PeerSession, bool)
    where
        F: FnOnce(SessionTag) -> LinkHandle,
    {
        match self.sessions.entry(peer_id.clone()) {
            Entry::Occupied(entry) => (entry.into_mut(), false),
            Entry::Vacant(entry) => {
                self.next_epoch += 1;
                let tag = SessionTag {
                    peer_id: peer_id.clone(),
                    epoch: self.next_epoch,
                };
                debug!("Creating session {}", tag);
                self.order.push(peer_id.clone());
                (entry.insert(PeerSession::new(make_link(tag))), true)
            }
        }
    }

    pub fn get(&self, peer_id: &PeerId) -> Option<&PeerSession> {
        self.sessions.get(peer_id)
    }

    pub fn get_mut(&mut self, peer_id: &PeerId) -> Option<&mut PeerSession> {
        self.sessions.get_mut(peer_id)
    }

    /// The session `tag` refers to, only if it is still the live incarnation.
    pub fn get_live(&mut self, tag: &SessionTag) -> Option<&mut PeerSession> {
        self.sessions
            .get_mut(&tag.peer_id)
            .filter(|session| session.tag().epoch == tag.epoch)
    }

    pub fn contains(&self, peer_id: &PeerId) -> bool {
        self.sessions.contains_key(peer_id)
    }

    /// Closes and forgets the session. Unknown ids are a no-op.
    pub fn remove(&mut self, peer_id: &PeerId) -> Option<PeerSession> {
        let mut session = self.sessions.remove(peer_id)?;
        self.order.retain(|id| id != peer_id);
        session.close();
        debug!("Removed session {}", session.tag());
        Some(session)
    }

    /// Sessions in insertion order.
    pub fn all(&self) -> impl Iterator<Item = &PeerSession> {
        self.order.iter().filter_map(|id| self.sessions.get(id))
    }

    pub fn ids(&self) -> Vec<PeerId> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn drain(&mut self) -> Vec<PeerSession> {
        let ids = std::mem::take(&mut self.order);
        ids.iter().filter_map(|id| self.remove(id)).collect()
    }
}
