use crate::error::{CallError, Result};
use crate::transport::{LinkId, PeerTransport};
use meshcall_core::{ParticipantId, SessionDescription};
use std::collections::HashMap;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    Offering,
    AwaitingAnswer,
    ReceivedOffer,
    Answering,
    Connected,
    Closed,
}

impl NegotiationState {
    /// Initiator: Idle -> Offering -> AwaitingAnswer -> Connected.
    /// Responder: Idle -> ReceivedOffer -> Answering -> Connected.
    /// Closed is reachable from anywhere and is terminal.
    pub fn can_transition_to(self, next: NegotiationState) -> bool {
        use NegotiationState::*;
        match (self, next) {
            (Closed, _) => false,
            (_, Closed) => true,
            (Idle, Offering) | (Offering, AwaitingAnswer) | (AwaitingAnswer, Connected) => true,
            (Idle, ReceivedOffer) | (ReceivedOffer, Answering) | (Answering, Connected) => true,
            _ => false,
        }
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One remote participant's connection and its negotiation progress.
pub struct PeerLink {
    pub remote: ParticipantId,
    pub display_name: String,
    pub link_id: LinkId,
    pub initiator: bool,
    pub state: NegotiationState,
    pub local_description: Option<SessionDescription>,
    pub remote_description: Option<SessionDescription>,
    pub transport: Box<dyn PeerTransport>,
    cancel: CancellationToken,
}

impl PeerLink {
    pub fn new(
        remote: ParticipantId,
        display_name: impl Into<String>,
        link_id: LinkId,
        initiator: bool,
        transport: Box<dyn PeerTransport>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            remote,
            display_name: display_name.into(),
            link_id,
            initiator,
            state: NegotiationState::Idle,
            local_description: None,
            remote_description: None,
            transport,
            cancel,
        }
    }

    pub fn advance(&mut self, next: NegotiationState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(CallError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        debug!(
            "Link {} {}: {} -> {}",
            self.remote, self.link_id, self.state, next
        );
        self.state = next;
        Ok(())
    }

    /// Stop forwarding transport callbacks and release the connection.
    pub async fn close(&mut self) {
        if self.state == NegotiationState::Closed {
            return;
        }
        self.cancel.cancel();
        if let Err(e) = self.transport.close().await {
            warn!("Failed to close transport for {}: {}", self.remote, e);
        }
        self.state = NegotiationState::Closed;
    }

    pub fn is_closed(&self) -> bool {
        self.state == NegotiationState::Closed
    }
}

/// Arena of live links keyed by remote id; at most one link per remote.
#[derive(Default)]
pub struct PeerLinks {
    links: HashMap<ParticipantId, PeerLink>,
    next_id: u64,
}

impl PeerLinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate_id(&mut self) -> LinkId {
        self.next_id += 1;
        LinkId(self.next_id)
    }

    pub fn insert(&mut self, link: PeerLink) -> Result<()> {
        if self.links.contains_key(&link.remote) {
            return Err(CallError::LinkExists(link.remote));
        }
        self.links.insert(link.remote.clone(), link);
        Ok(())
    }

    pub fn remove(&mut self, remote: &ParticipantId) -> Option<PeerLink> {
        self.links.remove(remote)
    }

    pub fn get(&self, remote: &ParticipantId) -> Option<&PeerLink> {
        self.links.get(remote)
    }

    pub fn get_mut(&mut self, remote: &ParticipantId) -> Option<&mut PeerLink> {
        self.links.get_mut(remote)
    }

    pub fn contains(&self, remote: &ParticipantId) -> bool {
        self.links.contains_key(remote)
    }

    /// True when `link` is the generation currently held for `remote`.
    pub fn is_current(&self, remote: &ParticipantId, link: LinkId) -> bool {
        self.links
            .get(remote)
            .is_some_and(|l| l.link_id == link)
    }

    pub fn ids(&self) -> Vec<ParticipantId> {
        let mut ids: Vec<_> = self.links.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn drain(&mut self) -> Vec<PeerLink> {
        self.links.drain().map(|(_, link)| link).collect()
    }
}
