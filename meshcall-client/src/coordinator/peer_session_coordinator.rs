use crate::coordinator::{NegotiationState, PeerLink, PeerLinks};
use crate::error::{CallError, Result};
use crate::transport::{LinkContext, LinkEvent, MediaHandle, TransportFactory, TransportState};
use meshcall_core::{
    ClientEvent, IceCandidate, IceServerConfig, Participant, ParticipantId, SessionDescription,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Exactly one side of every pair initiates: the one with the lower id.
pub fn should_initiate(local: &ParticipantId, remote: &ParticipantId) -> bool {
    local < remote
}

/// A remote participant's media became available.
#[derive(Debug, Clone)]
pub struct RemoteStream {
    pub remote: ParticipantId,
    pub display_name: String,
    pub media: MediaHandle,
}

/// Drives one PeerLink per remote participant through offer/answer.
///
/// All methods take `&mut self`; the owner feeds signaling messages and
/// transport events in one at a time, so no two handlers interleave.
pub struct PeerSessionCoordinator {
    local_id: Option<ParticipantId>,
    local_name: String,
    links: PeerLinks,
    factory: Arc<dyn TransportFactory>,
    ice_servers: Vec<IceServerConfig>,
    outbox: mpsc::UnboundedSender<ClientEvent>,
    link_events: mpsc::UnboundedSender<LinkEvent>,
    pending_users: Option<Vec<Participant>>,
}

impl PeerSessionCoordinator {
    pub fn new(
        local_name: impl Into<String>,
        factory: Arc<dyn TransportFactory>,
        ice_servers: Vec<IceServerConfig>,
        outbox: mpsc::UnboundedSender<ClientEvent>,
        link_events: mpsc::UnboundedSender<LinkEvent>,
    ) -> Self {
        Self {
            local_id: None,
            local_name: local_name.into(),
            links: PeerLinks::new(),
            factory,
            ice_servers,
            outbox,
            link_events,
            pending_users: None,
        }
    }

    pub fn local_id(&self) -> Option<&ParticipantId> {
        self.local_id.as_ref()
    }

    pub fn links(&self) -> &PeerLinks {
        &self.links
    }

    pub fn state_of(&self, remote: &ParticipantId) -> Option<NegotiationState> {
        self.links.get(remote).map(|l| l.state)
    }

    /// Applies to links created from now on.
    pub fn set_ice_servers(&mut self, ice_servers: Vec<IceServerConfig>) {
        debug!("Using {} ICE server(s)", ice_servers.len());
        self.ice_servers = ice_servers;
    }

    /// Record the id the server assigned and evaluate any roster that
    /// arrived before it.
    pub async fn set_local_id(&mut self, id: ParticipantId) {
        info!("Assigned participant id {}", id);
        self.local_id = Some(id);
        if let Some(users) = self.pending_users.take() {
            self.handle_users(&users).await;
        }
    }

    /// Start negotiating with every listed participant this side should
    /// initiate to and is not yet linked with.
    pub async fn handle_users(&mut self, users: &[Participant]) {
        let Some(local) = self.local_id.clone() else {
            debug!("Roster arrived before the local id, deferring");
            self.pending_users = Some(users.to_vec());
            return;
        };

        for user in users {
            if user.id == local || self.links.contains(&user.id) {
                continue;
            }
            if should_initiate(&local, &user.id) {
                self.initiate(user.id.clone(), user.name.clone()).await;
            }
        }
    }

    async fn initiate(&mut self, remote: ParticipantId, name: String) {
        let mut link = match self.open_link(remote.clone(), name, true).await {
            Ok(link) => link,
            Err(e) => {
                error!("Failed to create transport for {}: {}", remote, e);
                return;
            }
        };

        match self.send_offer(&mut link).await {
            Ok(()) => self.adopt(link),
            Err(e) => {
                warn!("Offer to {} failed: {}", remote, e);
                link.close().await;
            }
        }
    }

    pub async fn handle_offer(&mut self, from: ParticipantId, name: String, offer: Value) {
        if self.local_id.as_ref() == Some(&from) {
            return;
        }
        if self.links.contains(&from) {
            debug!("Discarding duplicate offer from {}", from);
            return;
        }
        let offer: SessionDescription = match serde_json::from_value(offer) {
            Ok(offer) => offer,
            Err(e) => {
                warn!("Invalid offer from {}: {}", from, e);
                return;
            }
        };

        let mut link = match self.open_link(from.clone(), name, false).await {
            Ok(link) => link,
            Err(e) => {
                error!("Failed to create transport for {}: {}", from, e);
                return;
            }
        };

        match self.send_answer(&mut link, offer).await {
            Ok(()) => self.adopt(link),
            Err(e) => {
                warn!("Answer to {} failed: {}", from, e);
                link.close().await;
            }
        }
    }

    pub async fn handle_answer(&mut self, from: ParticipantId, answer: Value) {
        let Some(link) = self.links.get_mut(&from) else {
            debug!("Discarding answer from {}: no link", from);
            return;
        };
        if link.state != NegotiationState::AwaitingAnswer {
            debug!("Discarding answer from {} in state {}", from, link.state);
            return;
        }
        let answer: SessionDescription = match serde_json::from_value(answer) {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Invalid answer from {}: {}", from, e);
                return;
            }
        };

        let outcome = match link.transport.set_remote_description(answer.clone()).await {
            Ok(()) => {
                link.remote_description = Some(answer);
                link.advance(NegotiationState::Connected)
            }
            Err(e) => Err(CallError::from(e)),
        };

        if let Err(e) = outcome {
            warn!("Applying answer from {} failed: {}", from, e);
            self.fail_link(&from).await;
        }
    }

    /// Candidates for an unknown remote are dropped.
    pub async fn handle_candidate(&mut self, from: ParticipantId, candidate: Value) {
        let Some(link) = self.links.get(&from) else {
            debug!("Dropping candidate from {}: no link", from);
            return;
        };
        let candidate: IceCandidate = match serde_json::from_value(candidate) {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!("Invalid candidate from {}: {}", from, e);
                return;
            }
        };
        if let Err(e) = link.transport.add_ice_candidate(candidate).await {
            warn!("Dropping candidate from {}: {}", from, e);
        }
    }

    /// Tear down the link to a departed participant. Returns whether one existed.
    pub async fn handle_participant_left(&mut self, id: &ParticipantId) -> bool {
        if let Some(pending) = self.pending_users.as_mut() {
            pending.retain(|p| &p.id != id);
        }
        match self.links.remove(id) {
            Some(mut link) => {
                link.close().await;
                info!("Closed link to {}", id);
                true
            }
            None => false,
        }
    }

    /// Route a transport event; events from superseded links are discarded.
    pub fn handle_link_event(&mut self, event: LinkEvent) -> Option<RemoteStream> {
        if !self.links.is_current(event.remote(), event.link()) {
            debug!(
                "Discarding stale event for {} {}",
                event.remote(),
                event.link()
            );
            return None;
        }

        match event {
            LinkEvent::LocalCandidate {
                remote, candidate, ..
            } => {
                let sent = serde_json::to_value(&candidate)
                    .map_err(CallError::from)
                    .and_then(|payload| {
                        self.send(ClientEvent::Candidate {
                            target: remote.clone(),
                            candidate: payload,
                        })
                    });
                if let Err(e) = sent {
                    warn!("Failed to send candidate to {}: {}", remote, e);
                }
                None
            }
            LinkEvent::RemoteTrack { remote, media, .. } => {
                let display_name = self
                    .links
                    .get(&remote)
                    .map(|l| l.display_name.clone())
                    .unwrap_or_default();
                Some(RemoteStream {
                    remote,
                    display_name,
                    media,
                })
            }
            LinkEvent::StateChanged { remote, state, .. } => {
                match state {
                    TransportState::Failed => warn!("Transport to {} failed", remote),
                    TransportState::Disconnected => info!("Transport to {} disconnected", remote),
                    other => debug!("Transport to {} is {:?}", remote, other),
                }
                None
            }
        }
    }

    /// Close every link. Used when leaving the call.
    pub async fn close_all(&mut self) {
        for mut link in self.links.drain() {
            link.close().await;
        }
        self.pending_users = None;
    }

    async fn open_link(
        &mut self,
        remote: ParticipantId,
        display_name: String,
        initiator: bool,
    ) -> Result<PeerLink> {
        let link_id = self.links.allocate_id();
        let cancel = CancellationToken::new();
        let ctx = LinkContext {
            remote: remote.clone(),
            link: link_id,
            initiator,
            ice_servers: self.ice_servers.clone(),
            events: self.link_events.clone(),
            cancel: cancel.clone(),
        };
        let transport = self.factory.create(ctx).await?;
        Ok(PeerLink::new(
            remote,
            display_name,
            link_id,
            initiator,
            transport,
            cancel,
        ))
    }

    async fn send_offer(&self, link: &mut PeerLink) -> Result<()> {
        link.advance(NegotiationState::Offering)?;
        let offer = link.transport.create_offer().await?;
        let payload = serde_json::to_value(&offer)?;
        link.local_description = Some(offer);
        self.send(ClientEvent::Offer {
            target: link.remote.clone(),
            offer: payload,
            name: Some(self.local_name.clone()),
        })?;
        link.advance(NegotiationState::AwaitingAnswer)
    }

    async fn send_answer(&self, link: &mut PeerLink, offer: SessionDescription) -> Result<()> {
        link.advance(NegotiationState::ReceivedOffer)?;
        link.transport.set_remote_description(offer.clone()).await?;
        link.remote_description = Some(offer);
        link.advance(NegotiationState::Answering)?;
        let answer = link.transport.create_answer().await?;
        let payload = serde_json::to_value(&answer)?;
        link.local_description = Some(answer);
        self.send(ClientEvent::Answer {
            target: link.remote.clone(),
            answer: payload,
            name: Some(self.local_name.clone()),
        })?;
        link.advance(NegotiationState::Connected)
    }

    fn adopt(&mut self, link: PeerLink) {
        if let Err(e) = self.links.insert(link) {
            error!("Failed to register link: {}", e);
        }
    }

    async fn fail_link(&mut self, remote: &ParticipantId) {
        if let Some(mut link) = self.links.remove(remote) {
            link.close().await;
        }
    }

    fn send(&self, event: ClientEvent) -> Result<()> {
        self.outbox
            .send(event)
            .map_err(|_| CallError::Signaling("signaling channel closed".into()))
    }
}
