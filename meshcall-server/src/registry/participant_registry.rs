use crate::signaling::SignalingOutput;
use meshcall_core::{Participant, ParticipantId, ServerEvent};
use std::sync::Arc;
use tracing::{debug, info};

/// Authoritative set of joined participants, in join order.
///
/// Owned by the hub for the lifetime of the server process. Every mutation
/// broadcasts the full list to all connected endpoints.
pub struct ParticipantRegistry {
    participants: Vec<Participant>,
    signaling: Arc<dyn SignalingOutput>,
}

impl ParticipantRegistry {
    pub fn new(signaling: Arc<dyn SignalingOutput>) -> Self {
        Self {
            participants: Vec::new(),
            signaling,
        }
    }

    /// Insert or overwrite the entry for `id`, then broadcast the list.
    ///
    /// A re-join keeps the participant's original position.
    pub async fn join(&mut self, id: ParticipantId, name: String) {
        match self.participants.iter_mut().find(|p| p.id == id) {
            Some(existing) => {
                debug!("Participant {} renamed to '{}'", id, name);
                existing.name = name;
            }
            None => {
                info!("Participant {} joined as '{}'", id, name);
                self.participants.push(Participant::new(id, name));
            }
        }

        self.broadcast_list().await;
    }

    /// Remove `id`, broadcast the list, then announce the departure.
    ///
    /// The announcement goes out even when `id` never joined, since the socket
    /// itself was live and peers key their links on the connection id.
    pub async fn leave(&mut self, id: &ParticipantId) -> Option<Participant> {
        let removed = self
            .participants
            .iter()
            .position(|p| &p.id == id)
            .map(|idx| self.participants.remove(idx));

        match &removed {
            Some(p) => info!("Participant {} ('{}') left", p.id, p.name),
            None => debug!("Connection {} closed without joining", id),
        }

        self.broadcast_list().await;
        self.signaling
            .broadcast(ServerEvent::UserDisconnected(id.clone()))
            .await;

        removed
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == id)
    }

    pub fn display_name(&self, id: &ParticipantId) -> Option<&str> {
        self.get(id).map(|p| p.name.as_str())
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn clear(&mut self) {
        self.participants.clear();
    }

    async fn broadcast_list(&self) {
        self.signaling
            .broadcast(ServerEvent::Users(self.participants.clone()))
            .await;
    }
}
