use crate::relay::NegotiationKind;
use meshcall_core::{ChatMessage, ClientEvent, ParticipantId};
use serde_json::Value;

/// Work items for the hub, queued by socket tasks in arrival order.
#[derive(Debug)]
pub enum HubCommand {
    /// The connection announced its display name.
    NewUser { id: ParticipantId, name: String },

    /// Offer, answer or candidate addressed to another connection.
    Negotiation {
        kind: NegotiationKind,
        from: ParticipantId,
        target: ParticipantId,
        payload: Value,
        name: Option<String>,
    },

    Chat { from: ParticipantId, chat: ChatMessage },

    /// The socket closed, abruptly or not.
    Disconnect { id: ParticipantId },

    /// Clear state and stop the hub loop.
    Shutdown,
}

impl HubCommand {
    pub fn from_client(from: ParticipantId, event: ClientEvent) -> Self {
        match event {
            ClientEvent::NewUser { name } => HubCommand::NewUser { id: from, name },
            ClientEvent::Offer {
                target,
                offer,
                name,
            } => HubCommand::Negotiation {
                kind: NegotiationKind::Offer,
                from,
                target,
                payload: offer,
                name,
            },
            ClientEvent::Answer {
                target,
                answer,
                name,
            } => HubCommand::Negotiation {
                kind: NegotiationKind::Answer,
                from,
                target,
                payload: answer,
                name,
            },
            ClientEvent::Candidate { target, candidate } => HubCommand::Negotiation {
                kind: NegotiationKind::Candidate,
                from,
                target,
                payload: candidate,
                name: None,
            },
            ClientEvent::Chat(chat) => HubCommand::Chat { from, chat },
        }
    }
}
