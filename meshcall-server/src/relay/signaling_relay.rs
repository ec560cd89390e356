use crate::signaling::SignalingOutput;
use meshcall_core::{ChatMessage, ParticipantId, ServerEvent};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Display name used on relayed offers when the sender is unknown.
pub const ANONYMOUS_NAME: &str = "Anonymous";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationKind {
    Offer,
    Answer,
    Candidate,
}

impl fmt::Display for NegotiationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationKind::Offer => f.write_str("offer"),
            NegotiationKind::Answer => f.write_str("answer"),
            NegotiationKind::Candidate => f.write_str("candidate"),
        }
    }
}

/// Point-to-point forwarder for negotiation messages plus the chat fan-out.
///
/// Payloads pass through untouched. Delivery is at-most-once. A target that has
/// already disconnected is dropped without telling the sender.
pub struct SignalingRelay {
    signaling: Arc<dyn SignalingOutput>,
}

impl SignalingRelay {
    pub fn new(signaling: Arc<dyn SignalingOutput>) -> Self {
        Self { signaling }
    }

    /// Forward `payload` to `target`, tagged with the sender.
    ///
    /// `sender_name` is only carried on offers. Returns whether the target was
    /// still connected.
    pub async fn relay(
        &self,
        kind: NegotiationKind,
        sender: ParticipantId,
        target: &ParticipantId,
        payload: Value,
        sender_name: Option<String>,
    ) -> bool {
        let event = match kind {
            NegotiationKind::Offer => ServerEvent::Offer {
                from: sender.clone(),
                offer: payload,
                name: sender_name.unwrap_or_else(|| ANONYMOUS_NAME.to_owned()),
            },
            NegotiationKind::Answer => ServerEvent::Answer {
                from: sender.clone(),
                answer: payload,
            },
            NegotiationKind::Candidate => ServerEvent::Candidate {
                from: sender.clone(),
                candidate: payload,
            },
        };

        let delivered = self.signaling.send_to(target, event).await;
        if delivered {
            debug!("Relayed {} {} -> {}", kind, sender, target);
        } else {
            debug!("Dropped {} from {}: target {} is gone", kind, sender, target);
        }
        delivered
    }

    /// Fan a chat message out to everyone but its sender.
    pub async fn broadcast_chat(&self, sender: &ParticipantId, chat: ChatMessage) {
        debug!("Chat from {} ({} bytes)", sender, chat.message.len());
        self.signaling
            .broadcast_except(sender, ServerEvent::Chat(chat))
            .await;
    }
}
