use async_trait::async_trait;
use meshcall_core::{ParticipantId, ServerEvent};

/// Outbound side of the signaling channel.
///
/// The registry and the relay only ever talk to clients through this trait, so the
/// hub can run against a socket table in production and a capturing mock in tests.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Deliver an event to exactly one endpoint.
    ///
    /// Returns `false` when the endpoint is no longer connected. Callers treat that
    /// as a silent drop.
    async fn send_to(&self, target: &ParticipantId, event: ServerEvent) -> bool;

    /// Deliver an event to every connected endpoint.
    async fn broadcast(&self, event: ServerEvent);

    /// Deliver an event to every connected endpoint except `excluded`.
    async fn broadcast_except(&self, excluded: &ParticipantId, event: ServerEvent);
}
