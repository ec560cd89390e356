use crate::transport::LinkContext;
use anyhow::Result;
use async_trait::async_trait;
use meshcall_core::{IceCandidate, SessionDescription};

/// The peer-connection capability behind one PeerLink.
///
/// ICE, DTLS and SRTP live below this line.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Create an offer and install it as the local description.
    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    /// Create an answer and install it as the local description.
    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(&self, ctx: LinkContext) -> Result<Box<dyn PeerTransport>>;
}
