mod peer_link;
mod peer_session_coordinator;

pub use peer_link::*;
pub use peer_session_coordinator::*;
