mod chat;
mod detection;
mod participant;
mod session;
mod signaling;

pub use chat::ChatMessage;
pub use detection::{Detection, TranslateRequest, TranslateResponse};
pub use participant::{Participant, ParticipantId};
pub use session::{IceCandidate, SdpKind, SessionDescription};
pub use signaling::{ClientEvent, IceServerConfig, ServerEvent};
