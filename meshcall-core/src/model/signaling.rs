use crate::model::chat::ChatMessage;
use crate::model::participant::{Participant, ParticipantId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// Frames a client sends to the signaling server.
///
/// Negotiation payloads (`offer`, `answer`, `candidate`) are carried as raw JSON:
/// the server forwards them without looking inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    NewUser {
        name: String,
    },
    Offer {
        target: ParticipantId,
        offer: Value,
        #[serde(default)]
        name: Option<String>,
    },
    Answer {
        target: ParticipantId,
        answer: Value,
        #[serde(default)]
        name: Option<String>,
    },
    Candidate {
        target: ParticipantId,
        candidate: Value,
    },
    Chat(ChatMessage),
}

/// Frames the signaling server sends to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    Welcome {
        id: ParticipantId,
    },
    IceConfig {
        ice_servers: Vec<IceServerConfig>,
    },
    Users(Vec<Participant>),
    Offer {
        from: ParticipantId,
        offer: Value,
        name: String,
    },
    Answer {
        from: ParticipantId,
        answer: Value,
    },
    Candidate {
        from: ParticipantId,
        candidate: Value,
    },
    Chat(ChatMessage),
    UserDisconnected(ParticipantId),
}
