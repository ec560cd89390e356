use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Chat payload, broadcast verbatim to every endpoint except the sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub message: String,
    pub name: String,
    #[serde(rename = "isSpeech", default, skip_serializing_if = "Option::is_none")]
    pub is_speech: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    /// Fields this crate does not know about, relayed untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatMessage {
    pub fn text(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            name: name.into(),
            is_speech: None,
            audio_url: None,
            extra: Map::new(),
        }
    }

    pub fn speech(
        name: impl Into<String>,
        message: impl Into<String>,
        audio_url: Option<String>,
    ) -> Self {
        Self {
            message: message.into(),
            name: name.into(),
            is_speech: Some(true),
            audio_url,
            extra: Map::new(),
        }
    }

    pub fn is_speech(&self) -> bool {
        self.is_speech.unwrap_or(false)
    }
}
