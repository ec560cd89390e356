//! Error types for the call client

use meshcall_core::ParticipantId;

/// Result type alias using [`CallError`]
pub type Result<T> = std::result::Result<T, CallError>;

#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// Camera/microphone could not be acquired; the call never starts
    #[error("Media access denied: {0}")]
    MediaAccessDenied(String),

    #[error("Signaling error: {0}")]
    Signaling(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Negotiation payload that does not decode as a description or candidate
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("A peer link for {0} already exists")]
    LinkExists(ParticipantId),

    #[error("Illegal negotiation transition {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// External service answered with a non-success status
    #[error("Upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Translation failed: {0}")]
    Translation(String),

    /// The orchestrator has already left the call
    #[error("Call is closed")]
    Closed,

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}
