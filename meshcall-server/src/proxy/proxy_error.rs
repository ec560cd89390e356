use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("multipart field `frame` is missing")]
    MissingFrame,

    #[error("invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error("detection request failed: {0}")]
    Detection(#[source] reqwest::Error),

    #[error("translation request failed: {0}")]
    Translation(#[source] reqwest::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingFrame | ProxyError::Multipart(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            ProxyError::MissingFrame | ProxyError::Multipart(_) => "Invalid frame upload",
            ProxyError::Detection(_) => "Detection failed",
            ProxyError::Translation(_) => "Translation failed",
            ProxyError::Client(_) => "Proxy unavailable",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        error!("Error proxying request: {}", self);
        let body = json!({
            "error": self.summary(),
            "details": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}
