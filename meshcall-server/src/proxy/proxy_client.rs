use crate::config::ServerConfig;
use crate::proxy::ProxyError;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use meshcall_core::TranslateRequest;
use reqwest::multipart::{Form, Part};
use tracing::debug;

/// Upstream status and body, handed back to the browser untouched.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub body: Bytes,
}

impl IntoResponse for UpstreamReply {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            self.body,
        )
            .into_response()
    }
}

/// Forwards detection and translation calls to the external services.
///
/// Stateless: nothing is cached, so identical requests reach the upstream
/// identically.
#[derive(Clone)]
pub struct ProxyClient {
    http: reqwest::Client,
    detect_url: String,
    translate_url: String,
}

impl ProxyClient {
    pub fn new(config: &ServerConfig) -> Result<Self, ProxyError> {
        let http = reqwest::Client::builder()
            .timeout(config.proxy_timeout)
            .build()
            .map_err(ProxyError::Client)?;

        Ok(Self {
            http,
            detect_url: config.detect_url.clone(),
            translate_url: config.translate_url.clone(),
        })
    }

    pub async fn detect(&self, frame: Bytes) -> Result<UpstreamReply, ProxyError> {
        debug!("Forwarding {} byte frame to {}", frame.len(), self.detect_url);
        let part = Part::bytes(frame.to_vec())
            .file_name("frame.jpg")
            .mime_str("image/jpeg")
            .map_err(ProxyError::Detection)?;
        let form = Form::new().part("frame", part);

        let response = self
            .http
            .post(&self.detect_url)
            .multipart(form)
            .send()
            .await
            .map_err(ProxyError::Detection)?;

        Self::into_reply(response)
            .await
            .map_err(ProxyError::Detection)
    }

    pub async fn translate(&self, request: &TranslateRequest) -> Result<UpstreamReply, ProxyError> {
        debug!(
            "Forwarding translation ({} chars, '{}') to {}",
            request.text.len(),
            request.language,
            self.translate_url
        );
        let response = self
            .http
            .post(&self.translate_url)
            .json(request)
            .send()
            .await
            .map_err(ProxyError::Translation)?;

        Self::into_reply(response)
            .await
            .map_err(ProxyError::Translation)
    }

    async fn into_reply(response: reqwest::Response) -> Result<UpstreamReply, reqwest::Error> {
        let status = StatusCode::from_u16(response.status().as_u16())
            .unwrap_or(StatusCode::BAD_GATEWAY);
        let body = response.bytes().await?;
        Ok(UpstreamReply { status, body })
    }
}
