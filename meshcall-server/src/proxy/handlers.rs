use crate::proxy::{ProxyClient, ProxyError, UpstreamReply};
use axum::Json;
use axum::extract::{Multipart, State};
use meshcall_core::TranslateRequest;

/// `POST /detect`: forward the `frame` part of a multipart upload.
pub async fn detect_handler(
    State(proxy): State<ProxyClient>,
    mut multipart: Multipart,
) -> Result<UpstreamReply, ProxyError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("frame") {
            let frame = field.bytes().await?;
            return proxy.detect(frame).await;
        }
    }
    Err(ProxyError::MissingFrame)
}

/// `POST /translate`: forward `{text, language}` as JSON.
pub async fn translate_handler(
    State(proxy): State<ProxyClient>,
    Json(request): Json<TranslateRequest>,
) -> Result<UpstreamReply, ProxyError> {
    proxy.translate(&request).await
}
