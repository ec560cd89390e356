use crate::config::CallConfig;
use crate::error::{CallError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use meshcall_core::{Detection, TranslateRequest, TranslateResponse};
use reqwest::multipart::{Form, Part};
use tracing::debug;

/// Something that turns a captured frame into bounding boxes.
#[async_trait]
pub trait FrameDetector: Send + Sync {
    async fn detect(&self, frame: Bytes) -> Result<Vec<Detection>>;
}

/// Posts frames to the server's `/detect` proxy.
#[derive(Clone)]
pub struct DetectionClient {
    http: reqwest::Client,
    url: String,
}

impl DetectionClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn from_config(config: &CallConfig) -> Self {
        Self::new(config.detect_url())
    }
}

#[async_trait]
impl FrameDetector for DetectionClient {
    async fn detect(&self, frame: Bytes) -> Result<Vec<Detection>> {
        let part = Part::bytes(frame.to_vec())
            .file_name("frame.jpg")
            .mime_str("image/jpeg")?;
        let form = Form::new().part("frame", part);

        let response = self.http.post(&self.url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CallError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let detections: Vec<Detection> = response.json().await?;
        debug!("Detected {} object(s)", detections.len());
        Ok(detections)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub translated_text: String,
    pub audio_url: Option<String>,
}

/// Posts text to the server's `/translate` proxy.
#[derive(Clone)]
pub struct TranslationClient {
    http: reqwest::Client,
    url: String,
}

impl TranslationClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn from_config(config: &CallConfig) -> Self {
        Self::new(config.translate_url())
    }

    /// A `{error}` reply becomes [`CallError::Translation`].
    pub async fn translate(
        &self,
        text: impl Into<String>,
        language: impl Into<String>,
    ) -> Result<Translation> {
        let request = TranslateRequest {
            text: text.into(),
            language: language.into(),
        };
        let response = self.http.post(&self.url).json(&request).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        match serde_json::from_slice::<TranslateResponse>(&body) {
            Ok(TranslateResponse::Translated {
                translated_text,
                audio_url,
            }) if status.is_success() => Ok(Translation {
                translated_text,
                audio_url,
            }),
            Ok(TranslateResponse::Failed { error }) => Err(CallError::Translation(error)),
            _ => Err(CallError::Upstream {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            }),
        }
    }
}
