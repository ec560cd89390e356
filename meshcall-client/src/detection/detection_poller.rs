use crate::detection::FrameDetector;
use crate::error::CallError;
use async_trait::async_trait;
use bytes::Bytes;
use meshcall_core::Detection;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const DETECTION_INTERVAL: Duration = Duration::from_millis(300);

#[async_trait]
pub trait FrameSource: Send + Sync {
    /// `None` while no frame is available yet; the poller tries again next tick.
    async fn capture(&self) -> Option<Bytes>;
}

pub trait DetectionSink: Send + Sync {
    fn on_detections(&self, detections: Vec<Detection>);

    fn on_error(&self, _error: &CallError) {}
}

/// Fixed-cadence detection loop with at most one request in flight.
///
/// A tick that falls due while a request is outstanding is skipped rather
/// than queued.
pub struct DetectionPoller {
    interval: Duration,
    source: Arc<dyn FrameSource>,
    detector: Arc<dyn FrameDetector>,
    sink: Arc<dyn DetectionSink>,
}

impl DetectionPoller {
    pub fn new(
        source: Arc<dyn FrameSource>,
        detector: Arc<dyn FrameDetector>,
        sink: Arc<dyn DetectionSink>,
    ) -> Self {
        Self {
            interval: DETECTION_INTERVAL,
            source,
            detector,
            sink,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let Some(frame) = self.source.capture().await else {
                continue;
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.detector.detect(frame) => match result {
                    Ok(detections) => self.sink.on_detections(detections),
                    Err(e) => {
                        warn!("Detection failed: {}", e);
                        self.sink.on_error(&e);
                    }
                },
            }
        }
        debug!("Detection poller stopped");
    }
}
