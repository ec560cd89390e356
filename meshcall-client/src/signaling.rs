use crate::error::{CallError, Result};
use futures::{SinkExt, StreamExt};
use meshcall_core::{ClientEvent, ServerEvent};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// How long leaving waits for queued frames and the close frame to go out.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// A bidirectional stream of signaling frames.
///
/// The inbox yields `None` once the server side is gone.
pub struct SignalingChannel {
    pub outbox: mpsc::UnboundedSender<ClientEvent>,
    pub inbox: mpsc::UnboundedReceiver<ServerEvent>,
    writer: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
}

impl SignalingChannel {
    /// Wrap an already-connected pair of queues, e.g. an in-process relay.
    pub fn from_parts(
        outbox: mpsc::UnboundedSender<ClientEvent>,
        inbox: mpsc::UnboundedReceiver<ServerEvent>,
    ) -> Self {
        Self {
            outbox,
            inbox,
            writer: None,
            reader: None,
        }
    }

    pub fn send(&self, event: ClientEvent) -> Result<()> {
        self.outbox
            .send(event)
            .map_err(|_| CallError::Signaling("signaling channel closed".into()))
    }

    /// Drop the connection to the relay.
    ///
    /// Frames already queued are flushed and a close frame is sent once every
    /// other clone of the outbox is gone; the writer gets [`CLOSE_TIMEOUT`].
    pub async fn close(self) {
        let SignalingChannel {
            outbox,
            inbox,
            writer,
            reader,
        } = self;
        drop(outbox);
        drop(inbox);

        if let Some(mut writer) = writer {
            if timeout(CLOSE_TIMEOUT, &mut writer).await.is_err() {
                warn!("Signaling writer did not finish in time");
                writer.abort();
            }
        }
        if let Some(reader) = reader {
            reader.abort();
        }
    }
}

pub struct SignalingClient;

impl SignalingClient {
    /// Open the WebSocket and spawn the reader and writer tasks.
    pub async fn connect(url: &str) -> Result<SignalingChannel> {
        let (ws_stream, _) = connect_async(url).await?;
        info!("Connected to signaling server at {}", url);
        let (mut write, mut read) = ws_stream.split();

        let (outbox_tx, mut outbox_rx) = mpsc::unbounded_channel::<ClientEvent>();
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel::<ServerEvent>();

        let writer = tokio::spawn(async move {
            while let Some(event) = outbox_rx.recv().await {
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to encode {:?}: {}", event, e);
                        continue;
                    }
                };
                if write.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
            let _ = write.close().await;
            debug!("Signaling writer stopped");
        });

        let reader = tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                let text = match msg {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("Signaling read error: {}", e);
                        break;
                    }
                };
                match serde_json::from_str::<ServerEvent>(&text) {
                    Ok(event) => {
                        if inbox_tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Ignoring malformed signaling frame: {}", e),
                }
            }
            debug!("Signaling reader stopped");
        });

        Ok(SignalingChannel {
            outbox: outbox_tx,
            inbox: inbox_rx,
            writer: Some(writer),
            reader: Some(reader),
        })
    }
}
