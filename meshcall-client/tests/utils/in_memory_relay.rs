use async_trait::async_trait;
use meshcall_client::SignalingChannel;
use meshcall_core::{ClientEvent, ParticipantId, ServerEvent};
use meshcall_server::{HUB_CHANNEL_CAPACITY, Hub, HubCommand, SignalingOutput};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

type Endpoints = Arc<Mutex<HashMap<ParticipantId, mpsc::UnboundedSender<ServerEvent>>>>;

/// The server's hub wired to in-process queues instead of sockets.
#[derive(Clone)]
pub struct InMemoryRelay {
    endpoints: Endpoints,
    hub_tx: mpsc::Sender<HubCommand>,
}

struct EndpointOutput {
    endpoints: Endpoints,
}

#[async_trait]
impl SignalingOutput for EndpointOutput {
    async fn send_to(&self, target: &ParticipantId, event: ServerEvent) -> bool {
        match self.endpoints.lock().await.get(target) {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    async fn broadcast(&self, event: ServerEvent) {
        for tx in self.endpoints.lock().await.values() {
            let _ = tx.send(event.clone());
        }
    }

    async fn broadcast_except(&self, excluded: &ParticipantId, event: ServerEvent) {
        for (id, tx) in self.endpoints.lock().await.iter() {
            if id != excluded {
                let _ = tx.send(event.clone());
            }
        }
    }
}

impl InMemoryRelay {
    pub fn start() -> Self {
        let endpoints: Endpoints = Arc::new(Mutex::new(HashMap::new()));
        let (hub_tx, hub_rx) = mpsc::channel(HUB_CHANNEL_CAPACITY);
        let hub = Hub::new(
            hub_rx,
            Arc::new(EndpointOutput {
                endpoints: endpoints.clone(),
            }),
        );
        tokio::spawn(hub.run());
        Self { endpoints, hub_tx }
    }

    /// Attach a client under a fixed id. The welcome frame is queued first.
    ///
    /// When every sender of the returned outbox is dropped the endpoint is
    /// removed and the hub sees a disconnect.
    pub async fn connect(&self, id: &str) -> SignalingChannel {
        let id = ParticipantId::from(id);
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (outbox_tx, mut outbox_rx) = mpsc::unbounded_channel::<ClientEvent>();

        let _ = inbox_tx.send(ServerEvent::Welcome { id: id.clone() });
        self.endpoints.lock().await.insert(id.clone(), inbox_tx);

        let endpoints = self.endpoints.clone();
        let hub_tx = self.hub_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = outbox_rx.recv().await {
                if hub_tx
                    .send(HubCommand::from_client(id.clone(), event))
                    .await
                    .is_err()
                {
                    break;
                }
            }
            endpoints.lock().await.remove(&id);
            let _ = hub_tx.send(HubCommand::Disconnect { id }).await;
        });

        SignalingChannel::from_parts(outbox_tx, inbox_rx)
    }
}
