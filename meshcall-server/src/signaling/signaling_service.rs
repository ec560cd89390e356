use crate::hub::HubCommand;
use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use axum::extract::ws::{Message, Utf8Bytes};
use dashmap::DashMap;
use meshcall_core::{IceServerConfig, ParticipantId, ServerEvent};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

struct SignalingInner {
    connections: DashMap<ParticipantId, mpsc::UnboundedSender<Message>>,
    ice_servers: Vec<IceServerConfig>,
    closing: AtomicBool,
}

/// Table of open signaling sockets plus the command line into the hub.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
    hub_tx: mpsc::Sender<HubCommand>,
}

impl SignalingService {
    pub fn new(hub_tx: mpsc::Sender<HubCommand>, ice_servers: Vec<IceServerConfig>) -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                connections: DashMap::new(),
                ice_servers,
                closing: AtomicBool::new(false),
            }),
            hub_tx,
        }
    }

    pub fn ice_servers(&self) -> Vec<IceServerConfig> {
        self.inner.ice_servers.clone()
    }

    pub fn add_connection(&self, id: ParticipantId, tx: mpsc::UnboundedSender<Message>) {
        self.inner.connections.insert(id, tx);
    }

    pub fn remove_connection(&self, id: &ParticipantId) {
        self.inner.connections.remove(id);
    }

    pub fn is_connected(&self, id: &ParticipantId) -> bool {
        self.inner.connections.contains_key(id)
    }

    pub fn connection_count(&self) -> usize {
        self.inner.connections.len()
    }

    /// Drop every outbound sender. Each socket's writer task then finishes, which
    /// tears the socket down and queues its `Disconnect`.
    pub fn close_all(&self) {
        self.inner.closing.store(true, Ordering::SeqCst);
        self.inner.connections.clear();
    }

    pub fn is_closing(&self) -> bool {
        self.inner.closing.load(Ordering::SeqCst)
    }

    /// Queue a command for the hub. Returns `false` once the hub has stopped.
    pub async fn submit(&self, cmd: HubCommand) -> bool {
        match self.hub_tx.send(cmd).await {
            Ok(()) => true,
            Err(e) if self.is_closing() => {
                debug!("Hub stopped during shutdown, dropping {:?}", e.0);
                false
            }
            Err(e) => {
                error!("Hub is gone, dropping command: {:?}", e.0);
                false
            }
        }
    }

    fn deliver(&self, id: &ParticipantId, tx: &mpsc::UnboundedSender<Message>, text: Utf8Bytes) {
        if tx.send(Message::Text(text)).is_err() {
            debug!("Socket writer for {} already closed", id);
        }
    }
}

/// Serialize a server event into a text frame payload.
pub fn encode_event(event: &ServerEvent) -> Option<Utf8Bytes> {
    match serde_json::to_string(event) {
        Ok(json) => Some(json.into()),
        Err(e) => {
            error!("Failed to serialize server event: {}", e);
            None
        }
    }
}

#[async_trait]
impl SignalingOutput for SignalingService {
    async fn send_to(&self, target: &ParticipantId, event: ServerEvent) -> bool {
        let Some(tx) = self.inner.connections.get(target) else {
            warn!("Attempted to send signal to disconnected user {}", target);
            return false;
        };
        let Some(text) = encode_event(&event) else {
            return false;
        };
        self.deliver(target, &tx, text);
        true
    }

    async fn broadcast(&self, event: ServerEvent) {
        let Some(text) = encode_event(&event) else {
            return;
        };
        for entry in self.inner.connections.iter() {
            self.deliver(entry.key(), entry.value(), text.clone());
        }
    }

    async fn broadcast_except(&self, excluded: &ParticipantId, event: ServerEvent) {
        let Some(text) = encode_event(&event) else {
            return;
        };
        for entry in self.inner.connections.iter() {
            if entry.key() == excluded {
                continue;
            }
            self.deliver(entry.key(), entry.value(), text.clone());
        }
    }
}
